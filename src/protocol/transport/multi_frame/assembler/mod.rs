//! UAVCAN v0 transfer assembler: rebuilds transfers by aggregating the CAN
//! frames of multi-frame sessions into arena block chains.
//!
//! Single-frame transfers never touch the arena; their payload is read
//! straight from the frame. A multi-frame session starts on a frame with the
//! start bit set and no end bit, checks the alternating toggle and the
//! transfer ID of every continuation frame, and validates the transfer CRC
//! once the end frame arrives. Any protocol violation drops the session and
//! releases its blocks.
use crate::error::RxError;
use crate::infra::arena::{Arena, BlockChain};
use crate::infra::codec::crc::TransferCrc;
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::transfer::{TransferId, TransferKey};
use crate::protocol::transport::TRANSFER_TIMEOUT_USEC;

//==================================================================================OUTCOMES
/// Why a frame was not considered at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IgnoreReason {
    /// No tail byte.
    EmptyFrame,
    /// Service transfer addressed to another node.
    WrongAddress,
    /// The application does not want this data type.
    NotWanted,
    /// Continuation frame without a session (start frame never seen).
    MissedStart,
}

/// Why a frame or an ongoing transfer was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DiscardReason {
    /// Transfer ID equal to the last completed one.
    DuplicateTransferId,
    /// Transfer ID behind the last completed one.
    StaleTransferId,
    /// Toggle bit did not alternate.
    WrongToggle,
    /// Continuation frame of another transfer.
    UnexpectedTransferId,
    /// First frame too short to carry the CRC and data.
    ShortFrame,
    /// Transfer CRC mismatch.
    BadCrc,
    /// Transfer larger than the configured payload bound.
    PayloadTooLong,
    /// Session older than the transfer timeout.
    TimedOut,
}

/// Effect of one received frame on the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxOutcome {
    /// Frame not relevant to this node.
    Ignored(IgnoreReason),
    /// Frame stored; the transfer is not complete yet.
    Consumed,
    /// Frame rejected by the protocol rules.
    Discarded(DiscardReason),
    /// A complete transfer was handed to the application.
    Delivered,
}

/// Transfer-level information of a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletedTransfer {
    pub key: TransferKey,
    pub transfer_id: TransferId,
    pub priority: u8,
    /// Reception timestamp of the first frame.
    pub timestamp_usec: u64,
}

/// Result of feeding one frame to the assembler.
#[derive(Debug, PartialEq, Eq)]
pub enum Reassembly {
    /// Nothing to deliver.
    Pending(RxOutcome),
    /// Single-frame transfer: the payload is the frame minus its tail byte.
    Inline(CompletedTransfer),
    /// Multi-frame transfer: the payload sits in the chain. The caller owns it
    /// and must release it.
    Chained(CompletedTransfer, BlockChain),
}

/// Per-frame parameters supplied by the node.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// Data type signature seeding the transfer CRC.
    pub signature: u64,
    pub timestamp_usec: u64,
    /// Largest payload accepted, CRC excluded.
    pub max_payload: usize,
}

//==================================================================================SESSION
/// Internal structure tracking the state of a multi-frame session.
#[derive(Debug, Clone, Copy)]
struct Session {
    key: TransferKey,
    transfer_id: TransferId,
    priority: u8,
    timestamp_usec: u64,
    next_toggle: bool,
    expected_crc: u16,
    crc: TransferCrc,
    payload: BlockChain,
}

impl Session {
    fn expired(&self, now_usec: u64) -> bool {
        now_usec.saturating_sub(self.timestamp_usec) > TRANSFER_TIMEOUT_USEC
    }
}

/// Main assembler: owns a fixed pool of reusable sessions.
#[derive(Debug)]
pub struct TransferAssembler<const SESSIONS: usize> {
    sessions: [Option<Session>; SESSIONS],
}

impl<const SESSIONS: usize> Default for TransferAssembler<SESSIONS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SESSIONS: usize> TransferAssembler<SESSIONS> {
    /// Instantiate the assembler with an empty session pool.
    pub const fn new() -> Self {
        Self {
            sessions: [None; SESSIONS],
        }
    }

    /// Sessions currently reassembling a transfer.
    pub fn active_sessions(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_some()).count()
    }

    //==================================================================================Process Functions
    /// Process a CAN frame the node has already decided to listen to.
    ///
    /// Errors are resource exhaustion only; the frame's transfer is lost but
    /// other sessions are left untouched.
    pub fn process_frame(
        &mut self,
        arena: &mut Arena<'_>,
        frame: &CanFrame,
        context: FrameContext,
    ) -> Result<Reassembly, RxError> {
        let Some(tail) = frame.tail_byte() else {
            return Ok(Reassembly::Pending(RxOutcome::Ignored(IgnoreReason::EmptyFrame)));
        };
        let payload = frame.payload();
        let data = &payload[..payload.len() - 1];
        let key = TransferKey::from_can_id(frame.id);
        let completed = CompletedTransfer {
            key,
            transfer_id: tail.transfer_id(),
            priority: frame.id.priority(),
            timestamp_usec: context.timestamp_usec,
        };

        if tail.start_of_transfer() {
            // A new start frame supersedes whatever the sender was doing.
            if let Some(index) = self.find(&key) {
                self.drop_session(arena, index);
            }

            if tail.end_of_transfer() {
                if data.len() > context.max_payload {
                    return Ok(discarded(DiscardReason::PayloadTooLong));
                }
                return Ok(Reassembly::Inline(completed));
            }

            if tail.toggle() {
                return Ok(discarded(DiscardReason::WrongToggle));
            }
            if payload.len() <= TransferCrc::LENGTH + 1 {
                return Ok(discarded(DiscardReason::ShortFrame));
            }
            let body = &data[TransferCrc::LENGTH..];
            if body.len() > context.max_payload {
                return Ok(discarded(DiscardReason::PayloadTooLong));
            }

            let index = self
                .free_slot(arena, context.timestamp_usec)
                .ok_or(RxError::SessionPoolExhausted)?;
            let mut chain = BlockChain::new();
            chain.extend(arena, body)?;

            let mut crc = TransferCrc::with_signature(context.signature);
            crc.add_bytes(body);
            self.sessions[index] = Some(Session {
                key,
                transfer_id: tail.transfer_id(),
                priority: frame.id.priority(),
                timestamp_usec: context.timestamp_usec,
                next_toggle: true,
                expected_crc: u16::from_le_bytes([data[0], data[1]]),
                crc,
                payload: chain,
            });
            return Ok(Reassembly::Pending(RxOutcome::Consumed));
        }

        // Continuation frame.
        let Some(index) = self.find(&key) else {
            return Ok(Reassembly::Pending(RxOutcome::Ignored(IgnoreReason::MissedStart)));
        };
        let Some(mut session) = self.sessions[index] else {
            return Ok(Reassembly::Pending(RxOutcome::Ignored(IgnoreReason::MissedStart)));
        };

        let violation = if session.expired(context.timestamp_usec) {
            Some(DiscardReason::TimedOut)
        } else if tail.transfer_id() != session.transfer_id {
            Some(DiscardReason::UnexpectedTransferId)
        } else if tail.toggle() != session.next_toggle {
            Some(DiscardReason::WrongToggle)
        } else if session.payload.len() + data.len() > context.max_payload {
            Some(DiscardReason::PayloadTooLong)
        } else {
            None
        };
        if let Some(reason) = violation {
            self.drop_session(arena, index);
            return Ok(discarded(reason));
        }

        if let Err(err) = session.payload.extend(arena, data) {
            self.drop_session(arena, index);
            return Err(err.into());
        }
        session.crc.add_bytes(data);
        session.next_toggle = !session.next_toggle;

        if !tail.end_of_transfer() {
            self.sessions[index] = Some(session);
            return Ok(Reassembly::Pending(RxOutcome::Consumed));
        }

        self.sessions[index] = None;
        if session.crc.get() != session.expected_crc {
            session.payload.release(arena);
            return Ok(discarded(DiscardReason::BadCrc));
        }
        Ok(Reassembly::Chained(
            CompletedTransfer {
                key,
                transfer_id: session.transfer_id,
                priority: session.priority,
                timestamp_usec: session.timestamp_usec,
            },
            session.payload,
        ))
    }

    /// Drop sessions older than the transfer timeout. Returns how many went.
    pub fn cleanup_stale(&mut self, arena: &mut Arena<'_>, now_usec: u64) -> usize {
        let mut removed = 0;
        for index in 0..SESSIONS {
            if self.sessions[index].is_some_and(|s| s.expired(now_usec)) {
                self.drop_session(arena, index);
                removed += 1;
            }
        }
        removed
    }

    fn find(&self, key: &TransferKey) -> Option<usize> {
        self.sessions
            .iter()
            .position(|s| s.is_some_and(|session| session.key == *key))
    }

    /// First empty slot, else the first expired one (reclaimed on the spot).
    fn free_slot(&mut self, arena: &mut Arena<'_>, now_usec: u64) -> Option<usize> {
        if let Some(index) = self.sessions.iter().position(Option::is_none) {
            return Some(index);
        }
        let index = self
            .sessions
            .iter()
            .position(|s| s.is_some_and(|session| session.expired(now_usec)))?;
        self.drop_session(arena, index);
        Some(index)
    }

    fn drop_session(&mut self, arena: &mut Arena<'_>, index: usize) {
        if let Some(mut session) = self.sessions[index].take() {
            session.payload.release(arena);
        }
    }
}

fn discarded(reason: DiscardReason) -> Reassembly {
    Reassembly::Pending(RxOutcome::Discarded(reason))
}
