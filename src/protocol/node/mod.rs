//! Node instance: binds the local node ID, the block arena, the transmit
//! queue, the reassembly sessions and the transfer-ID tracker into one
//! explicitly owned object.
//!
//! The node performs no I/O and never blocks. Inbound frames are pushed in
//! with [`Node::handle_rx_frame`]; outbound frames are pulled from the
//! transmit queue with [`Node::peek_tx`] / [`Node::pop_tx`] by whatever loop
//! drives the CAN controller (see `protocol::services`).
use crate::core::{
    is_valid_node_id, DataTypeDescriptor, TransferType, BROADCAST_NODE_ID, MAX_TRANSFER_PAYLOAD,
};
use crate::error::{ConfigError, RxError, TxError};
use crate::infra::arena::{Arena, ArenaStatistics, Block};
use crate::protocol::transport::acceptance::{EvictionPolicy, TransferIdTracker, Verdict};
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::multi_frame::assembler::{
    CompletedTransfer, FrameContext, Reassembly, TransferAssembler,
};
use crate::protocol::transport::transfer::{RxTransfer, TransferId, TransferKey};
use crate::protocol::transport::tx_queue::TxQueue;

pub mod handler;

pub use crate::protocol::transport::multi_frame::assembler::{DiscardReason, IgnoreReason, RxOutcome};
pub use handler::{Publisher, RequestKind, TransferHandler};

//==================================================================================CONFIG
/// Runtime configuration of a node, validated by [`Node::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    /// Local node ID, 0 to start anonymous.
    pub node_id: u8,
    /// Largest transfer payload accepted or sent, at most [`MAX_TRANSFER_PAYLOAD`].
    pub max_transfer_payload: usize,
    /// Replacement rule of the transfer-ID tracker.
    pub eviction_policy: EvictionPolicy,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeConfig {
    /// Anonymous node, largest payload bound, LRU tracker.
    pub const fn new() -> Self {
        Self {
            node_id: BROADCAST_NODE_ID,
            max_transfer_payload: MAX_TRANSFER_PAYLOAD,
            eviction_policy: EvictionPolicy::LeastRecentlyUsed,
        }
    }

    pub const fn with_node_id(mut self, node_id: u8) -> Self {
        self.node_id = node_id;
        self
    }

    pub const fn with_max_transfer_payload(mut self, max_transfer_payload: usize) -> Self {
        self.max_transfer_payload = max_transfer_payload;
        self
    }

    pub const fn with_eviction_policy(mut self, eviction_policy: EvictionPolicy) -> Self {
        self.eviction_policy = eviction_policy;
        self
    }
}

//==================================================================================NODE
/// UAVCAN node instance.
///
/// * `SESSIONS` – multi-frame transfers reassembled in parallel
/// * `SOURCES` – transfer streams whose last transfer ID is remembered
pub struct Node<'a, const SESSIONS: usize = 8, const SOURCES: usize = 32> {
    node_id: u8,
    max_transfer_payload: usize,
    arena: Arena<'a>,
    tx_queue: TxQueue,
    assembler: TransferAssembler<SESSIONS>,
    tracker: TransferIdTracker<SOURCES>,
    scratch: [u8; MAX_TRANSFER_PAYLOAD],
}

impl<'a, const SESSIONS: usize, const SOURCES: usize> Node<'a, SESSIONS, SOURCES> {
    /// Build a node over a caller-provided block pool (typically a `static`).
    pub fn new(config: NodeConfig, blocks: &'a mut [Block]) -> Result<Self, ConfigError> {
        if config.node_id != BROADCAST_NODE_ID && !is_valid_node_id(config.node_id) {
            return Err(ConfigError::InvalidNodeId {
                node_id: config.node_id,
            });
        }
        if config.max_transfer_payload > MAX_TRANSFER_PAYLOAD {
            return Err(ConfigError::PayloadBoundTooLarge {
                requested: config.max_transfer_payload,
                max: MAX_TRANSFER_PAYLOAD,
            });
        }
        if blocks.is_empty() {
            return Err(ConfigError::EmptyArena);
        }

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Node created: id={}, {} arena blocks",
            config.node_id,
            blocks.len()
        );

        Ok(Self {
            node_id: config.node_id,
            max_transfer_payload: config.max_transfer_payload,
            arena: Arena::new(blocks),
            tx_queue: TxQueue::new(),
            assembler: TransferAssembler::new(),
            tracker: TransferIdTracker::new(config.eviction_policy),
            scratch: [0; MAX_TRANSFER_PAYLOAD],
        })
    }

    //==================================================================================Identity
    /// Local node ID, 0 while anonymous.
    pub fn local_node_id(&self) -> u8 {
        self.node_id
    }

    pub fn is_anonymous(&self) -> bool {
        self.node_id == BROADCAST_NODE_ID
    }

    /// Assign the node ID of an anonymous node. It can only be done once.
    pub fn set_local_node_id(&mut self, node_id: u8) -> Result<(), ConfigError> {
        if !is_valid_node_id(node_id) {
            return Err(ConfigError::InvalidNodeId { node_id });
        }
        if !self.is_anonymous() {
            return Err(ConfigError::NodeIdAlreadySet {
                current: self.node_id,
            });
        }
        self.node_id = node_id;

        #[cfg(feature = "defmt")]
        defmt::info!("Local node ID set to {}", node_id);
        Ok(())
    }

    //==================================================================================Transmit
    /// Outbound interface borrowing the arena and the transmit queue.
    pub fn publisher(&mut self) -> Publisher<'_, 'a> {
        Publisher {
            node_id: self.node_id,
            max_transfer_payload: self.max_transfer_payload,
            arena: &mut self.arena,
            tx_queue: &mut self.tx_queue,
        }
    }

    /// See [`Publisher::broadcast`].
    pub fn broadcast(
        &mut self,
        data_type: &DataTypeDescriptor,
        transfer_id: &mut TransferId,
        priority: u8,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        self.publisher()
            .broadcast(data_type, transfer_id, priority, payload)
    }

    /// See [`Publisher::request_or_respond`].
    pub fn request_or_respond(
        &mut self,
        destination: u8,
        data_type: &DataTypeDescriptor,
        transfer_id: &mut TransferId,
        priority: u8,
        kind: RequestKind,
        payload: &[u8],
    ) -> Result<usize, TxError> {
        self.publisher()
            .request_or_respond(destination, data_type, transfer_id, priority, kind, payload)
    }

    /// Highest-priority frame waiting for the driver.
    pub fn peek_tx(&self) -> Option<CanFrame> {
        self.tx_queue.peek(&self.arena)
    }

    /// Remove the highest-priority frame, once the driver accepted it.
    pub fn pop_tx(&mut self) -> Option<CanFrame> {
        self.tx_queue.pop(&mut self.arena)
    }

    /// Frames waiting in the transmit queue.
    pub fn tx_queue_len(&self) -> usize {
        self.tx_queue.len()
    }

    //==================================================================================Receive
    /// Process one frame received at `timestamp_usec`.
    ///
    /// Protocol noise is reported through the returned [`RxOutcome`]; only
    /// resource exhaustion is an error. A completed transfer is handed to
    /// `handler` before this call returns.
    pub fn handle_rx_frame<H: TransferHandler + ?Sized>(
        &mut self,
        frame: &CanFrame,
        timestamp_usec: u64,
        handler: &mut H,
    ) -> Result<RxOutcome, RxError> {
        let Some(tail) = frame.tail_byte() else {
            return Ok(RxOutcome::Ignored(IgnoreReason::EmptyFrame));
        };
        let id = frame.id;
        let transfer_type = id.transfer_type();

        if transfer_type != TransferType::Broadcast && id.destination_node_id() != self.node_id {
            return Ok(RxOutcome::Ignored(IgnoreReason::WrongAddress));
        }
        let Some(signature) =
            handler.should_accept(transfer_type, id.data_type_id(), id.source_node_id())
        else {
            return Ok(RxOutcome::Ignored(IgnoreReason::NotWanted));
        };

        let key = TransferKey::from_can_id(id);
        if tail.start_of_transfer() && !id.is_anonymous() {
            let reason = match self.tracker.check(&key, tail.transfer_id(), timestamp_usec) {
                Verdict::Accept => None,
                Verdict::Duplicate => Some(DiscardReason::DuplicateTransferId),
                Verdict::Stale => Some(DiscardReason::StaleTransferId),
            };
            if let Some(reason) = reason {
                #[cfg(feature = "defmt")]
                defmt::debug!(
                    "Transfer {} from node {} rejected: {}",
                    tail.transfer_id().value(),
                    key.source_node_id,
                    reason
                );
                return Ok(RxOutcome::Discarded(reason));
            }
        }

        let context = FrameContext {
            signature,
            timestamp_usec,
            max_payload: self.max_transfer_payload,
        };
        let reassembly = self
            .assembler
            .process_frame(&mut self.arena, frame, context)
            .map_err(|err| {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "Reassembly from node {} aborted: {}",
                    key.source_node_id,
                    defmt::Debug2Format(&err)
                );
                err
            })?;

        let completed = match reassembly {
            Reassembly::Pending(outcome) => {
                #[cfg(feature = "defmt")]
                if let RxOutcome::Discarded(reason) = outcome {
                    defmt::debug!("Transfer from node {} discarded: {}", key.source_node_id, reason);
                }
                return Ok(outcome);
            }
            Reassembly::Inline(completed) => {
                let payload = frame.payload();
                let mut publisher = Publisher {
                    node_id: self.node_id,
                    max_transfer_payload: self.max_transfer_payload,
                    arena: &mut self.arena,
                    tx_queue: &mut self.tx_queue,
                };
                dispatch(handler, &completed, &payload[..payload.len() - 1], &mut publisher);
                completed
            }
            Reassembly::Chained(completed, mut chain) => {
                let len = chain.copy_to(&self.arena, &mut self.scratch);
                let mut publisher = Publisher {
                    node_id: self.node_id,
                    max_transfer_payload: self.max_transfer_payload,
                    arena: &mut self.arena,
                    tx_queue: &mut self.tx_queue,
                };
                dispatch(handler, &completed, &self.scratch[..len], &mut publisher);
                chain.release(&mut self.arena);
                completed
            }
        };

        if !id.is_anonymous() {
            self.tracker
                .record(completed.key, completed.transfer_id, timestamp_usec);
        }
        Ok(RxOutcome::Delivered)
    }

    //==================================================================================Housekeeping
    /// Drop reassembly sessions and transfer-ID records older than the
    /// transfer timeout. Meant to be called about once per second.
    pub fn cleanup_stale_transfers(&mut self, now_usec: u64) {
        let _sessions = self.assembler.cleanup_stale(&mut self.arena, now_usec);
        let _records = self.tracker.forget_stale(now_usec);

        #[cfg(feature = "defmt")]
        if _sessions + _records > 0 {
            defmt::debug!(
                "Cleanup: {} stale session(s), {} stale record(s)",
                _sessions,
                _records
            );
        }
    }

    /// Multi-frame transfers currently being reassembled.
    pub fn active_sessions(&self) -> usize {
        self.assembler.active_sessions()
    }

    /// Usage figures of the block arena.
    pub fn arena_statistics(&self) -> ArenaStatistics {
        self.arena.statistics()
    }
}

/// Build the transfer view and hand it to the application.
fn dispatch<H: TransferHandler + ?Sized>(
    handler: &mut H,
    completed: &CompletedTransfer,
    payload: &[u8],
    publisher: &mut Publisher<'_, '_>,
) {
    let transfer = RxTransfer {
        timestamp_usec: completed.timestamp_usec,
        payload,
        data_type_id: completed.key.data_type_id,
        transfer_type: completed.key.transfer_type,
        transfer_id: completed.transfer_id,
        priority: completed.priority,
        source_node_id: completed.key.source_node_id,
        destination_node_id: completed.key.destination_node_id,
    };

    #[cfg(feature = "defmt")]
    defmt::trace!(
        "Delivering transfer: type id {}, {} bytes from node {}",
        transfer.data_type_id,
        payload.len(),
        transfer.source_node_id
    );
    handler.on_transfer_received(&transfer, publisher);
}
