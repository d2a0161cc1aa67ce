//! Acceptance of inbound transfers based on their transfer ID.
//!
//! For every stream ([`TransferKey`]) the tracker remembers the transfer ID of
//! the last transfer that completed, together with the time it completed. A
//! new transfer is accepted when its ID lies in the forward half of the 5-bit
//! ring seen from that record; an identical ID is a duplicate (redundant
//! interface or retransmission) and anything behind is stale. A record older
//! than [`TRANSFER_TIMEOUT_USEC`] no longer blocks anything, so a sender that
//! restarted with a fresh counter is heard again after the timeout.
use crate::protocol::transport::transfer::{TransferId, TransferKey};
use crate::protocol::transport::TRANSFER_TIMEOUT_USEC;

/// Largest forward distance still considered "newer" (half of the ring).
pub const MAX_FORWARD_DISTANCE: u8 = 15;

//==================================================================================POLICY
/// What to do when every record slot is taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EvictionPolicy {
    /// Overwrite the record that was updated the longest time ago.
    #[default]
    LeastRecentlyUsed,
    /// Each key owns one slot chosen by hash; colliding keys overwrite each
    /// other. Constant-time lookups at the price of occasional false accepts.
    HashSlot,
}

/// Result of checking a transfer ID against the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Verdict {
    /// Unknown stream, expired record or strictly newer transfer ID.
    Accept,
    /// Same transfer ID as the last completed transfer.
    Duplicate,
    /// Transfer ID behind the last completed one.
    Stale,
}

#[derive(Debug, Clone, Copy)]
struct Record {
    key: TransferKey,
    transfer_id: TransferId,
    timestamp_usec: u64,
}

impl Record {
    fn expired(&self, now_usec: u64) -> bool {
        now_usec.saturating_sub(self.timestamp_usec) > TRANSFER_TIMEOUT_USEC
    }
}

//==================================================================================TRACKER
/// Fixed-capacity table of the last completed transfer ID per stream.
#[derive(Debug)]
pub struct TransferIdTracker<const N: usize> {
    records: [Option<Record>; N],
    policy: EvictionPolicy,
}

impl<const N: usize> Default for TransferIdTracker<N> {
    fn default() -> Self {
        Self::new(EvictionPolicy::default())
    }
}

impl<const N: usize> TransferIdTracker<N> {
    pub const fn new(policy: EvictionPolicy) -> Self {
        Self {
            records: [None; N],
            policy,
        }
    }

    /// Number of streams currently remembered.
    pub fn len(&self) -> usize {
        self.records.iter().filter(|r| r.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decide whether a transfer with `transfer_id` may be processed.
    pub fn check(&self, key: &TransferKey, transfer_id: TransferId, now_usec: u64) -> Verdict {
        let Some(record) = self.find(key).and_then(|index| self.records[index].as_ref()) else {
            return Verdict::Accept;
        };
        if record.expired(now_usec) {
            return Verdict::Accept;
        }
        match record.transfer_id.forward_distance(transfer_id) {
            0 => Verdict::Duplicate,
            1..=MAX_FORWARD_DISTANCE => Verdict::Accept,
            _ => Verdict::Stale,
        }
    }

    /// Remember a successfully completed transfer.
    pub fn record(&mut self, key: TransferKey, transfer_id: TransferId, now_usec: u64) {
        let Some(index) = self.find(&key).or_else(|| self.vacant_slot(&key)) else {
            return;
        };
        self.records[index] = Some(Record {
            key,
            transfer_id,
            timestamp_usec: now_usec,
        });
    }

    /// Drop records older than the transfer timeout. Returns how many went.
    pub fn forget_stale(&mut self, now_usec: u64) -> usize {
        let mut removed = 0;
        for slot in self.records.iter_mut() {
            if slot.is_some_and(|record| record.expired(now_usec)) {
                *slot = None;
                removed += 1;
            }
        }
        removed
    }

    fn hash_slot(key: &TransferKey) -> Option<usize> {
        (key.slot_hash() as usize).checked_rem(N)
    }

    fn find(&self, key: &TransferKey) -> Option<usize> {
        match self.policy {
            EvictionPolicy::HashSlot => {
                let index = Self::hash_slot(key)?;
                match &self.records[index] {
                    Some(record) if record.key == *key => Some(index),
                    _ => None,
                }
            }
            EvictionPolicy::LeastRecentlyUsed => self
                .records
                .iter()
                .position(|slot| slot.is_some_and(|record| record.key == *key)),
        }
    }

    fn vacant_slot(&self, key: &TransferKey) -> Option<usize> {
        match self.policy {
            EvictionPolicy::HashSlot => Self::hash_slot(key),
            EvictionPolicy::LeastRecentlyUsed => self
                .records
                .iter()
                .position(Option::is_none)
                .or_else(|| {
                    self.records
                        .iter()
                        .enumerate()
                        .min_by_key(|(_, slot)| slot.map_or(0, |record| record.timestamp_usec))
                        .map(|(index, _)| index)
                }),
        }
    }
}
