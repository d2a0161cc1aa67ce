//! Periodic `uavcan.protocol.NodeStatus` publisher.
//!
//! The heartbeat keeps the status fields the application controls (health,
//! mode, sub-mode, vendor code), derives the uptime from the boot timestamp
//! and owns the transfer-ID counter of the NodeStatus stream.
use crate::error::PublishError;
use crate::protocol::messages::node_status::{Health, Mode, NodeStatus};
use crate::protocol::node::Publisher;
use crate::protocol::transport::priority;
use crate::protocol::transport::transfer::TransferId;

/// Default broadcast period.
pub const DEFAULT_PERIOD_MS: u32 = 500;

//==================================================================================HEARTBEAT
/// Rate-limited NodeStatus broadcaster.
#[derive(Debug, Clone)]
pub struct Heartbeat {
    boot_usec: u64,
    period_usec: u64,
    priority: u8,
    next_due_usec: u64,
    transfer_id: TransferId,
    status: NodeStatus,
}

impl Heartbeat {
    /// Heartbeat of a node that booted at `boot_usec`. The first broadcast is
    /// due immediately.
    pub fn new(boot_usec: u64) -> Self {
        Self {
            boot_usec,
            period_usec: u64::from(DEFAULT_PERIOD_MS) * 1_000,
            priority: priority::LOW,
            next_due_usec: boot_usec,
            transfer_id: TransferId::default(),
            status: NodeStatus::default(),
        }
    }

    pub fn with_period_ms(mut self, period_ms: u32) -> Self {
        self.period_usec = u64::from(period_ms.max(1)) * 1_000;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn set_health(&mut self, health: Health) {
        self.status.health = health;
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.status.mode = mode;
    }

    /// Sub-mode, truncated to its 3 bits.
    pub fn set_sub_mode(&mut self, sub_mode: u8) {
        self.status.sub_mode = sub_mode & 0x07;
    }

    pub fn set_vendor_specific_status_code(&mut self, code: u16) {
        self.status.vendor_specific_status_code = code;
    }

    /// Broadcast period in milliseconds.
    pub fn period_ms(&self) -> u32 {
        (self.period_usec / 1_000) as u32
    }

    /// Instant of the next broadcast.
    pub fn next_due_usec(&self) -> u64 {
        self.next_due_usec
    }

    /// Transfer ID the next broadcast will carry.
    pub fn transfer_id(&self) -> TransferId {
        self.transfer_id
    }

    /// Status as it would be published at `now_usec`.
    pub fn status(&self, now_usec: u64) -> NodeStatus {
        let uptime = now_usec.saturating_sub(self.boot_usec) / 1_000_000;
        NodeStatus {
            uptime_sec: u32::try_from(uptime).unwrap_or(u32::MAX),
            ..self.status
        }
    }

    pub fn is_due(&self, now_usec: u64) -> bool {
        now_usec >= self.next_due_usec
    }

    /// Queue a NodeStatus broadcast if one is due. Returns whether a transfer
    /// was queued.
    ///
    /// Anonymous nodes do not publish. The next broadcast is scheduled one
    /// period later even when queueing fails, so a full queue is not hammered.
    pub fn poll(
        &mut self,
        publisher: &mut Publisher<'_, '_>,
        now_usec: u64,
    ) -> Result<bool, PublishError> {
        if publisher.local_node_id() == 0 || !self.is_due(now_usec) {
            return Ok(false);
        }
        self.next_due_usec = now_usec + self.period_usec;

        let status = self.status(now_usec);
        publisher.broadcast_message(&status, &mut self.transfer_id, self.priority)?;

        #[cfg(feature = "defmt")]
        defmt::trace!("Heartbeat queued: uptime {}s, {}", status.uptime_sec, status.health);
        Ok(true)
    }
}
