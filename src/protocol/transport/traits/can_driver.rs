//! Non-blocking CAN driver abstraction for polling (superloop) firmware.
//!
//! `transmit` must never wait for the bus: when the controller mailboxes are
//! full it reports [`TxStatus::Busy`] and the frame stays in the transmit
//! queue until the next poll.
use crate::protocol::transport::can_frame::CanFrame;

/// Answer of the driver to a transmit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStatus {
    /// The frame was handed to the controller.
    Accepted,
    /// No mailbox available right now; retry later.
    Busy,
}

/// Contract to send and receive CAN frames without blocking.
pub trait CanDriver {
    type Error: core::fmt::Debug;
    /// Try to hand one frame to the controller.
    fn transmit(&mut self, frame: &CanFrame) -> Result<TxStatus, Self::Error>;
    /// Fetch one received frame, `None` when the receive FIFO is empty.
    fn receive(&mut self) -> Result<Option<CanFrame>, Self::Error>;
}
