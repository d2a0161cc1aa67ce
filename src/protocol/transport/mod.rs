//! UAVCAN v0 transport layer: CAN frame representations, 29-bit identifier
//! management, multi-frame transfers, the transmit queue, transfer-ID
//! tracking and bus abstraction traits.
//!
//! ## Timing Constants
//!
//! These constants drive the receive-side bookkeeping; all timestamps handled
//! by the transport are monotonic microseconds supplied by the application.

pub mod acceptance;
pub mod can_frame;
pub mod can_id;
pub mod multi_frame;
pub mod traits;
pub mod transfer;
pub mod tx_queue;

/// Age after which an unfinished reassembly session, or the last transfer ID
/// recorded for a sender, is considered dead (µs).
///
/// A sender that restarts resets its transfer-ID counter; once this delay has
/// elapsed its next transfer is accepted whatever its transfer ID.
pub const TRANSFER_TIMEOUT_USEC: u64 = 2_000_000;

/// Recommended period between two calls to
/// [`Node::cleanup_stale_transfers`](crate::protocol::node::Node::cleanup_stale_transfers) (µs).
pub const CLEANUP_INTERVAL_USEC: u64 = 1_000_000;

/// Priority levels (5-bit field, lower value wins arbitration).
pub mod priority {
    pub const HIGHEST: u8 = 0;
    pub const HIGH: u8 = 8;
    pub const MEDIUM: u8 = 16;
    pub const LOW: u8 = 24;
    pub const LOWEST: u8 = 31;
}
