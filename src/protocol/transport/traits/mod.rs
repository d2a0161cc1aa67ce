//! Abstraction traits used by the transport layer (CAN bus, CAN driver,
//! monotonic clock and timer).
pub mod can_bus;
pub mod can_driver;
pub mod clock;
pub mod korri_timer;
