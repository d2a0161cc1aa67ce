//! UAVCAN v0 multi-frame transfer support: splits payloads larger than seven
//! bytes across successive CAN frames and puts them back together.
pub mod assembler;
pub mod builder;
