//! Serialization primitives: bit-packed scalars, transfer CRC and the traits
//! implemented by message types.
pub mod bits;
pub mod crc;
pub mod traits;
