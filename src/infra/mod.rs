//! Infrastructure shared by the protocol layer: the bit-level codec, the
//! transfer CRC and the fixed block arena backing every dynamic buffer.
pub mod arena;
pub mod codec;
