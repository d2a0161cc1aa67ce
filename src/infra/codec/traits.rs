//! Public traits implemented by message types. They decouple DSDL structures
//! from the transport: a message only knows how to lay itself into a byte
//! buffer and how to rebuild itself from one.
use crate::core::DataTypeDescriptor;
use crate::error::{DeserializationError, SerializationError};

//==================================================================================DATA_TYPE
/// Binds a Rust type to its DSDL descriptor (type ID and signature).
pub trait DataType {
    /// Static descriptor used to build identifiers and seed the CRC.
    const DESCRIPTOR: DataTypeDescriptor;
}
//==================================================================================TO_PAYLOAD
/// Serialize a data structure into a sequence of bytes.
///
/// Used by node services to turn a message into a transfer payload ready to be
/// fragmented.
pub trait ToPayload {
    /// Serialize the structure into the provided buffer.
    ///
    /// Returns the number of bytes written on success.
    fn to_payload(&self, buffer: &mut [u8]) -> Result<usize, SerializationError>;
    /// Serialized length of this instance.
    fn payload_len(&self) -> usize;
}
//==================================================================================FROM_PAYLOAD
/// Deserialize a sequence of bytes into a data structure.
pub trait FromPayload: Sized {
    /// Deserialize a byte slice to produce a new instance.
    fn from_payload(bytes: &[u8]) -> Result<Self, DeserializationError>;
}
