//! Error definitions shared across library modules.
//! Each type models a specific failure scenario (codec misuse, identifier
//! construction, resource exhaustion, configuration, driver failures).
//!
//! Protocol noise (bad toggle, CRC mismatch, replayed transfer IDs…) is not an
//! error: it is reported through `RxOutcome::Discarded`.
use thiserror_no_std::Error;

//==================================================================================CAN_ID_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors that can occur while building a 29-bit UAVCAN identifier.
pub enum CanIdBuildError {
    /// Priority does not fit the 5-bit field.
    #[error("Priority {priority} exceeds the 5-bit range")]
    InvalidPriority { priority: u8 },
    /// Source or destination node ID outside the allowed range.
    #[error("Invalid node ID: {node_id}")]
    InvalidNodeId { node_id: u8 },
    /// Data type ID does not fit the identifier field for this transfer kind.
    #[error("Data type ID {data_type_id} does not fit the identifier field")]
    DataTypeIdOutOfRange { data_type_id: u16 },
}

//==================================================================================BITREADER_ERRORS
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Errors raised during bit-level reads.
pub enum BitReaderError {
    /// Requested bit length is zero or wider than 64 bits.
    #[error("Bit length must be within 1..=64. Requested: {asked}")]
    InvalidBitLength { asked: u8 },
    /// Attempted to read past the end of the buffer.
    #[error("Attempted to read out of bounds -> asked: {asked}, available: {available}")]
    OutOfBounds { asked: usize, available: usize },
}

//==================================================================================BITWRITER_ERRORS
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Errors raised during bit-level writes.
pub enum BitWriterError {
    /// Requested bit length is zero or wider than 64 bits.
    #[error("Bit length must be within 1..=64. Requested: {asked}")]
    InvalidBitLength { asked: u8 },
    /// Attempted to write beyond the provided capacity.
    #[error("Attempted to write out of bounds -> asked: {asked}, available: {available}")]
    OutOfBounds { asked: usize, available: usize },
}

//==================================================================================ARENA_ERROR
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Failures of the block arena.
pub enum ArenaError {
    /// Not enough free blocks to satisfy the request.
    #[error("Arena exhausted: {needed} blocks needed, {available} available")]
    OutOfMemory { needed: usize, available: usize },
}

//==================================================================================TX_QUEUE_ERROR
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Failures of the transmit priority queue.
pub enum TxQueueError {
    /// The queue cannot take the frames (arena blocks exhausted).
    #[error("Transmit queue full: {needed} frames needed, room for {available}")]
    Full { needed: usize, available: usize },
}

impl From<ArenaError> for TxQueueError {
    fn from(err: ArenaError) -> Self {
        match err {
            ArenaError::OutOfMemory { needed, available } => TxQueueError::Full { needed, available },
        }
    }
}

//==================================================================================TX_ERROR
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Errors returned when an outgoing transfer is rejected. Nothing is queued
/// and the caller's transfer-ID counter is left untouched.
pub enum TxError {
    /// The local node is anonymous and the transfer requires a node ID.
    #[error("Local node ID is not set")]
    NodeIdNotSet,
    /// Anonymous broadcasts must fit in a single frame.
    #[error("Anonymous transfers are limited to 7 bytes, got {len}")]
    AnonymousTransferTooLong { len: usize },
    /// Payload larger than the configured bound.
    #[error("Payload too long: {len} bytes, max {max}")]
    PayloadTooLong { len: usize, max: usize },
    /// Not enough room in the transmit queue for the whole transfer.
    #[error("Transmit queue full: {needed} frames needed, room for {available}")]
    QueueFull { needed: usize, available: usize },
    /// The CAN identifier could not be built from the arguments.
    #[error(transparent)]
    CanId(#[from] CanIdBuildError),
}

impl From<TxQueueError> for TxError {
    fn from(err: TxQueueError) -> Self {
        match err {
            TxQueueError::Full { needed, available } => TxError::QueueFull { needed, available },
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Failure of the typed publishing helpers (serialize, then queue).
pub enum PublishError {
    /// The message did not fit its buffer or a field exceeded its bound.
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    /// The serialized transfer was rejected.
    #[error(transparent)]
    Tx(#[from] TxError),
}

//==================================================================================RX_ERROR
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Resource exhaustion while receiving. The offending transfer is dropped;
/// transfers already in progress are untouched.
pub enum RxError {
    /// The arena has no free block for the reassembly buffer.
    #[error("Arena exhausted while reassembling")]
    OutOfMemory,
    /// Every reassembly session slot is busy.
    #[error("No free reassembly session")]
    SessionPoolExhausted,
}

impl From<ArenaError> for RxError {
    fn from(_: ArenaError) -> Self {
        RxError::OutOfMemory
    }
}

//==================================================================================CONFIG_ERROR
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Configuration rejected at the call that introduced it.
pub enum ConfigError {
    /// Node ID outside 1..=127.
    #[error("Invalid node ID: {node_id}")]
    InvalidNodeId { node_id: u8 },
    /// The node ID can only be assigned once.
    #[error("Node ID already set to {current}")]
    NodeIdAlreadySet { current: u8 },
    /// Requested payload bound exceeds the scratch buffer.
    #[error("Payload bound {requested} exceeds the maximum {max}")]
    PayloadBoundTooLarge { requested: usize, max: usize },
    /// The arena must contain at least one block.
    #[error("Arena has no blocks")]
    EmptyArena,
}

//================================================================================CODEC_ERROR
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Issues encountered while serializing a message into a buffer.
pub enum SerializationError {
    /// Provided buffer is too small for the payload.
    #[error("Buffer too small: {needed} bytes needed, {available} available")]
    BufferTooSmall { needed: usize, available: usize },
    /// Variable-length field longer than its DSDL bound.
    #[error("Field {field} too long: {len} bytes, max {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    /// Failed while writing bits into the output buffer.
    #[error("BitWrite error: {0}")]
    BitWrite(#[from] BitWriterError),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Errors raised while deserializing a payload into a message structure.
pub enum DeserializationError {
    /// Payload size does not match the expected layout.
    #[error("Invalid data length: {len}")]
    InvalidDataLength { len: usize },
    /// A field holds a value outside its DSDL range.
    #[error("Invalid value {value} for field {field}")]
    InvalidValue { field: &'static str, value: u64 },
    /// Bit-level access on the buffer failed.
    #[error("BitReader error: {0}")]
    BitRead(#[from] BitReaderError),
}

//==================================================================================DRIVER_ERRORS
#[derive(Debug, Error)]
/// Errors surfaced by the polling helpers in `protocol::services::spinner`.
pub enum SpinError<E: core::fmt::Debug> {
    /// Driver failed to transmit a frame. The frame was dropped.
    #[error("CAN transmit error: {0:?}")]
    Transmit(E),
    /// Driver failed to deliver a received frame.
    #[error("CAN receive error: {0:?}")]
    Receive(E),
    /// Resource exhaustion while handling an inbound frame.
    #[error(transparent)]
    Rx(RxError),
    /// Heartbeat could not be queued.
    #[error(transparent)]
    Publish(PublishError),
}

#[derive(Debug, Error)]
/// Errors terminating the async node runner.
pub enum RunnerError<E: core::fmt::Debug> {
    /// CAN bus rejected a frame.
    #[error("CAN bus send error: {0:?}")]
    Send(E),
    /// Unable to receive frames from the bus.
    #[error("CAN bus receive error: {0:?}")]
    Receive(E),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Errors returned by `NodeHandle` before a command reaches the runner.
pub enum NodeHandleError {
    /// Payload does not fit a command slot.
    #[error("Payload too long for a command: {len} bytes, max {max}")]
    PayloadTooLong { len: usize, max: usize },
    /// The message could not be serialized.
    #[error(transparent)]
    Serialization(#[from] SerializationError),
}
