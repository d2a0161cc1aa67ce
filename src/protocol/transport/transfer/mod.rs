//! Transfer-level primitives shared by the reassembly and fragmentation
//! engines: the 5-bit transfer ID, the tail byte closing every frame, the key
//! identifying a transfer stream and the view handed to the application.
use crate::core::TransferType;
use crate::error::DeserializationError;
use crate::infra::codec::traits::FromPayload;
use crate::protocol::transport::can_id::CanId;

//==================================================================================TRANSFER_ID
/// Wrapping 5-bit transfer counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferId(u8);

impl TransferId {
    /// Largest transfer ID value.
    pub const MAX: u8 = 0x1F;

    /// Build a transfer ID; bits above the fifth are dropped.
    pub const fn new(value: u8) -> Self {
        Self(value & Self::MAX)
    }

    /// Raw value (0..=31).
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Following transfer ID, wrapping from 31 to 0.
    pub const fn next(self) -> Self {
        Self::new(self.0.wrapping_add(1))
    }

    /// Advance the counter in place.
    pub fn increment(&mut self) {
        *self = self.next();
    }

    /// Number of increments needed to go from `self` to `other` (0..=31).
    pub const fn forward_distance(self, other: TransferId) -> u8 {
        other.0.wrapping_sub(self.0) & Self::MAX
    }
}

impl From<u8> for TransferId {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

//==================================================================================TAIL_BYTE
/// Last byte of every UAVCAN v0 frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TailByte(u8);

impl TailByte {
    const START: u8 = 0x80;
    const END: u8 = 0x40;
    const TOGGLE: u8 = 0x20;

    pub const fn new(start: bool, end: bool, toggle: bool, transfer_id: TransferId) -> Self {
        let mut value = transfer_id.value();
        if start {
            value |= Self::START;
        }
        if end {
            value |= Self::END;
        }
        if toggle {
            value |= Self::TOGGLE;
        }
        Self(value)
    }

    /// Tail byte of a transfer that fits in one frame.
    pub const fn single_frame(transfer_id: TransferId) -> Self {
        Self::new(true, true, false, transfer_id)
    }

    pub const fn start_of_transfer(self) -> bool {
        self.0 & Self::START != 0
    }

    pub const fn end_of_transfer(self) -> bool {
        self.0 & Self::END != 0
    }

    pub const fn toggle(self) -> bool {
        self.0 & Self::TOGGLE != 0
    }

    pub const fn transfer_id(self) -> TransferId {
        TransferId::new(self.0)
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for TailByte {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<TailByte> for u8 {
    fn from(tail: TailByte) -> Self {
        tail.0
    }
}

//==================================================================================TRANSFER_KEY
/// Identity of a transfer stream. Reassembly sessions and transfer-ID records
/// are both keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferKey {
    pub data_type_id: u16,
    pub transfer_type: TransferType,
    pub source_node_id: u8,
    /// Zero for broadcasts.
    pub destination_node_id: u8,
}

impl TransferKey {
    /// Key of the stream a frame with this identifier belongs to.
    pub fn from_can_id(id: CanId) -> Self {
        Self {
            data_type_id: id.data_type_id(),
            transfer_type: id.transfer_type(),
            source_node_id: id.source_node_id(),
            destination_node_id: id.destination_node_id(),
        }
    }

    /// Small non-cryptographic hash used to pick a fixed slot.
    pub fn slot_hash(&self) -> u32 {
        let packed = (self.data_type_id as u32)
            | ((self.transfer_type as u32) << 16)
            | ((self.source_node_id as u32) << 18)
            | ((self.destination_node_id as u32 & 0x7F) << 25);
        // Fibonacci hashing spreads neighbouring keys over the table.
        packed.wrapping_mul(0x9E37_79B9) >> 7
    }
}

//==================================================================================RX_TRANSFER
/// Completed inbound transfer. The payload borrows node-owned memory and is
/// only valid for the duration of the handler call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxTransfer<'t> {
    /// Reception timestamp of the first frame (µs).
    pub timestamp_usec: u64,
    /// Reassembled payload, CRC removed.
    pub payload: &'t [u8],
    pub data_type_id: u16,
    pub transfer_type: TransferType,
    pub transfer_id: TransferId,
    pub priority: u8,
    /// Zero for anonymous broadcasts.
    pub source_node_id: u8,
    /// Zero for broadcasts.
    pub destination_node_id: u8,
}

impl<'t> RxTransfer<'t> {
    /// Stream this transfer belongs to.
    pub fn key(&self) -> TransferKey {
        TransferKey {
            data_type_id: self.data_type_id,
            transfer_type: self.transfer_type,
            source_node_id: self.source_node_id,
            destination_node_id: self.destination_node_id,
        }
    }

    /// Sent by a node without node ID.
    pub fn is_anonymous(&self) -> bool {
        self.transfer_type == TransferType::Broadcast && self.source_node_id == 0
    }

    /// Decode the payload into a message structure.
    pub fn decode<T: FromPayload>(&self) -> Result<T, DeserializationError> {
        T::from_payload(self.payload)
    }
}
