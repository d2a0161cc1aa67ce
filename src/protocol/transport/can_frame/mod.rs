//! In-memory representation of a UAVCAN v0 CAN frame, with conversions to and
//! from any driver frame implementing [`embedded_can::Frame`].
use crate::protocol::transport::can_id::CanId;
use crate::protocol::transport::transfer::TailByte;
use embedded_can::{ExtendedId, Frame, Id};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Raw UAVCAN frame as read from or written to the CAN bus.
pub struct CanFrame {
    /// Full 29-bit CAN identifier stored inside a `u32`.
    pub id: CanId,
    /// Payload buffer. Classic CAN frames carry at most eight bytes.
    pub data: [u8; 8],
    /// Number of valid payload bytes (Data Length Code, 0 to 8).
    pub len: usize,
}

impl CanFrame {
    /// Build a frame from an identifier and up to eight payload bytes.
    pub fn from_parts(id: CanId, payload: &[u8]) -> Option<Self> {
        if payload.len() > 8 {
            return None;
        }
        let mut data = [0; 8];
        data[..payload.len()].copy_from_slice(payload);
        Some(Self {
            id: CanId(id.0 & CanId::MASK),
            data,
            len: payload.len(),
        })
    }

    /// Valid payload bytes, tail byte included.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len.min(8)]
    }

    /// Last payload byte, interpreted as a UAVCAN tail byte.
    pub fn tail_byte(&self) -> Option<TailByte> {
        self.payload().last().map(|&byte| TailByte::from(byte))
    }

    /// Convert a driver frame. Standard, remote and oversized frames are refused.
    pub fn from_frame<F: Frame>(frame: &F) -> Option<Self> {
        if frame.is_remote_frame() {
            return None;
        }
        match frame.id() {
            Id::Extended(id) => Self::from_parts(CanId(id.as_raw()), frame.data()),
            Id::Standard(_) => None,
        }
    }

    /// Convert into a driver frame type.
    pub fn to_frame<F: Frame>(&self) -> Option<F> {
        F::new(self.extended_id(), self.payload())
    }

    fn extended_id(&self) -> ExtendedId {
        ExtendedId::new(self.id.0 & CanId::MASK).unwrap_or(ExtendedId::ZERO)
    }
}

impl Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            Id::Extended(id) => Self::from_parts(CanId(id.as_raw()), data),
            Id::Standard(_) => None,
        }
    }

    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool {
        true
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        Id::Extended(self.extended_id())
    }

    fn dlc(&self) -> usize {
        self.len
    }

    fn data(&self) -> &[u8] {
        self.payload()
    }
}
