//! `uavcan.protocol.NodeStatus`: the heartbeat every node with a node ID must
//! broadcast at least once per second.
use crate::core::{DataTypeDescriptor, DataTypeKind};
use crate::error::{DeserializationError, SerializationError};
use crate::infra::codec::bits::{BitReader, BitWriter};
use crate::infra::codec::traits::{DataType, FromPayload, ToPayload};

/// Descriptor of `uavcan.protocol.NodeStatus` (DTID 341).
pub const NODE_STATUS: DataTypeDescriptor = DataTypeDescriptor {
    name: "uavcan.protocol.NodeStatus",
    id: 341,
    signature: 0x0F08_68D0_C1A7_C6F1,
    kind: DataTypeKind::Message,
    max_size: NodeStatus::SIZE,
};

//==================================================================================HEALTH
/// Abstract node health, 2 bits on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Health {
    #[default]
    Ok = 0,
    Warning = 1,
    Error = 2,
    Critical = 3,
}

impl TryFrom<u8> for Health {
    type Error = DeserializationError;

    fn try_from(value: u8) -> Result<Self, DeserializationError> {
        match value {
            0 => Ok(Health::Ok),
            1 => Ok(Health::Warning),
            2 => Ok(Health::Error),
            3 => Ok(Health::Critical),
            other => Err(DeserializationError::InvalidValue {
                field: "health",
                value: other as u64,
            }),
        }
    }
}

//==================================================================================MODE
/// Operating mode, 3 bits on the wire. Values 4 to 6 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    Operational = 0,
    #[default]
    Initialization = 1,
    Maintenance = 2,
    SoftwareUpdate = 3,
    Offline = 7,
}

impl TryFrom<u8> for Mode {
    type Error = DeserializationError;

    fn try_from(value: u8) -> Result<Self, DeserializationError> {
        match value {
            0 => Ok(Mode::Operational),
            1 => Ok(Mode::Initialization),
            2 => Ok(Mode::Maintenance),
            3 => Ok(Mode::SoftwareUpdate),
            7 => Ok(Mode::Offline),
            other => Err(DeserializationError::InvalidValue {
                field: "mode",
                value: other as u64,
            }),
        }
    }
}

//==================================================================================NODE_STATUS
/// Node status broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NodeStatus {
    /// Seconds since the node started.
    pub uptime_sec: u32,
    pub health: Health,
    pub mode: Mode,
    /// Mode-specific sub-mode, 3 bits.
    pub sub_mode: u8,
    /// Free for vendor use.
    pub vendor_specific_status_code: u16,
}

impl NodeStatus {
    /// Serialized size in bytes.
    pub const SIZE: usize = 7;

    /// Write the 56 status bits at the writer's cursor.
    pub(crate) fn write_fields(&self, writer: &mut BitWriter<'_>) -> Result<(), SerializationError> {
        writer.write_u64(u64::from(self.uptime_sec), 32)?;
        writer.write_u64(self.health as u64, 2)?;
        writer.write_u64(self.mode as u64, 3)?;
        writer.write_u64(u64::from(self.sub_mode), 3)?;
        writer.write_u64(u64::from(self.vendor_specific_status_code), 16)?;
        Ok(())
    }

    /// Read the 56 status bits at the reader's cursor.
    pub(crate) fn read_fields(reader: &mut BitReader<'_>) -> Result<Self, DeserializationError> {
        Ok(Self {
            uptime_sec: reader.read_u32(32)?,
            health: Health::try_from(reader.read_u8(2)?)?,
            mode: Mode::try_from(reader.read_u8(3)?)?,
            sub_mode: reader.read_u8(3)?,
            vendor_specific_status_code: reader.read_u16(16)?,
        })
    }
}

impl DataType for NodeStatus {
    const DESCRIPTOR: DataTypeDescriptor = NODE_STATUS;
}

impl ToPayload for NodeStatus {
    fn to_payload(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        if buffer.len() < Self::SIZE {
            return Err(SerializationError::BufferTooSmall {
                needed: Self::SIZE,
                available: buffer.len(),
            });
        }
        buffer[..Self::SIZE].fill(0);
        let mut writer = BitWriter::new(&mut buffer[..Self::SIZE]);
        self.write_fields(&mut writer)?;
        Ok(writer.byte_len())
    }

    fn payload_len(&self) -> usize {
        Self::SIZE
    }
}

impl FromPayload for NodeStatus {
    fn from_payload(bytes: &[u8]) -> Result<Self, DeserializationError> {
        if bytes.len() < Self::SIZE {
            return Err(DeserializationError::InvalidDataLength { len: bytes.len() });
        }
        Self::read_fields(&mut BitReader::new(bytes))
    }
}

//==================================================================================TESTS
#[cfg(test)]
#[path = "tests.rs"]
mod tests;
