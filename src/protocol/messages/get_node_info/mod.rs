//! `uavcan.protocol.GetNodeInfo` (service 1): the request is empty, the
//! response carries the node status, software and hardware versions, and the
//! node name.
//!
//! Variable-length fields are held in fixed buffers so that the response can
//! be decoded without an allocator.
use crate::core::{DataTypeDescriptor, DataTypeKind};
use crate::error::{DeserializationError, SerializationError};
use crate::infra::codec::bits::{BitReader, BitWriter};
use crate::infra::codec::traits::{DataType, FromPayload, ToPayload};
use crate::protocol::messages::node_status::NodeStatus;

/// Descriptor of `uavcan.protocol.GetNodeInfo`.
pub const GET_NODE_INFO: DataTypeDescriptor = DataTypeDescriptor {
    name: "uavcan.protocol.GetNodeInfo",
    id: 1,
    signature: 0xEE46_8A81_21C4_6A9E,
    kind: DataTypeKind::Service,
    max_size: GetNodeInfoResponse::MAX_SIZE,
};

/// Longest certificate of authenticity.
pub const MAX_CERTIFICATE_LEN: usize = 255;
/// Longest node name.
pub const MAX_NAME_LEN: usize = 80;

//==================================================================================SOFTWARE_VERSION
/// `uavcan.protocol.SoftwareVersion`, 15 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SoftwareVersion {
    pub major: u8,
    pub minor: u8,
    /// Which of the optional fields below are meaningful.
    pub optional_field_flags: u8,
    pub vcs_commit: u32,
    pub image_crc: u64,
}

impl SoftwareVersion {
    pub const SIZE: usize = 15;
    pub const FLAG_VCS_COMMIT: u8 = 1;
    pub const FLAG_IMAGE_CRC: u8 = 2;

    fn write_fields(&self, writer: &mut BitWriter<'_>) -> Result<(), SerializationError> {
        writer.write_u64(u64::from(self.major), 8)?;
        writer.write_u64(u64::from(self.minor), 8)?;
        writer.write_u64(u64::from(self.optional_field_flags), 8)?;
        writer.write_u64(u64::from(self.vcs_commit), 32)?;
        writer.write_u64(self.image_crc, 64)?;
        Ok(())
    }

    fn read_fields(reader: &mut BitReader<'_>) -> Result<Self, DeserializationError> {
        Ok(Self {
            major: reader.read_u8(8)?,
            minor: reader.read_u8(8)?,
            optional_field_flags: reader.read_u8(8)?,
            vcs_commit: reader.read_u32(32)?,
            image_crc: reader.read_u64(64)?,
        })
    }
}

//==================================================================================HARDWARE_VERSION
/// `uavcan.protocol.HardwareVersion`: 19 fixed bytes followed by a
/// length-prefixed certificate of authenticity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareVersion {
    pub major: u8,
    pub minor: u8,
    /// 128-bit unique ID, all zeros when unknown.
    pub unique_id: [u8; 16],
    certificate: [u8; MAX_CERTIFICATE_LEN],
    certificate_len: u8,
}

impl Default for HardwareVersion {
    fn default() -> Self {
        Self {
            major: 0,
            minor: 0,
            unique_id: [0; 16],
            certificate: [0; MAX_CERTIFICATE_LEN],
            certificate_len: 0,
        }
    }
}

impl HardwareVersion {
    /// Build a hardware version without certificate.
    pub const fn new(major: u8, minor: u8, unique_id: [u8; 16]) -> Self {
        Self {
            major,
            minor,
            unique_id,
            certificate: [0; MAX_CERTIFICATE_LEN],
            certificate_len: 0,
        }
    }

    /// Certificate of authenticity bytes.
    pub fn certificate_of_authenticity(&self) -> &[u8] {
        &self.certificate[..self.certificate_len as usize]
    }

    pub fn set_certificate_of_authenticity(&mut self, bytes: &[u8]) -> Result<(), SerializationError> {
        if bytes.len() > MAX_CERTIFICATE_LEN {
            return Err(SerializationError::FieldTooLong {
                field: "certificate_of_authenticity",
                len: bytes.len(),
                max: MAX_CERTIFICATE_LEN,
            });
        }
        self.certificate[..bytes.len()].copy_from_slice(bytes);
        self.certificate_len = bytes.len() as u8;
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        2 + 16 + 1 + self.certificate_len as usize
    }

    fn write_fields(&self, writer: &mut BitWriter<'_>) -> Result<(), SerializationError> {
        writer.write_u64(u64::from(self.major), 8)?;
        writer.write_u64(u64::from(self.minor), 8)?;
        writer.write_bytes(&self.unique_id)?;
        writer.write_u64(u64::from(self.certificate_len), 8)?;
        writer.write_bytes(self.certificate_of_authenticity())?;
        Ok(())
    }

    fn read_fields(reader: &mut BitReader<'_>) -> Result<Self, DeserializationError> {
        let mut hardware = Self {
            major: reader.read_u8(8)?,
            minor: reader.read_u8(8)?,
            ..Self::default()
        };
        reader.read_bytes(&mut hardware.unique_id)?;
        let len = reader.read_u8(8)?;
        reader.read_bytes(&mut hardware.certificate[..len as usize])?;
        hardware.certificate_len = len;
        Ok(hardware)
    }
}

//==================================================================================NODE_INFO
/// Static identity of a node, as reported in every `GetNodeInfo` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInfo {
    pub software_version: SoftwareVersion,
    pub hardware_version: HardwareVersion,
    name: [u8; MAX_NAME_LEN],
    name_len: u8,
}

impl Default for NodeInfo {
    fn default() -> Self {
        Self {
            software_version: SoftwareVersion::default(),
            hardware_version: HardwareVersion::default(),
            name: [0; MAX_NAME_LEN],
            name_len: 0,
        }
    }
}

impl NodeInfo {
    /// Build an identity with the given name (reverse-domain notation, such
    /// as `org.example.sensor`).
    pub fn new(
        name: &str,
        software_version: SoftwareVersion,
        hardware_version: HardwareVersion,
    ) -> Result<Self, SerializationError> {
        let mut info = Self {
            software_version,
            hardware_version,
            name: [0; MAX_NAME_LEN],
            name_len: 0,
        };
        info.set_name(name.as_bytes())?;
        Ok(info)
    }

    /// Raw name bytes.
    pub fn name(&self) -> &[u8] {
        &self.name[..self.name_len as usize]
    }

    /// Name as UTF-8, `None` if the remote sent something else.
    pub fn name_str(&self) -> Option<&str> {
        core::str::from_utf8(self.name()).ok()
    }

    pub fn set_name(&mut self, name: &[u8]) -> Result<(), SerializationError> {
        if name.len() > MAX_NAME_LEN {
            return Err(SerializationError::FieldTooLong {
                field: "name",
                len: name.len(),
                max: MAX_NAME_LEN,
            });
        }
        self.name[..name.len()].copy_from_slice(name);
        self.name_len = name.len() as u8;
        Ok(())
    }
}

//==================================================================================REQUEST
/// Empty `GetNodeInfo` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GetNodeInfoRequest;

impl DataType for GetNodeInfoRequest {
    const DESCRIPTOR: DataTypeDescriptor = GET_NODE_INFO;
}

impl ToPayload for GetNodeInfoRequest {
    fn to_payload(&self, _buffer: &mut [u8]) -> Result<usize, SerializationError> {
        Ok(0)
    }

    fn payload_len(&self) -> usize {
        0
    }
}

impl FromPayload for GetNodeInfoRequest {
    fn from_payload(_bytes: &[u8]) -> Result<Self, DeserializationError> {
        Ok(GetNodeInfoRequest)
    }
}

//==================================================================================RESPONSE
/// `GetNodeInfo` response: current status plus the node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GetNodeInfoResponse {
    pub status: NodeStatus,
    pub info: NodeInfo,
}

impl GetNodeInfoResponse {
    /// Largest encoding, with the 7-bit name length counted as in DSDL.
    pub const MAX_SIZE: usize = 377;
}

impl DataType for GetNodeInfoResponse {
    const DESCRIPTOR: DataTypeDescriptor = GET_NODE_INFO;
}

impl ToPayload for GetNodeInfoResponse {
    fn to_payload(&self, buffer: &mut [u8]) -> Result<usize, SerializationError> {
        let needed = self.payload_len();
        if buffer.len() < needed {
            return Err(SerializationError::BufferTooSmall {
                needed,
                available: buffer.len(),
            });
        }
        let mut writer = BitWriter::new(&mut buffer[..needed]);
        self.status.write_fields(&mut writer)?;
        self.info.software_version.write_fields(&mut writer)?;
        self.info.hardware_version.write_fields(&mut writer)?;
        // Last field: the name length is implied by the transfer length.
        writer.write_bytes(self.info.name())?;
        Ok(writer.byte_len())
    }

    fn payload_len(&self) -> usize {
        NodeStatus::SIZE
            + SoftwareVersion::SIZE
            + self.info.hardware_version.encoded_len()
            + self.info.name_len as usize
    }
}

impl FromPayload for GetNodeInfoResponse {
    fn from_payload(bytes: &[u8]) -> Result<Self, DeserializationError> {
        let mut reader = BitReader::new(bytes);
        let status = NodeStatus::read_fields(&mut reader)?;
        let software_version = SoftwareVersion::read_fields(&mut reader)?;
        let hardware_version = HardwareVersion::read_fields(&mut reader)?;

        let name_start = reader.bit_cursor() / 8;
        let name = &bytes[name_start..];
        if name.len() > MAX_NAME_LEN {
            return Err(DeserializationError::InvalidDataLength { len: bytes.len() });
        }

        let mut info = NodeInfo {
            software_version,
            hardware_version,
            ..NodeInfo::default()
        };
        info.name[..name.len()].copy_from_slice(name);
        info.name_len = name.len() as u8;
        Ok(Self { status, info })
    }
}

//==================================================================================TESTS
#[cfg(test)]
#[path = "tests.rs"]
mod tests;
