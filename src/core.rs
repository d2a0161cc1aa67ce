//! Vocabulary shared by the transport core, the node instance and the message
//! codecs: node ID bounds, transfer kinds and the data type descriptor that
//! binds a DSDL type ID to its signature.

/// Upper bound for a reassembled transfer payload. Sizes the node scratch
/// buffer; `NodeConfig::max_transfer_payload` may only lower it.
pub const MAX_TRANSFER_PAYLOAD: usize = 1024;

/// Node ID used as "no node": broadcast destination and anonymous source.
pub const BROADCAST_NODE_ID: u8 = 0;
/// Smallest assignable node ID.
pub const MIN_NODE_ID: u8 = 1;
/// Largest assignable node ID (7-bit field).
pub const MAX_NODE_ID: u8 = 127;

/// Returns `true` when `node_id` can be assigned to a node on the bus.
#[inline]
pub const fn is_valid_node_id(node_id: u8) -> bool {
    node_id >= MIN_NODE_ID && node_id <= MAX_NODE_ID
}

/// Kind of transfer, as derived from the CAN identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferType {
    /// Service response (addressed).
    Response = 0,
    /// Service request (addressed).
    Request = 1,
    /// Message broadcast.
    Broadcast = 2,
}

/// Whether a data type is a message or a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataTypeKind {
    Message,
    Service,
}

/// Static description of a DSDL data type as needed by the transport:
/// the numeric ID placed in the CAN identifier and the 64-bit signature that
/// seeds the multi-frame transfer CRC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataTypeDescriptor {
    /// Full DSDL name (diagnostics only).
    pub name: &'static str,
    /// Data type ID (16 bits for messages, 8 bits for services).
    pub id: u16,
    /// DSDL data type signature.
    pub signature: u64,
    /// Message or service.
    pub kind: DataTypeKind,
    /// Largest serialized size in bytes (response size for services).
    pub max_size: usize,
}

impl DataTypeDescriptor {
    /// Returns `true` if this descriptor matches the given transfer.
    pub fn matches(&self, transfer_type: TransferType, data_type_id: u16) -> bool {
        let kind_matches = match transfer_type {
            TransferType::Broadcast => self.kind == DataTypeKind::Message,
            TransferType::Request | TransferType::Response => self.kind == DataTypeKind::Service,
        };
        kind_matches && self.id == data_type_id
    }
}
