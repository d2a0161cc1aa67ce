//! Creation and extraction of the 29-bit CAN identifiers used by UAVCAN v0.
//!
//! ```text
//!  28..24   23..............8   7   6......0
//! priority  message type ID     0   source        message
//! priority  discriminator|type  0   0             anonymous message
//! priority  type|req|dest       1   source        service
//! ```
use crate::core::{is_valid_node_id, TransferType, BROADCAST_NODE_ID};
use crate::error::CanIdBuildError;
use crate::protocol::transport::priority;

//==================================================================================CAN_ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Encapsulates an extended CAN identifier (29 bits) and exposes accessors
/// for priority, data type ID, transfer kind and node IDs.
pub struct CanId(pub u32);

impl CanId {
    /// Bits used by an extended identifier.
    pub const MASK: u32 = 0x1FFF_FFFF;

    const SERVICE_FLAG: u32 = 1 << 7;
    const REQUEST_FLAG: u32 = 1 << 15;

    // Builder entry point
    /// Creates a `CanIdBuilder` for a data type ID and a source node ID.
    /// Without further configuration it yields a message broadcast.
    pub fn builder(data_type_id: u16, source_node_id: u8) -> CanIdBuilder {
        CanIdBuilder::new(data_type_id, source_node_id)
    }

    /// Returns the priority (5 bits, 0 is the highest).
    pub fn priority(&self) -> u8 {
        ((self.0 >> 24) & 0x1F) as u8
    }

    /// Service bit: set for requests and responses.
    pub fn is_service(&self) -> bool {
        self.0 & Self::SERVICE_FLAG != 0
    }

    /// Request-not-response bit of a service identifier.
    pub fn is_request(&self) -> bool {
        self.is_service() && self.0 & Self::REQUEST_FLAG != 0
    }

    /// Seven-bit source node ID. Zero for anonymous messages.
    pub fn source_node_id(&self) -> u8 {
        (self.0 & 0x7F) as u8
    }

    /// Message sent by a node without a node ID.
    pub fn is_anonymous(&self) -> bool {
        !self.is_service() && self.source_node_id() == BROADCAST_NODE_ID
    }

    /// Destination node ID of a service transfer, 0 for messages.
    pub fn destination_node_id(&self) -> u8 {
        if self.is_service() {
            ((self.0 >> 8) & 0x7F) as u8
        } else {
            BROADCAST_NODE_ID
        }
    }

    /// Kind of transfer carried by frames with this identifier.
    pub fn transfer_type(&self) -> TransferType {
        if !self.is_service() {
            TransferType::Broadcast
        } else if self.is_request() {
            TransferType::Request
        } else {
            TransferType::Response
        }
    }

    /// Data type ID. Its width depends on the transfer kind: 8 bits for
    /// services, 2 bits for anonymous messages and 16 bits otherwise.
    pub fn data_type_id(&self) -> u16 {
        if self.is_service() {
            ((self.0 >> 16) & 0xFF) as u16
        } else if self.is_anonymous() {
            ((self.0 >> 8) & 0x03) as u16
        } else {
            ((self.0 >> 8) & 0xFFFF) as u16
        }
    }
}

//==================================================================================CAN_ID_BUILDER
/// Addressing of a service transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTarget {
    pub destination_node_id: u8,
    pub request: bool,
}

#[derive(Debug)]
/// Fluent builder that enforces the UAVCAN v0 field ranges.
pub struct CanIdBuilder {
    pub priority: u8,
    pub data_type_id: u16,
    pub source_node_id: u8,
    pub service: Option<ServiceTarget>,
    pub discriminator: u16,
}

impl CanIdBuilder {
    /// Initializes the builder for a given data type and source node.
    pub fn new(data_type_id: u16, source_node_id: u8) -> Self {
        Self {
            priority: priority::MEDIUM,
            data_type_id,
            source_node_id,
            service: None,
            discriminator: 0,
        }
    }

    /// Sets the priority (5 bits). Out-of-range values are rejected by `build`.
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Turns the identifier into a service request addressed to `destination`.
    pub fn request_to(mut self, destination: u8) -> Self {
        self.service = Some(ServiceTarget {
            destination_node_id: destination,
            request: true,
        });
        self
    }

    /// Turns the identifier into a service response addressed to `destination`.
    pub fn response_to(mut self, destination: u8) -> Self {
        self.service = Some(ServiceTarget {
            destination_node_id: destination,
            request: false,
        });
        self
    }

    /// Discriminator of an anonymous message (14 bits kept).
    pub fn with_discriminator(mut self, discriminator: u16) -> Self {
        self.discriminator = discriminator & 0x3FFF;
        self
    }

    /// Builds the CAN identifier:
    /// - priority must fit 5 bits
    /// - service: data type ID ≤ 255, source and destination in 1..=127
    /// - message: source ≤ 127; an anonymous source (0) limits the data type ID to 2 bits
    pub fn build(self) -> Result<CanId, CanIdBuildError> {
        if self.priority > priority::LOWEST {
            return Err(CanIdBuildError::InvalidPriority {
                priority: self.priority,
            });
        }
        let priority = (self.priority as u32) << 24;
        let data_type_id = self.data_type_id;

        match self.service {
            Some(target) => {
                if data_type_id > 0xFF {
                    return Err(CanIdBuildError::DataTypeIdOutOfRange { data_type_id });
                }
                for node_id in [self.source_node_id, target.destination_node_id] {
                    if !is_valid_node_id(node_id) {
                        return Err(CanIdBuildError::InvalidNodeId { node_id });
                    }
                }
                let request = if target.request { CanId::REQUEST_FLAG } else { 0 };
                Ok(CanId(
                    priority
                        | ((data_type_id as u32) << 16)
                        | request
                        | ((target.destination_node_id as u32) << 8)
                        | CanId::SERVICE_FLAG
                        | self.source_node_id as u32,
                ))
            }
            None if self.source_node_id == BROADCAST_NODE_ID => {
                if data_type_id > 0x03 {
                    return Err(CanIdBuildError::DataTypeIdOutOfRange { data_type_id });
                }
                Ok(CanId(
                    priority | ((self.discriminator as u32) << 10) | ((data_type_id as u32) << 8),
                ))
            }
            None => {
                if self.source_node_id > crate::core::MAX_NODE_ID {
                    return Err(CanIdBuildError::InvalidNodeId {
                        node_id: self.source_node_id,
                    });
                }
                Ok(CanId(
                    priority | ((data_type_id as u32) << 8) | self.source_node_id as u32,
                ))
            }
        }
    }
}
