//! Standard `uavcan.protocol` data types every node publishes or answers.
//!
//! Each structure implements [`DataType`](crate::infra::codec::traits::DataType)
//! for its identifiers, plus the payload conversions used by the services.
pub mod get_node_info;
pub mod node_status;

pub use get_node_info::{
    GetNodeInfoRequest, GetNodeInfoResponse, HardwareVersion, NodeInfo, SoftwareVersion,
    GET_NODE_INFO,
};
pub use node_status::{Health, Mode, NodeStatus, NODE_STATUS};
