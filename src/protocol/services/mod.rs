//! Node-level services layered on the transport core: periodic NodeStatus
//! broadcast, GetNodeInfo answering, and the two ways of driving a node
//! (a polling spinner over a [`CanDriver`](crate::protocol::transport::traits::can_driver::CanDriver)
//! and an async runner over a [`CanBus`](crate::protocol::transport::traits::can_bus::CanBus)).
pub mod heartbeat;
pub mod node_info;
pub mod runner;
pub mod spinner;

pub use heartbeat::Heartbeat;
pub use node_info::NodeServices;
