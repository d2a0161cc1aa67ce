//! High-level components of the UAVCAN v0 protocol: CAN transport, the node
//! instance, standard message structures, and the services built on them.
pub mod messages;
pub mod node;
pub mod services;
pub mod transport;
