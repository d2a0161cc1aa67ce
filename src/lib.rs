//! `korri-uavcan` library: the UAVCAN v0 transport core for CAN in a `no_std`
//! environment. The crate exposes the infrastructure modules (bit codec, CRC,
//! block arena), the protocol logic (CAN identifiers, transfer reassembly and
//! fragmentation, transmit queue, transfer-ID tracking, node instance) and the
//! node services built on top (heartbeat, node info, polling and async loops).
#![no_std]
//==================================================================================
/// Shared vocabulary: node ID bounds, transfer types, data type descriptors.
pub mod core;
/// Errors for every layer (codec, arena, identifiers, transmit, receive,
/// configuration, drivers).
pub mod error;
/// Low-level building blocks: bit-packed scalar codec, transfer CRC, arena.
pub mod infra;
/// UAVCAN v0 protocol implementation: transport, node instance, messages and
/// node services.
pub mod protocol;
//==================================================================================
