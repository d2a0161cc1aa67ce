//! Quickstart: two in-memory nodes exchange a NodeStatus broadcast and a
//! multi-frame transfer, showing what goes on the wire.

use korri_uavcan::{
    core::{DataTypeDescriptor, DataTypeKind, TransferType},
    infra::arena::Block,
    infra::codec::traits::ToPayload,
    protocol::{
        messages::{Health, Mode, NodeStatus, NODE_STATUS},
        node::{Node, NodeConfig, Publisher, TransferHandler},
        transport::{
            priority,
            transfer::{RxTransfer, TransferId},
        },
    },
};

const DEMO_BLOB: DataTypeDescriptor = DataTypeDescriptor {
    name: "org.korri.demo.Blob",
    id: 20_500,
    signature: 0x1111_2222_3333_4444,
    kind: DataTypeKind::Message,
    max_size: 64,
};

/// Prints whatever it receives.
struct Printer;

impl TransferHandler for Printer {
    fn should_accept(&self, transfer_type: TransferType, data_type_id: u16, _source: u8) -> Option<u64> {
        [NODE_STATUS, DEMO_BLOB]
            .into_iter()
            .find(|descriptor| descriptor.matches(transfer_type, data_type_id))
            .map(|descriptor| descriptor.signature)
    }

    fn on_transfer_received(&mut self, transfer: &RxTransfer<'_>, _publisher: &mut Publisher<'_, '_>) {
        println!(
            "  <- transfer {} from node {}: type {}, {} bytes",
            transfer.transfer_id.value(),
            transfer.source_node_id,
            transfer.data_type_id,
            transfer.payload.len()
        );
        if transfer.data_type_id == NODE_STATUS.id {
            match transfer.decode::<NodeStatus>() {
                Ok(status) => println!("     {:?}", status),
                Err(err) => println!("     undecodable status: {}", err),
            }
        }
    }
}

fn main() {
    println!("=== korri-uavcan quickstart ===\n");

    let mut sender_blocks = [Block::EMPTY; 16];
    let mut receiver_blocks = [Block::EMPTY; 16];
    let mut sender: Node<'_> =
        Node::new(NodeConfig::new().with_node_id(42), &mut sender_blocks).expect("valid config");
    let mut receiver: Node<'_> =
        Node::new(NodeConfig::new().with_node_id(10), &mut receiver_blocks).expect("valid config");

    // 1. NodeStatus fits a single frame.
    println!("1. NodeStatus broadcast:");
    let status = NodeStatus {
        uptime_sec: 3600,
        health: Health::Ok,
        mode: Mode::Operational,
        sub_mode: 0,
        vendor_specific_status_code: 0x00AB,
    };
    let mut buffer = [0u8; NodeStatus::SIZE];
    let len = status.to_payload(&mut buffer).expect("buffer sized for NodeStatus");
    println!("  payload: {:02X?}", &buffer[..len]);

    let mut status_id = TransferId::default();
    sender
        .publisher()
        .broadcast_message(&status, &mut status_id, priority::LOW)
        .expect("queue has room");
    forward(&mut sender, &mut receiver);

    // 2. Larger payloads are split, CRC first.
    println!("\n2. 40-byte broadcast:");
    let blob: Vec<u8> = (0..40).collect();
    let mut blob_id = TransferId::default();
    let frames = sender
        .broadcast(&DEMO_BLOB, &mut blob_id, priority::MEDIUM, &blob)
        .expect("queue has room");
    println!("  {} frames queued", frames);
    forward(&mut sender, &mut receiver);

    let stats = receiver.arena_statistics();
    println!(
        "\nReceiver arena: {}/{} blocks in use, peak {}",
        stats.current_usage_blocks, stats.capacity_blocks, stats.peak_usage_blocks
    );
    println!("\n=== Quickstart completed ===");
}

/// Move every queued frame from `from` to `to`, printing it on the way.
fn forward(from: &mut Node<'_>, to: &mut Node<'_>) {
    while let Some(frame) = from.pop_tx() {
        println!("  -> 0x{:08X} {:02X?}", frame.id.0, frame.payload());
        if let Err(err) = to.handle_rx_frame(&frame, 0, &mut Printer) {
            println!("  receive failed: {}", err);
        }
    }
}
