//! End-to-end transfer properties exercised through the public node API:
//! fragmentation on one node, reassembly and acceptance on another.

use korri_uavcan::{
    core::{DataTypeDescriptor, DataTypeKind, TransferType},
    error::RxError,
    infra::arena::{Arena, Block},
    protocol::{
        node::{DiscardReason, Node, NodeConfig, Publisher, RxOutcome, TransferHandler},
        transport::{
            can_frame::CanFrame,
            can_id::CanId,
            priority,
            transfer::{RxTransfer, TransferId},
            tx_queue::TxQueue,
        },
    },
};

type TestNode<'a> = Node<'a, 4, 8>;

const BULK: DataTypeDescriptor = DataTypeDescriptor {
    name: "org.korri.Bulk",
    id: 1_000,
    signature: 0x0123_4567_89AB_CDEF,
    kind: DataTypeKind::Message,
    max_size: 256,
};

/// Keeps every delivered transfer.
#[derive(Default)]
struct Sink {
    delivered: Vec<(u8, u8, Vec<u8>)>,
}

impl TransferHandler for Sink {
    fn should_accept(&self, transfer_type: TransferType, data_type_id: u16, _source: u8) -> Option<u64> {
        BULK.matches(transfer_type, data_type_id).then_some(BULK.signature)
    }

    fn on_transfer_received(&mut self, transfer: &RxTransfer<'_>, _publisher: &mut Publisher<'_, '_>) {
        self.delivered.push((
            transfer.source_node_id,
            transfer.transfer_id.value(),
            transfer.payload.to_vec(),
        ));
    }
}

fn frames_of(node: &mut TestNode<'_>) -> Vec<CanFrame> {
    std::iter::from_fn(|| node.pop_tx()).collect()
}

fn send(node: &mut TestNode<'_>, transfer_id: u8, payload: &[u8]) -> Vec<CanFrame> {
    let mut tid = TransferId::new(transfer_id);
    node.broadcast(&BULK, &mut tid, priority::MEDIUM, payload)
        .unwrap();
    frames_of(node)
}

#[test]
fn single_frame_transfer_keeps_payload_and_transfer_id() {
    let mut pool_tx = [Block::EMPTY; 4];
    let mut pool_rx = [Block::EMPTY; 4];
    let mut sender = TestNode::new(NodeConfig::new().with_node_id(10), &mut pool_tx).unwrap();
    let mut receiver = TestNode::new(NodeConfig::new().with_node_id(20), &mut pool_rx).unwrap();
    let mut sink = Sink::default();

    let frames = send(&mut sender, 17, &[9, 8, 7, 6, 5, 4, 3]);
    assert_eq!(frames.len(), 1);
    assert_eq!(
        receiver.handle_rx_frame(&frames[0], 0, &mut sink),
        Ok(RxOutcome::Delivered)
    );
    assert_eq!(sink.delivered, vec![(10, 17, vec![9, 8, 7, 6, 5, 4, 3])]);
}

#[test]
fn multi_frame_transfer_complete_and_with_gap() {
    let payload: Vec<u8> = (0..64u8).collect();
    let mut pool_tx = [Block::EMPTY; 16];
    let mut pool_rx = [Block::EMPTY; 8];
    let mut sender = TestNode::new(NodeConfig::new().with_node_id(10), &mut pool_tx).unwrap();
    let mut receiver = TestNode::new(NodeConfig::new().with_node_id(20), &mut pool_rx).unwrap();
    let mut sink = Sink::default();

    let frames = send(&mut sender, 0, &payload);
    assert_eq!(frames.len(), 10);
    for frame in &frames {
        receiver.handle_rx_frame(frame, 0, &mut sink).unwrap();
    }
    assert_eq!(sink.delivered.len(), 1);
    assert_eq!(sink.delivered[0].2, payload);

    let frames = send(&mut sender, 1, &payload);
    for (index, frame) in frames.iter().enumerate() {
        if index == 4 {
            continue;
        }
        let outcome = receiver.handle_rx_frame(frame, 10, &mut sink).unwrap();
        assert_ne!(outcome, RxOutcome::Delivered);
    }
    assert_eq!(sink.delivered.len(), 1);
    assert_eq!(receiver.active_sessions(), 0);
    assert_eq!(receiver.arena_statistics().current_usage_blocks, 0);
}

#[test]
fn toggle_violation_only_hits_its_own_transfer() {
    let payload_a = [0xAA; 30];
    let payload_b = [0xBB; 30];
    let mut pool_a = [Block::EMPTY; 8];
    let mut pool_b = [Block::EMPTY; 8];
    let mut pool_rx = [Block::EMPTY; 8];
    let mut node_a = TestNode::new(NodeConfig::new().with_node_id(10), &mut pool_a).unwrap();
    let mut node_b = TestNode::new(NodeConfig::new().with_node_id(11), &mut pool_b).unwrap();
    let mut receiver = TestNode::new(NodeConfig::new().with_node_id(20), &mut pool_rx).unwrap();
    let mut sink = Sink::default();

    let mut frames_a = send(&mut node_a, 3, &payload_a);
    let frames_b = send(&mut node_b, 3, &payload_b);
    assert_eq!(frames_a.len(), frames_b.len());

    // flip the toggle bit of A's third frame
    let corrupted = &mut frames_a[2];
    corrupted.data[corrupted.len - 1] ^= 0x20;

    let mut outcomes_a = Vec::new();
    for (a, b) in frames_a.iter().zip(&frames_b) {
        outcomes_a.push(receiver.handle_rx_frame(a, 0, &mut sink).unwrap());
        receiver.handle_rx_frame(b, 0, &mut sink).unwrap();
    }

    assert_eq!(outcomes_a[2], RxOutcome::Discarded(DiscardReason::WrongToggle));
    assert_eq!(sink.delivered.len(), 1);
    assert_eq!(sink.delivered[0].0, 11);
    assert_eq!(sink.delivered[0].2, payload_b);
}

#[test]
fn transfer_id_replay_and_forward_window() {
    let mut pool_tx = [Block::EMPTY; 4];
    let mut pool_rx = [Block::EMPTY; 4];
    let mut sender = TestNode::new(NodeConfig::new().with_node_id(10), &mut pool_tx).unwrap();
    let mut receiver = TestNode::new(NodeConfig::new().with_node_id(20), &mut pool_rx).unwrap();
    let mut sink = Sink::default();

    let first = send(&mut sender, 28, &[1]);
    assert_eq!(receiver.handle_rx_frame(&first[0], 0, &mut sink), Ok(RxOutcome::Delivered));
    assert_eq!(
        receiver.handle_rx_frame(&first[0], 1, &mut sink),
        Ok(RxOutcome::Discarded(DiscardReason::DuplicateTransferId))
    );

    // 28 -> 2 wraps around the 5-bit counter, still ahead
    let wrapped = send(&mut sender, 2, &[2]);
    assert_eq!(receiver.handle_rx_frame(&wrapped[0], 2, &mut sink), Ok(RxOutcome::Delivered));

    // behind the last accepted ID
    let older = send(&mut sender, 30, &[3]);
    assert_eq!(
        receiver.handle_rx_frame(&older[0], 3, &mut sink),
        Ok(RxOutcome::Discarded(DiscardReason::StaleTransferId))
    );
    assert_eq!(sink.delivered.len(), 2);
}

#[test]
fn transmit_queue_drains_in_ascending_id_order() {
    let mut pool = [Block::EMPTY; 4];
    let mut arena = Arena::new(&mut pool);
    let mut queue = TxQueue::new();

    for raw in [0x500u32, 0x100, 0x300] {
        let frame = CanFrame::from_parts(CanId(raw), &[0xC0]).unwrap();
        queue.push(&mut arena, &frame).unwrap();
    }
    let drained: Vec<u32> = std::iter::from_fn(|| queue.pop(&mut arena))
        .map(|frame| frame.id.0)
        .collect();
    assert_eq!(drained, vec![0x100, 0x300, 0x500]);
    assert_eq!(arena.free_blocks(), 4);
}

#[test]
fn arena_exhaustion_leaves_other_transfers_intact() {
    let mut pool_a = [Block::EMPTY; 8];
    let mut pool_b = [Block::EMPTY; 8];
    let mut pool_rx = [Block::EMPTY; 2];
    let mut node_a = TestNode::new(NodeConfig::new().with_node_id(10), &mut pool_a).unwrap();
    let mut node_b = TestNode::new(NodeConfig::new().with_node_id(11), &mut pool_b).unwrap();
    let mut receiver = TestNode::new(NodeConfig::new().with_node_id(20), &mut pool_rx).unwrap();
    let mut sink = Sink::default();

    // 40 bytes need two 32-byte blocks once complete
    let payload_a = [0x5A; 40];
    let frames_a = send(&mut node_a, 0, &payload_a);
    let frames_b = send(&mut node_b, 0, &[0xB0; 20]);

    // A's first five frames fill the first block and open the second
    for frame in &frames_a[..5] {
        assert_eq!(receiver.handle_rx_frame(frame, 0, &mut sink), Ok(RxOutcome::Consumed));
    }
    assert_eq!(receiver.arena_statistics().current_usage_blocks, 2);

    assert_eq!(
        receiver.handle_rx_frame(&frames_b[0], 0, &mut sink),
        Err(RxError::OutOfMemory)
    );

    for frame in &frames_a[5..] {
        receiver.handle_rx_frame(frame, 0, &mut sink).unwrap();
    }
    assert_eq!(sink.delivered.len(), 1);
    assert_eq!(sink.delivered[0].2, payload_a.to_vec());
    assert_eq!(receiver.arena_statistics().current_usage_blocks, 0);
}
