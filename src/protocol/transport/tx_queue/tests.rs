//! Transmit queue ordering and capacity tests.
use super::*;
use crate::infra::arena::Block;

fn frame(id: u32, marker: u8) -> CanFrame {
    CanFrame::from_parts(CanId(id), &[marker, 0xC0]).unwrap()
}

#[test]
/// Frames come out by ascending identifier.
fn test_priority_order() {
    let mut pool = [Block::EMPTY; 8];
    let mut arena = Arena::new(&mut pool);
    let mut queue = TxQueue::new();

    for (id, marker) in [(0x300, 1), (0x100, 2), (0x200, 3)] {
        queue.push(&mut arena, &frame(id, marker)).unwrap();
    }
    assert_eq!(queue.len(), 3);
    assert_eq!(queue.peek(&arena).unwrap().id, CanId(0x100));

    let order: [u8; 3] = core::array::from_fn(|_| queue.pop(&mut arena).unwrap().data[0]);
    assert_eq!(order, [2, 3, 1]);
    assert!(queue.pop(&mut arena).is_none());
    assert_eq!(arena.free_blocks(), 8);
}

#[test]
/// Equal identifiers keep their insertion order.
fn test_fifo_among_equal_identifiers() {
    let mut pool = [Block::EMPTY; 8];
    let mut arena = Arena::new(&mut pool);
    let mut queue = TxQueue::new();

    queue.push(&mut arena, &frame(0x500, 1)).unwrap();
    queue.push(&mut arena, &frame(0x500, 2)).unwrap();
    queue.push(&mut arena, &frame(0x100, 9)).unwrap();
    queue.push(&mut arena, &frame(0x500, 3)).unwrap();

    let order: [u8; 4] = core::array::from_fn(|_| queue.pop(&mut arena).unwrap().data[0]);
    assert_eq!(order, [9, 1, 2, 3]);
}

#[test]
/// Peek leaves the queue untouched and the frame survives the round trip.
fn test_peek_preserves_frame() {
    let mut pool = [Block::EMPTY; 2];
    let mut arena = Arena::new(&mut pool);
    let mut queue = TxQueue::new();

    let original = CanFrame::from_parts(CanId(0x1801_552A), &[1, 2, 3, 4, 5, 6, 7, 0xC1]).unwrap();
    queue.push(&mut arena, &original).unwrap();
    assert_eq!(queue.peek(&arena), Some(original));
    assert_eq!(queue.peek(&arena), Some(original));
    assert_eq!(queue.len(), 1);
}

#[test]
/// A transfer that does not fit leaves the queue exactly as it was.
fn test_push_all_is_atomic() {
    let mut pool = [Block::EMPTY; 3];
    let mut arena = Arena::new(&mut pool);
    let mut queue = TxQueue::new();
    queue.push(&mut arena, &frame(0x10, 0)).unwrap();

    let transfer = [frame(0x20, 1), frame(0x20, 2), frame(0x20, 3)];
    assert_eq!(
        queue.push_all(&mut arena, transfer),
        Err(TxQueueError::Full {
            needed: 3,
            available: 2
        })
    );
    assert_eq!(queue.len(), 1);
    assert_eq!(arena.free_blocks(), 2);

    assert_eq!(queue.push_all(&mut arena, [frame(0x20, 1), frame(0x20, 2)]), Ok(2));
    assert_eq!(arena.free_blocks(), 0);
    assert!(queue.push(&mut arena, &frame(0x01, 0)).is_err());

    queue.clear(&mut arena);
    assert!(queue.is_empty());
    assert_eq!(arena.free_blocks(), 3);
}
