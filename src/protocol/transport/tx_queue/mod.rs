//! Transmit priority queue.
//!
//! Frames wait here until the CAN driver accepts them. The queue is a sorted
//! singly linked list threaded through arena blocks (one frame per block):
//! the head is always the frame with the lowest identifier, so the bus sees
//! the highest-priority traffic first, and frames sharing an identifier keep
//! their insertion order so multi-frame transfers never get reordered.
use crate::error::TxQueueError;
use crate::infra::arena::{Arena, BlockId, BLOCK_SIZE};
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::can_id::CanId;

// Block layout of a queued frame: identifier (LE), length, payload.
const ID_OFFSET: usize = 0;
const LEN_OFFSET: usize = 4;
const DATA_OFFSET: usize = 5;
const _: () = assert!(DATA_OFFSET + 8 <= BLOCK_SIZE);

//==================================================================================TX_QUEUE
/// Ordered queue of outgoing frames. All storage lives in the arena passed to
/// each call, which must be the one the frames were pushed with.
#[derive(Debug, Default)]
pub struct TxQueue {
    head: Option<BlockId>,
    len: usize,
}

impl TxQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Number of frames waiting.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Highest-priority frame, left in place.
    pub fn peek(&self, arena: &Arena<'_>) -> Option<CanFrame> {
        self.head.map(|id| load(arena, id))
    }

    /// Remove and return the highest-priority frame.
    pub fn pop(&mut self, arena: &mut Arena<'_>) -> Option<CanFrame> {
        let head = self.head?;
        let frame = load(arena, head);
        self.head = arena.next(head);
        arena.release(head);
        self.len -= 1;
        Some(frame)
    }

    /// Insert one frame behind every queued frame whose identifier is lower
    /// than or equal to its own.
    pub fn push(&mut self, arena: &mut Arena<'_>, frame: &CanFrame) -> Result<(), TxQueueError> {
        let block = arena.allocate().map_err(|_| TxQueueError::Full {
            needed: 1,
            available: 0,
        })?;
        store(arena, block, frame);

        let key = frame.id;
        let mut previous: Option<BlockId> = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            if load_id(arena, id) > key {
                break;
            }
            previous = Some(id);
            cursor = arena.next(id);
        }

        arena.set_next(block, cursor);
        match previous {
            Some(previous) => arena.set_next(previous, Some(block)),
            None => self.head = Some(block),
        }
        self.len += 1;
        Ok(())
    }

    /// Insert every frame of a transfer, or none of them when the arena cannot
    /// hold them all. Returns the number of frames queued.
    pub fn push_all<I>(&mut self, arena: &mut Arena<'_>, frames: I) -> Result<usize, TxQueueError>
    where
        I: IntoIterator<Item = CanFrame>,
        I::IntoIter: ExactSizeIterator,
    {
        let frames = frames.into_iter();
        let needed = frames.len();
        arena.ensure_available(needed)?;

        let mut queued = 0;
        for frame in frames {
            self.push(arena, &frame)?;
            queued += 1;
        }
        Ok(queued)
    }

    /// Drop every queued frame.
    pub fn clear(&mut self, arena: &mut Arena<'_>) {
        while self.pop(arena).is_some() {}
    }
}

fn store(arena: &mut Arena<'_>, block: BlockId, frame: &CanFrame) {
    let data = arena.data_mut(block);
    data[ID_OFFSET..LEN_OFFSET].copy_from_slice(&frame.id.0.to_le_bytes());
    data[LEN_OFFSET] = frame.len.min(8) as u8;
    data[DATA_OFFSET..DATA_OFFSET + 8].copy_from_slice(&frame.data);
}

fn load_id(arena: &Arena<'_>, block: BlockId) -> CanId {
    let data = arena.data(block);
    CanId(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
}

fn load(arena: &Arena<'_>, block: BlockId) -> CanFrame {
    let raw = arena.data(block);
    let mut data = [0u8; 8];
    data.copy_from_slice(&raw[DATA_OFFSET..DATA_OFFSET + 8]);
    CanFrame {
        id: load_id(arena, block),
        data,
        len: raw[LEN_OFFSET] as usize,
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
