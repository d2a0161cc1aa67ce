//! Growable byte buffer made of linked arena blocks.
use super::{Arena, BlockId, BLOCK_SIZE};
use crate::error::ArenaError;

/// Handle to a byte buffer spread over arena blocks. The handle itself is
/// `Copy`; the blocks stay allocated until [`BlockChain::release`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockChain {
    head: Option<BlockId>,
    tail: Option<BlockId>,
    len: usize,
}

impl BlockChain {
    /// Empty chain holding no block.
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Number of bytes stored.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks whether the chain is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Blocks that appending `extra` bytes would allocate.
    pub fn blocks_needed(&self, extra: usize) -> usize {
        (self.len + extra).div_ceil(BLOCK_SIZE) - self.len.div_ceil(BLOCK_SIZE)
    }

    /// Append bytes, allocating blocks as needed. Either every byte is
    /// appended or, when the arena is short, nothing is.
    pub fn extend(&mut self, arena: &mut Arena<'_>, bytes: &[u8]) -> Result<(), ArenaError> {
        arena.ensure_available(self.blocks_needed(bytes.len()))?;

        for &byte in bytes {
            let offset = self.len % BLOCK_SIZE;
            if offset == 0 {
                let id = arena.allocate()?;
                match self.tail {
                    Some(tail) => arena.set_next(tail, Some(id)),
                    None => self.head = Some(id),
                }
                self.tail = Some(id);
            }
            if let Some(tail) = self.tail {
                arena.data_mut(tail)[offset] = byte;
                self.len += 1;
            }
        }
        Ok(())
    }

    /// Copy the content into `out`, returning the number of bytes copied
    /// (bounded by both lengths).
    pub fn copy_to(&self, arena: &Arena<'_>, out: &mut [u8]) -> usize {
        let total = self.len.min(out.len());
        let mut copied = 0;
        let mut cursor = self.head;

        while let Some(id) = cursor {
            if copied >= total {
                break;
            }
            let count = BLOCK_SIZE.min(total - copied);
            out[copied..copied + count].copy_from_slice(&arena.data(id)[..count]);
            copied += count;
            cursor = arena.next(id);
        }
        copied
    }

    /// Give every block back to the arena and reset the handle.
    pub fn release(&mut self, arena: &mut Arena<'_>) {
        let mut cursor = self.head;
        while let Some(id) = cursor {
            cursor = arena.next(id);
            arena.release(id);
        }
        *self = Self::new();
    }
}
