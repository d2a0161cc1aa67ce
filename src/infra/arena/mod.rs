//! Fixed-capacity block arena.
//!
//! The node never allocates at runtime: every reassembly buffer and every
//! queued transmit frame lives in blocks taken from a pool the application
//! hands over once at startup (typically a `static` array). Blocks are
//! addressed by index handles and linked into chains, so allocation and
//! release are O(1) and the worst-case memory footprint is known up front.
use crate::error::ArenaError;

mod chain;

pub use chain::BlockChain;

/// Payload bytes carried by one block.
pub const BLOCK_SIZE: usize = 32;

/// Largest pool the 16-bit handles can address.
pub const MAX_BLOCKS: usize = u16::MAX as usize + 1;

//==================================================================================BLOCK
/// Index handle into the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlockId(u16);

impl BlockId {
    /// Position of the block in the pool.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Storage unit of the arena. Applications only create them, through
/// [`Block::EMPTY`], to size the pool.
#[derive(Debug, Clone, Copy)]
pub struct Block {
    data: [u8; BLOCK_SIZE],
    next: Option<BlockId>,
}

impl Block {
    /// Unused block, suitable for array initialisation in a `static`.
    pub const EMPTY: Block = Block {
        data: [0; BLOCK_SIZE],
        next: None,
    };
}

impl Default for Block {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Snapshot of the arena usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ArenaStatistics {
    /// Total number of blocks in the pool.
    pub capacity_blocks: usize,
    /// Blocks currently allocated.
    pub current_usage_blocks: usize,
    /// Highest simultaneous usage since creation.
    pub peak_usage_blocks: usize,
}

//==================================================================================ARENA
/// Block allocator over a caller-provided pool.
pub struct Arena<'a> {
    blocks: &'a mut [Block],
    free_head: Option<BlockId>,
    used: usize,
    peak: usize,
}

impl<'a> Arena<'a> {
    /// Take ownership of `blocks` and thread them into the free list.
    /// Blocks beyond [`MAX_BLOCKS`] are left unused.
    pub fn new(blocks: &'a mut [Block]) -> Self {
        let usable = blocks.len().min(MAX_BLOCKS);
        let blocks = &mut blocks[..usable];

        for (index, block) in blocks.iter_mut().enumerate() {
            block.next = if index + 1 < usable {
                Some(BlockId((index + 1) as u16))
            } else {
                None
            };
        }

        Self {
            free_head: if usable > 0 { Some(BlockId(0)) } else { None },
            blocks,
            used: 0,
            peak: 0,
        }
    }

    /// Number of blocks in the pool.
    pub fn capacity(&self) -> usize {
        self.blocks.len()
    }

    /// Number of blocks available for allocation.
    pub fn free_blocks(&self) -> usize {
        self.blocks.len() - self.used
    }

    /// Fail early, without allocating, when fewer than `needed` blocks remain.
    pub fn ensure_available(&self, needed: usize) -> Result<(), ArenaError> {
        let available = self.free_blocks();
        if needed > available {
            return Err(ArenaError::OutOfMemory { needed, available });
        }
        Ok(())
    }

    /// Take one block from the free list.
    pub fn allocate(&mut self) -> Result<BlockId, ArenaError> {
        let id = self.free_head.ok_or(ArenaError::OutOfMemory {
            needed: 1,
            available: 0,
        })?;
        let block = &mut self.blocks[id.index()];
        self.free_head = block.next.take();

        self.used += 1;
        self.peak = self.peak.max(self.used);
        Ok(id)
    }

    /// Return one block to the free list. Its link is overwritten.
    pub fn release(&mut self, id: BlockId) {
        self.blocks[id.index()].next = self.free_head;
        self.free_head = Some(id);
        self.used -= 1;
    }

    /// Read access to a block's payload bytes.
    pub fn data(&self, id: BlockId) -> &[u8; BLOCK_SIZE] {
        &self.blocks[id.index()].data
    }

    /// Write access to a block's payload bytes.
    pub fn data_mut(&mut self, id: BlockId) -> &mut [u8; BLOCK_SIZE] {
        &mut self.blocks[id.index()].data
    }

    /// Successor of an allocated block in its chain.
    pub fn next(&self, id: BlockId) -> Option<BlockId> {
        self.blocks[id.index()].next
    }

    /// Link an allocated block to its successor.
    pub fn set_next(&mut self, id: BlockId, next: Option<BlockId>) {
        self.blocks[id.index()].next = next;
    }

    /// Current usage figures.
    pub fn statistics(&self) -> ArenaStatistics {
        ArenaStatistics {
            capacity_blocks: self.blocks.len(),
            current_usage_blocks: self.used,
            peak_usage_blocks: self.peak,
        }
    }
}
