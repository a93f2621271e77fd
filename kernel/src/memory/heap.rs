//! Per-process heap allocator.
//!
//! A linear partition of the fixed per-process heap region, described by a
//! bounded table of block records (used flag + length in 32-byte blocks).
//! First-fit with split on allocate; exact-match free with two-sided
//! coalescing. Each process owns one allocator instance inside its PCB, so
//! heap namespaces are fully isolated.

use alloc::vec::Vec;

use crate::config::{HEAP_BLOCK_SIZE, HEAP_MAX_RECORDS, USER_HEAP_SIZE};

/// Total number of allocation granules in the heap region.
pub const TOTAL_BLOCKS: usize = USER_HEAP_SIZE / HEAP_BLOCK_SIZE;

/// Heap allocator failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// No free block fits the request, or the record table is full.
    AllocationExhausted,
    /// Freed pointer does not match the start of a live allocation.
    InvalidPointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockRecord {
    used: bool,
    blocks: u16,
}

/// Block-bitmap first-fit allocator over one process's heap region.
///
/// Offsets handed out are byte offsets from the heap base; the syscall
/// layer translates them to user virtual addresses.
#[derive(Debug, Clone)]
pub struct BlockAllocator {
    records: Vec<BlockRecord>,
}

impl BlockAllocator {
    /// Baseline state: one sentinel record spanning the whole heap,
    /// marked free.
    pub fn new() -> Self {
        let mut records = Vec::new();
        records.push(BlockRecord {
            used: false,
            blocks: TOTAL_BLOCKS as u16,
        });
        BlockAllocator { records }
    }

    /// Number of live block records (used and free).
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// First-fit allocation of `len` bytes, rounded up to whole blocks.
    /// Returns the byte offset of the allocation.
    pub fn allocate(&mut self, len: usize) -> Result<u32, AllocError> {
        let needed = len.div_ceil(HEAP_BLOCK_SIZE).max(1);
        if needed > u16::MAX as usize {
            return Err(AllocError::AllocationExhausted);
        }
        let needed = needed as u16;

        let mut offset_blocks: u32 = 0;
        for i in 0..self.records.len() {
            let rec = self.records[i];
            if !rec.used && rec.blocks >= needed {
                if rec.blocks > needed {
                    // Split: front portion used, remainder stays free.
                    if self.records.len() == HEAP_MAX_RECORDS {
                        return Err(AllocError::AllocationExhausted);
                    }
                    self.records[i] = BlockRecord {
                        used: true,
                        blocks: needed,
                    };
                    self.records.insert(
                        i + 1,
                        BlockRecord {
                            used: false,
                            blocks: rec.blocks - needed,
                        },
                    );
                } else {
                    self.records[i].used = true;
                }
                return Ok(offset_blocks * HEAP_BLOCK_SIZE as u32);
            }
            offset_blocks += rec.blocks as u32;
        }
        Err(AllocError::AllocationExhausted)
    }

    /// Free the allocation starting exactly at byte offset `offset`,
    /// coalescing with free neighbors on either side.
    pub fn free(&mut self, offset: u32) -> Result<(), AllocError> {
        if offset % HEAP_BLOCK_SIZE as u32 != 0 {
            return Err(AllocError::InvalidPointer);
        }
        let target_blocks = offset / HEAP_BLOCK_SIZE as u32;

        let mut start: u32 = 0;
        for i in 0..self.records.len() {
            let rec = self.records[i];
            if start == target_blocks {
                if !rec.used {
                    return Err(AllocError::InvalidPointer);
                }
                self.records[i].used = false;
                // Merge the following free neighbor first so the index
                // of the preceding one stays valid.
                if i + 1 < self.records.len() && !self.records[i + 1].used {
                    self.records[i].blocks += self.records[i + 1].blocks;
                    self.records.remove(i + 1);
                }
                if i > 0 && !self.records[i - 1].used {
                    self.records[i - 1].blocks += self.records[i].blocks;
                    self.records.remove(i);
                }
                return Ok(());
            }
            if start > target_blocks {
                break;
            }
            start += rec.blocks as u32;
        }
        Err(AllocError::InvalidPointer)
    }

    /// Total free blocks (for diagnostics and tests).
    pub fn free_blocks(&self) -> usize {
        self.records
            .iter()
            .filter(|r| !r.used)
            .map(|r| r.blocks as usize)
            .sum()
    }
}

impl Default for BlockAllocator {
    fn default() -> Self {
        Self::new()
    }
}
