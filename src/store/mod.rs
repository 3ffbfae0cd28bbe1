//! Physical block store interface and the in-memory reference store.

mod store_trait;

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::blockref::BlockRef;

// Re-export the block store trait and related types.
pub use self::store_trait::{BlockStore, Result, StoreError};

/// A block store held entirely in memory.
///
/// Backs tests and embedded single-process deployments; production stores
/// live behind the same trait in their own crates.
#[derive(Debug)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<BlockRef, Vec<u8>>>,
    block_size: u64,
}

impl MemoryBlockStore {
    /// Create an empty store with the given fixed block size.
    pub fn new(block_size: u64) -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
            block_size,
        }
    }

    /// Number of physical blocks currently stored, including blocks no
    /// longer referenced by any blockset.
    pub fn block_count(&self) -> usize {
        self.blocks.read().len()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn get_block(&self, r: BlockRef) -> Result<Vec<u8>> {
        self.blocks
            .read()
            .get(&r)
            .cloned()
            .ok_or(StoreError::BlockNotFound(r))
    }

    async fn write_block(&self, r: BlockRef, data: &[u8]) -> Result<()> {
        if data.len() as u64 != self.block_size {
            return Err(StoreError::InvalidBlockSize {
                got: data.len(),
                expected: self.block_size,
            });
        }
        self.blocks.write().insert(r, data.to_vec());
        Ok(())
    }

    fn block_size(&self) -> u64 {
        self.block_size
    }
}
