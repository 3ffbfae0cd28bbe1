//! The base (leaf) blockset: a direct 1:1 mapping from logical block index
//! to physical block reference.
//!
//! Every non-zero entry was allocated by this blockset's own counter and is
//! unique within it; entries holding [`BlockRef::ZERO`] are sparse and read
//! as zero-filled blocks without touching the store.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arrayref::array_ref;
use async_trait::async_trait;

use super::{Blockset, Kind};
use crate::bitmap::InodeBitmap;
use crate::blockref::{BlockRef, IndexId, InodeRef, BLOCK_REF_BYTE_SIZE};
use crate::error::{Error, Result};
use crate::store::BlockStore;

/// Store read failures surfaced by base blocksets since process start.
static READ_FAILURES: AtomicU64 = AtomicU64::new(0);

/// The leaf blockset variant backed 1:1 by physical storage.
pub struct BaseBlockset {
    /// Allocation counter. Monotonically increasing; ids consumed by failed
    /// store writes are burned, never reused.
    ids: AtomicU64,
    blocks: Vec<BlockRef>,
    store: Arc<dyn BlockStore>,
    blocksize: u64,
}

pub(super) fn create_base_blockset(
    _params: &str,
    store: Arc<dyn BlockStore>,
    _sub: Option<Box<dyn Blockset>>,
) -> Result<Box<dyn Blockset>> {
    Ok(Box::new(BaseBlockset::new(store)))
}

impl BaseBlockset {
    /// Create an empty base blockset bound to `store`. The store's block
    /// size is read once here.
    pub fn new(store: Arc<dyn BlockStore>) -> Self {
        let blocksize = store.block_size();
        Self {
            ids: AtomicU64::new(0),
            blocks: Vec::new(),
            store,
            blocksize,
        }
    }

    fn make_id(&self, inode: InodeRef) -> BlockRef {
        let id = self.ids.fetch_add(1, Ordering::SeqCst) + 1;
        BlockRef::new(inode, IndexId(id))
    }

    /// Total store read failures surfaced by base blocksets in this
    /// process.
    pub fn read_failures() -> u64 {
        READ_FAILURES.load(Ordering::Relaxed)
    }

    /// Like [`Blockset::unmarshal`], but rejects a buffer whose length is
    /// not a whole multiple of [`BLOCK_REF_BYTE_SIZE`] instead of dropping
    /// the trailing partial entry.
    pub fn unmarshal_strict(&mut self, data: &[u8]) -> Result<()> {
        if data.len() % BLOCK_REF_BYTE_SIZE != 0 {
            return Err(Error::MisalignedRefBuffer(data.len()));
        }
        Blockset::unmarshal(self, data)
    }
}

#[async_trait]
impl Blockset for BaseBlockset {
    fn length(&self) -> usize {
        self.blocks.len()
    }

    fn kind(&self) -> Kind {
        Kind::BASE
    }

    async fn get_block(&self, i: usize) -> Result<Vec<u8>> {
        if i >= self.blocks.len() {
            return Err(Error::BlockNotExist);
        }
        let block_ref = self.blocks[i];
        if block_ref.is_zero() {
            // Sparse read: every caller gets its own zero buffer.
            return Ok(vec![0u8; self.blocksize as usize]);
        }
        log::trace!("base: reading block {} at {}", i, block_ref);
        match self.store.get_block(block_ref).await {
            Ok(data) => Ok(data),
            Err(e) => {
                READ_FAILURES.fetch_add(1, Ordering::Relaxed);
                log::warn!("base: read of block {} at {} failed: {}", i, block_ref, e);
                Err(e.into())
            }
        }
    }

    async fn put_block(&mut self, inode: InodeRef, i: usize, data: &[u8]) -> Result<()> {
        if i > self.blocks.len() {
            return Err(Error::BlockNotExist);
        }
        let new_ref = self.make_id(inode);
        log::trace!("base: writing block {} at {}", i, new_ref);
        // The mapping is only updated once the store write has succeeded; a
        // failed write leaves the sequence untouched and the id burned.
        self.store.write_block(new_ref, data).await?;
        if i == self.blocks.len() {
            self.blocks.push(new_ref);
        } else {
            self.blocks[i] = new_ref;
        }
        Ok(())
    }

    fn truncate(&mut self, last_index: usize, _blocksize: u64) -> Result<()> {
        if last_index <= self.blocks.len() {
            self.blocks.truncate(last_index);
            return Ok(());
        }
        // Extension is purely sparse.
        self.blocks.resize(last_index, BlockRef::ZERO);
        Ok(())
    }

    fn trim(&mut self, from: usize, to: usize) -> Result<()> {
        if from >= self.blocks.len() {
            return Ok(());
        }
        let to = to.min(self.blocks.len());
        for block_ref in &mut self.blocks[from..to] {
            *block_ref = BlockRef::ZERO;
        }
        Ok(())
    }

    fn get_all_block_refs(&self) -> Vec<BlockRef> {
        self.blocks.clone()
    }

    fn get_live_inodes(&self) -> InodeBitmap {
        let mut live = InodeBitmap::new();
        for block_ref in &self.blocks {
            if block_ref.is_zero() {
                continue;
            }
            live.insert(block_ref.inode.0 as u32);
        }
        live
    }

    fn get_sub_blockset(&self) -> Option<&dyn Blockset> {
        None
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.blocks.len() * BLOCK_REF_BYTE_SIZE];
        for (i, block_ref) in self.blocks.iter().enumerate() {
            block_ref
                .to_bytes_into(&mut buf[i * BLOCK_REF_BYTE_SIZE..(i + 1) * BLOCK_REF_BYTE_SIZE]);
        }
        Ok(buf)
    }

    fn unmarshal(&mut self, data: &[u8]) -> Result<()> {
        // A trailing partial entry is dropped rather than rejected; callers
        // wanting the checked behavior use `unmarshal_strict`.
        let count = data.len() / BLOCK_REF_BYTE_SIZE;
        let mut blocks = Vec::with_capacity(count);
        for i in 0..count {
            blocks.push(BlockRef::from_bytes(array_ref![
                data,
                i * BLOCK_REF_BYTE_SIZE,
                BLOCK_REF_BYTE_SIZE
            ]));
        }
        // Restore the allocation counter past every decoded index so later
        // allocations stay unique within this blockset.
        let highest = blocks.iter().map(|r| r.index.0).max().unwrap_or(0);
        self.ids.store(highest, Ordering::SeqCst);
        self.blocks = blocks;
        Ok(())
    }
}

impl fmt::Display for BaseBlockset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for block_ref in &self.blocks {
            writeln!(f, "{}", block_ref)?;
        }
        write!(f, "]")
    }
}
