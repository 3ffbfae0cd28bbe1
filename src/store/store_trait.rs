//! Block store trait definitions.

use std::io;

use thiserror::Error;

use crate::blockref::BlockRef;

/// Error type for block store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("no block stored at {0}")]
    BlockNotFound(BlockRef),
    #[error("invalid block size: {got} (expected {expected})")]
    InvalidBlockSize {
        /// Length of the rejected buffer.
        got: usize,
        /// The store's fixed block size.
        expected: u64,
    },
}

/// Result type for block store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// A content-addressed store of fixed-size physical blocks, keyed by
/// [`BlockRef`].
///
/// The blockset layer adds no retry logic on top of these calls; retry and
/// backoff, if any, belong to the implementation. Dropping the returned
/// future abandons the round-trip.
#[async_trait::async_trait]
pub trait BlockStore: Send + Sync + 'static {
    /// Fetch the block stored under `r`.
    async fn get_block(&self, r: BlockRef) -> Result<Vec<u8>>;

    /// Store `data` under `r`.
    async fn write_block(&self, r: BlockRef, data: &[u8]) -> Result<()>;

    /// The store's fixed block size in bytes. Read once at binding time.
    fn block_size(&self) -> u64;
}
