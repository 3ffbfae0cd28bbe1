//! Crate-wide error and result types.

use std::io;

use thiserror::Error;

use crate::blockref::BLOCK_REF_BYTE_SIZE;
use crate::store::StoreError;

/// Error type for blockset operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Logical index out of range on read, or past the end on write.
    /// Never retried and never silently clamped.
    #[error("block does not exist")]
    BlockNotExist,

    /// A physical store failure, surfaced unmodified.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A persisted layer descriptor named a kind no constructor was
    /// registered for.
    #[error("no blockset registered for kind {0}")]
    UnknownKind(u32),

    /// A chain reconstruction was attempted from zero layer descriptors.
    #[error("empty blockset layer spec")]
    EmptyLayerSpec,

    /// A strict decode rejected a reference buffer with a trailing partial
    /// entry.
    #[error("block ref buffer length {0} is not a multiple of {BLOCK_REF_BYTE_SIZE}")]
    MisalignedRefBuffer(usize),

    /// I/O failure while encoding or decoding a layer descriptor list.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for blockset operations.
pub type Result<T> = std::result::Result<T, Error>;
