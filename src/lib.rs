//! Strata Core - block virtualization for a distributed storage engine
//!
//! This crate provides the mapping layer between a logical byte-addressed
//! object (identified by an inode reference) and a content-addressed
//! physical block store: the blockset abstraction, its base implementation,
//! the kind registry used to rebuild layered blockset chains from persisted
//! state, and the fixed-width wire format for block reference sequences.
//!
//! The physical store itself, the metadata service that persists marshalled
//! blocksets, and replication all live behind the [`store::BlockStore`]
//! trait or outside this crate entirely.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rust_2018_idioms)]

pub mod bitmap;
pub mod blockref;
pub mod blockset;
pub mod error;
pub mod store;

// Re-export the error types
pub use error::{Error, Result};

pub use bitmap::InodeBitmap;
pub use blockref::{BlockRef, IndexId, InodeRef, BLOCK_REF_BYTE_SIZE};
pub use blockset::{
    create_blockset, create_blockset_from_layers, decode_layers, encode_layers, marshal_chain,
    register_blockset, BaseBlockset, Blockset, CreateBlocksetFn, Kind, Layer,
};
pub use store::{BlockStore, MemoryBlockStore, StoreError};

/// Re-export common types and traits
pub mod prelude {
    pub use crate::blockref::{BlockRef, InodeRef};
    pub use crate::blockset::Blockset;
    pub use crate::error::Result;
    pub use crate::store::BlockStore;
}
