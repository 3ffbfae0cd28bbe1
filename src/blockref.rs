//! Physical block identity and addressing.
//!
//! A [`BlockRef`] names one physical block in the content-addressed store:
//! the inode that owns it plus the allocation sequence number handed out by
//! that inode's blockset. The all-zero value is reserved as the sparse
//! sentinel: it never names a stored block, and a mapping entry holding it
//! reads back as a block of zero bytes.

use std::fmt;

use arrayref::array_ref;
use byteorder::{ByteOrder, LittleEndian};

/// Serialized size of a [`BlockRef`] in bytes.
pub const BLOCK_REF_BYTE_SIZE: usize = 16;

/// Identity of the logical object (file or volume) that owns a blockset.
///
/// Opaque beyond equality; the metadata service assigns these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct InodeRef(pub u64);

impl InodeRef {
    /// The zero-equivalent inode reference.
    pub const ZERO: InodeRef = InodeRef(0);

    /// Whether this is the zero-equivalent reference.
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for InodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Per-blockset allocation sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct IndexId(pub u64);

/// Identity of one physical block: owning inode plus allocation index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlockRef {
    /// Inode that owns the block.
    pub inode: InodeRef,
    /// Allocation index within the owning blockset.
    pub index: IndexId,
}

impl BlockRef {
    /// The sparse sentinel: "unallocated, reads as zero".
    pub const ZERO: BlockRef = BlockRef {
        inode: InodeRef(0),
        index: IndexId(0),
    };

    /// Create a reference from an owning inode and an allocated index.
    pub fn new(inode: InodeRef, index: IndexId) -> Self {
        Self { inode, index }
    }

    /// Whether this is the sparse sentinel. The only safe way to test it.
    pub fn is_zero(&self) -> bool {
        self.inode.0 == 0 && self.index.0 == 0
    }

    /// Encode into `buf`, which must be exactly [`BLOCK_REF_BYTE_SIZE`]
    /// bytes: little-endian inode then index.
    pub fn to_bytes_into(&self, buf: &mut [u8]) {
        debug_assert_eq!(buf.len(), BLOCK_REF_BYTE_SIZE);
        LittleEndian::write_u64(&mut buf[0..8], self.inode.0);
        LittleEndian::write_u64(&mut buf[8..16], self.index.0);
    }

    /// Decode a reference from a fixed-width entry.
    pub fn from_bytes(buf: &[u8; BLOCK_REF_BYTE_SIZE]) -> Self {
        Self {
            inode: InodeRef(LittleEndian::read_u64(array_ref![buf, 0, 8])),
            index: IndexId(LittleEndian::read_u64(array_ref![buf, 8, 8])),
        }
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:x}", self.inode, self.index.0)
    }
}
