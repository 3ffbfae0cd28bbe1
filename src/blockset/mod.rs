//! The blockset abstraction: a composable mapping from logical block
//! indices to physical block references.
//!
//! A blockset is one layer in a singly-linked chain running from the
//! outermost wrapping variant down to the base leaf. Every layer implements
//! the same [`Blockset`] contract, so a caller at the top of a chain cannot
//! distinguish a plain base blockset from an arbitrarily deep wrapped one
//! except through [`Blockset::kind`] and [`Blockset::get_sub_blockset`].
//! Chains are persisted as an ordered list of [`Layer`] descriptors and
//! rebuilt through the kind registry.

mod base;

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use async_trait::async_trait;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::bitmap::InodeBitmap;
use crate::blockref::{BlockRef, InodeRef};
use crate::error::{Error, Result};
use crate::store::BlockStore;

pub use self::base::BaseBlockset;

/// Numeric tag identifying a blockset variant for registry dispatch and
/// persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kind(pub u32);

impl Kind {
    /// The base (leaf) variant.
    pub const BASE: Kind = Kind(0);
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One layer of a blockset's mapping from logical block index to physical
/// block reference.
#[async_trait]
pub trait Blockset: Send + Sync {
    /// Current logical block count.
    fn length(&self) -> usize;

    /// The tag this variant was registered under.
    fn kind(&self) -> Kind;

    /// Read the block at logical index `i`.
    ///
    /// An entry holding the zero sentinel reads as a freshly allocated
    /// block-sized buffer of zero bytes without touching the store.
    async fn get_block(&self, i: usize) -> Result<Vec<u8>>;

    /// Write `data` at logical index `i` on behalf of `inode`.
    ///
    /// `i` may be at most the current length: writes append or overwrite,
    /// never skip ahead.
    async fn put_block(&mut self, inode: InodeRef, i: usize, data: &[u8]) -> Result<()>;

    /// Shrink the mapping to `last_index` entries, or extend it with zero
    /// sentinels. Extension never materializes physical storage.
    fn truncate(&mut self, last_index: usize, blocksize: u64) -> Result<()>;

    /// Replace entries in `[from, to)` with the zero sentinel, logically
    /// freeing the range without shrinking the mapping.
    fn trim(&mut self, from: usize, to: usize) -> Result<()>;

    /// A defensive copy of the current mapping, for snapshotting and
    /// replication.
    fn get_all_block_refs(&self) -> Vec<BlockRef>;

    /// The set of owner-inode identifiers referenced by non-zero entries.
    fn get_live_inodes(&self) -> InodeBitmap;

    /// The next layer down the chain; `None` at the leaf.
    fn get_sub_blockset(&self) -> Option<&dyn Blockset>;

    /// Serialize this layer's state to its persisted form.
    fn marshal(&self) -> Result<Vec<u8>>;

    /// Restore this layer's state from bytes produced by
    /// [`Blockset::marshal`].
    fn unmarshal(&mut self, data: &[u8]) -> Result<()>;
}

impl fmt::Debug for dyn Blockset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blockset")
            .field("kind", &self.kind())
            .field("length", &self.length())
            .finish()
    }
}

/// Constructor signature stored in the registry: `(parameters, store,
/// child)`. The child is `None` when the layer being built is the leaf.
pub type CreateBlocksetFn =
    fn(&str, Arc<dyn BlockStore>, Option<Box<dyn Blockset>>) -> Result<Box<dyn Blockset>>;

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<Kind, CreateBlocksetFn>> = {
        let mut table = HashMap::new();
        table.insert(Kind::BASE, base::create_base_blockset as CreateBlocksetFn);
        RwLock::new(table)
    };
}

/// Register a constructor for a blockset kind.
///
/// # Panics
///
/// Panics if `kind` already has a registered constructor.
pub fn register_blockset(kind: Kind, f: CreateBlocksetFn) {
    let mut registry = REGISTRY.write();
    if registry.contains_key(&kind) {
        panic!("strata: attempted to register blockset kind {} twice", kind);
    }
    registry.insert(kind, f);
}

fn lookup_blockset(kind: Kind) -> Result<CreateBlocksetFn> {
    REGISTRY
        .read()
        .get(&kind)
        .copied()
        .ok_or(Error::UnknownKind(kind.0))
}

/// Construct a single blockset layer through the registry.
pub fn create_blockset(
    kind: Kind,
    params: &str,
    store: Arc<dyn BlockStore>,
    sub: Option<Box<dyn Blockset>>,
) -> Result<Box<dyn Blockset>> {
    lookup_blockset(kind)?(params, store, sub)
}

/// One persisted layer of a blockset chain: the variant's kind tag plus the
/// opaque bytes produced by that layer's [`Blockset::marshal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    /// Variant tag used to look up the constructor on reconstruction.
    pub kind: Kind,
    /// The layer's marshalled state.
    pub data: Vec<u8>,
}

impl Layer {
    /// Encode this descriptor: kind, payload length, payload.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.kind.0)?;
        writer.write_u32::<LittleEndian>(self.data.len() as u32)?;
        writer.write_all(&self.data)
    }

    /// Decode a descriptor written by [`Layer::write_to`].
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let kind = reader.read_u32::<LittleEndian>()?;
        let len = reader.read_u32::<LittleEndian>()? as usize;
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;
        Ok(Layer {
            kind: Kind(kind),
            data,
        })
    }
}

/// Serialize a chain description, outermost layer first.
pub fn encode_layers(layers: &[Layer]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for layer in layers {
        layer.write_to(&mut buf)?;
    }
    Ok(buf)
}

/// Decode a chain description produced by [`encode_layers`].
pub fn decode_layers(buf: &[u8]) -> Result<Vec<Layer>> {
    let mut cursor = Cursor::new(buf);
    let mut layers = Vec::new();
    while (cursor.position() as usize) < buf.len() {
        layers.push(Layer::read_from(&mut cursor)?);
    }
    Ok(layers)
}

/// Walk a chain from its outermost layer to the leaf, marshalling each
/// layer into its persisted descriptor.
pub fn marshal_chain(blockset: &dyn Blockset) -> Result<Vec<Layer>> {
    let mut layers = Vec::new();
    let mut current: Option<&dyn Blockset> = Some(blockset);
    while let Some(layer) = current {
        layers.push(Layer {
            kind: layer.kind(),
            data: layer.marshal()?,
        });
        current = layer.get_sub_blockset();
    }
    Ok(layers)
}

/// Rebuild a chain from persisted layer descriptors, outermost first.
///
/// Constructors fold from the innermost layer outward, then each layer's
/// opaque bytes are bound through its own [`Blockset::unmarshal`]. An
/// unregistered kind fails the whole reconstruction immediately.
pub fn create_blockset_from_layers(
    layers: &[Layer],
    store: Arc<dyn BlockStore>,
) -> Result<Box<dyn Blockset>> {
    let mut chain: Option<Box<dyn Blockset>> = None;
    for layer in layers.iter().rev() {
        let create = lookup_blockset(layer.kind)?;
        let mut blockset = create("", store.clone(), chain.take())?;
        blockset.unmarshal(&layer.data)?;
        chain = Some(blockset);
    }
    chain.ok_or(Error::EmptyLayerSpec)
}
