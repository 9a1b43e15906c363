//! Key encoding for claim tables.
//!
//! Keys are designed so that byte order equals logical order:
//! - Scan all lands in id order: iterate `Lands`
//! - Scan all children of one parent: prefix = parent id
//! - Scan all cells of one dimension: prefix = dimension name ++ `0x00`
//!
//! # Key Formats
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  RowKey (8 bytes)                                          │
//! │    id: u64 BE                                              │
//! ├────────────────────────────────────────────────────────────┤
//! │  ChildKey (16 bytes)                                       │
//! │    parent: u64 BE, child: u64 BE                           │
//! ├────────────────────────────────────────────────────────────┤
//! │  CellKey (len(dimension) + 9 bytes)                        │
//! │    dimension: utf-8, 0x00, cx: i32 flipped BE, cz: ditto   │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Flipping the sign bit of a two's-complement integer before writing it
//! big-endian makes negative coordinates sort before positive ones.

use bytemuck::{Pod, Zeroable};
use claim_spatial::ChunkKey;

const SIGN: u32 = 0x8000_0000;

/// Primary key of a land or sub-land row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct RowKey([u8; 8]);

impl RowKey {
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id.to_be_bytes())
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != std::mem::size_of::<Self>() {
            return None;
        }
        Some(*bytemuck::from_bytes(bytes))
    }
}

/// Secondary key linking a parent row to one of its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct ChildKey {
    parent: [u8; 8],
    child: [u8; 8],
}

impl ChildKey {
    #[inline]
    #[must_use]
    pub const fn new(parent: u64, child: u64) -> Self {
        Self {
            parent: parent.to_be_bytes(),
            child: child.to_be_bytes(),
        }
    }

    #[inline]
    #[must_use]
    pub const fn parent(&self) -> u64 {
        u64::from_be_bytes(self.parent)
    }

    #[inline]
    #[must_use]
    pub const fn child(&self) -> u64 {
        u64::from_be_bytes(self.child)
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != std::mem::size_of::<Self>() {
            return None;
        }
        Some(*bytemuck::from_bytes(bytes))
    }

    /// Prefix matching every child of `parent`.
    #[inline]
    #[must_use]
    pub const fn parent_prefix(parent: u64) -> [u8; 8] {
        parent.to_be_bytes()
    }
}

/// Fixed-size tail of a cell key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
struct CellTail {
    separator: u8,
    x: [u8; 4],
    z: [u8; 4],
}

impl CellTail {
    const fn new(chunk: ChunkKey) -> Self {
        Self {
            separator: 0,
            x: flip(chunk.x),
            z: flip(chunk.z),
        }
    }

    const fn chunk(&self) -> ChunkKey {
        ChunkKey::new(unflip(self.x), unflip(self.z))
    }
}

const fn flip(v: i32) -> [u8; 4] {
    ((v as u32) ^ SIGN).to_be_bytes()
}

const fn unflip(bytes: [u8; 4]) -> i32 {
    (u32::from_be_bytes(bytes) ^ SIGN) as i32
}

/// Key of one chunk cell in one dimension.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub dimension: String,
    pub chunk: ChunkKey,
}

impl CellKey {
    const TAIL: usize = std::mem::size_of::<CellTail>();

    #[must_use]
    pub fn new(dimension: impl Into<String>, chunk: ChunkKey) -> Self {
        Self {
            dimension: dimension.into(),
            chunk,
        }
    }

    /// Encode `(dimension, chunk)` without allocating a `CellKey` first.
    #[must_use]
    pub fn encode(dimension: &str, chunk: ChunkKey) -> Vec<u8> {
        let mut out = Vec::with_capacity(dimension.len() + Self::TAIL);
        out.extend_from_slice(dimension.as_bytes());
        out.extend_from_slice(bytemuck::bytes_of(&CellTail::new(chunk)));
        out
    }

    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        Self::encode(&self.dimension, self.chunk)
    }

    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let split = bytes.len().checked_sub(Self::TAIL)?;
        let (name, tail) = bytes.split_at(split);
        let tail: CellTail = bytemuck::pod_read_unaligned(tail);
        if tail.separator != 0 {
            return None;
        }
        let dimension = std::str::from_utf8(name).ok()?.to_owned();
        Some(Self {
            dimension,
            chunk: tail.chunk(),
        })
    }

    /// Prefix matching every cell of `dimension`.
    #[must_use]
    pub fn dimension_prefix(dimension: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(dimension.len() + 1);
        out.extend_from_slice(dimension.as_bytes());
        out.push(0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_key_roundtrip() {
        let key = RowKey::new(0x0102_0304_0506_0708);
        assert_eq!(key.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(RowKey::from_bytes(key.as_bytes()), Some(key));
        assert_eq!(RowKey::from_bytes(&[1, 2, 3]), None);
    }

    #[test]
    fn test_row_key_ordering() {
        // Byte order must match numeric order for sorted scans
        let ids = [1u64, 2, 255, 256, 70_000];
        for pair in ids.windows(2) {
            assert!(RowKey::new(pair[0]).as_bytes() < RowKey::new(pair[1]).as_bytes());
        }
    }

    #[test]
    fn test_child_key_prefix() {
        let key = ChildKey::new(7, 42);
        assert!(key.as_bytes().starts_with(&ChildKey::parent_prefix(7)));
        assert!(!key.as_bytes().starts_with(&ChildKey::parent_prefix(8)));

        let recovered = ChildKey::from_bytes(key.as_bytes()).unwrap();
        assert_eq!(recovered.parent(), 7);
        assert_eq!(recovered.child(), 42);
    }

    #[test]
    fn test_cell_key_roundtrip() {
        for chunk in [
            ChunkKey::new(0, 0),
            ChunkKey::new(-1, 5),
            ChunkKey::new(i32::MIN, i32::MAX),
        ] {
            let key = CellKey::new("minecraft:overworld", chunk);
            let bytes = key.to_bytes();
            assert_eq!(bytes.len(), "minecraft:overworld".len() + 9);
            assert_eq!(CellKey::from_bytes(&bytes), Some(key));
        }
    }

    #[test]
    fn test_cell_key_ordering() {
        // Negative chunks sort before positive ones within a dimension
        let neg = CellKey::encode("nether", ChunkKey::new(-3, 0));
        let zero = CellKey::encode("nether", ChunkKey::new(0, 0));
        let pos = CellKey::encode("nether", ChunkKey::new(2, 0));
        assert!(neg < zero);
        assert!(zero < pos);
    }

    #[test]
    fn test_dimension_prefix_is_exact() {
        // "end" must not match cells of "end_cities"
        let prefix = CellKey::dimension_prefix("end");
        assert!(CellKey::encode("end", ChunkKey::new(1, 1)).starts_with(&prefix));
        assert!(!CellKey::encode("end_cities", ChunkKey::new(1, 1)).starts_with(&prefix));
    }
}
