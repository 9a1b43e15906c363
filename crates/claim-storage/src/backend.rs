//! The storage seam the claim core is written against.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{StorageResult, codec};

/// A stored `(key, value)` pair.
pub type Row = (Vec<u8>, Vec<u8>);

/// Named tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Table {
    Lands,
    SubLands,
    SubLandsByParent,
    ChunkCells,
    Dimensions,
    Meta,
}

impl Table {
    pub const ALL: [Self; 6] = [
        Self::Lands,
        Self::SubLands,
        Self::SubLandsByParent,
        Self::ChunkCells,
        Self::Dimensions,
        Self::Meta,
    ];

    pub const COUNT: usize = Self::ALL.len();

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lands => "lands",
            Self::SubLands => "sub_lands",
            Self::SubLandsByParent => "sub_lands_by_parent",
            Self::ChunkCells => "chunk_cells",
            Self::Dimensions => "dimensions",
            Self::Meta => "meta",
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub(crate) fn sequence_key(self) -> Vec<u8> {
        format!("seq.{}", self.name()).into_bytes()
    }
}

/// Byte-level row store.
///
/// Every method is one atomic statement. Nothing groups statements, so a
/// sequence of calls can be interrupted between any two of them.
pub trait Backend: Send + Sync {
    /// Read one row.
    fn get(&self, table: Table, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Insert or overwrite one row.
    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Delete one row, returning whether it existed.
    fn delete(&self, table: Table, key: &[u8]) -> StorageResult<bool>;

    /// All rows whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, table: Table, prefix: &[u8]) -> StorageResult<Vec<Row>>;

    /// Remove every row of `table`.
    fn clear(&self, table: Table) -> StorageResult<()>;

    /// Number of rows in `table`.
    fn len(&self, table: Table) -> StorageResult<u64>;

    /// Allocate the next id for `table`, starting at 1.
    ///
    /// Ids are never handed out twice, even after the row using one is deleted.
    fn next_id(&self, table: Table) -> StorageResult<u64>;

    fn contains(&self, table: Table, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(table, key)?.is_some())
    }

    /// All rows of `table`, in key order.
    fn scan(&self, table: Table) -> StorageResult<Vec<Row>> {
        self.scan_prefix(table, &[])
    }
}

/// Typed helpers over [`Backend`].
pub trait BackendExt: Backend {
    fn get_as<T: DeserializeOwned>(&self, table: Table, key: &[u8]) -> StorageResult<Option<T>> {
        self.get(table, key)?
            .map(|bytes| codec::decode(&bytes))
            .transpose()
    }

    fn put_as<T: Serialize>(&self, table: Table, key: &[u8], value: &T) -> StorageResult<()> {
        self.put(table, key, &codec::encode(value)?)
    }

    /// Decode every value of `table` under `prefix`, keeping the raw key.
    fn scan_as<T: DeserializeOwned>(
        &self,
        table: Table,
        prefix: &[u8],
    ) -> StorageResult<Vec<(Vec<u8>, T)>> {
        self.scan_prefix(table, prefix)?
            .into_iter()
            .map(|(key, value)| Ok((key, codec::decode(&value)?)))
            .collect()
    }
}

impl<B: Backend + ?Sized> BackendExt for B {}
