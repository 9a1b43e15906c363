//! In-memory backend.

use std::collections::BTreeMap;

use parking_lot::{Mutex, RwLock};

use crate::{Backend, Row, StorageResult, Table};

type Rows = BTreeMap<Vec<u8>, Vec<u8>>;

/// Ephemeral backend. Same semantics as [`crate::LmdbBackend`], nothing survives a drop.
#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<[Rows; Table::COUNT]>,
    sequences: Mutex<[u64; Table::COUNT]>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    fn get(&self, table: Table, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.tables.read()[table.index()].get(key).cloned())
    }

    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.tables.write()[table.index()].insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, table: Table, key: &[u8]) -> StorageResult<bool> {
        Ok(self.tables.write()[table.index()].remove(key).is_some())
    }

    fn scan_prefix(&self, table: Table, prefix: &[u8]) -> StorageResult<Vec<Row>> {
        let tables = self.tables.read();
        let rows = tables[table.index()]
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Ok(rows)
    }

    fn clear(&self, table: Table) -> StorageResult<()> {
        self.tables.write()[table.index()].clear();
        Ok(())
    }

    fn len(&self, table: Table) -> StorageResult<u64> {
        Ok(self.tables.read()[table.index()].len() as u64)
    }

    fn next_id(&self, table: Table) -> StorageResult<u64> {
        let mut sequences = self.sequences.lock();
        sequences[table.index()] += 1;
        Ok(sequences[table.index()])
    }
}
