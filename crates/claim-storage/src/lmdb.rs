//! LMDB backend.

use std::path::Path;

use heed::{Database, Env, EnvOpenOptions, types::Bytes};

use crate::{Backend, Row, StorageResult, Table};

/// Persistent backend with one LMDB named database per [`Table`].
pub struct LmdbBackend {
    env: Env,
    dbs: Vec<Database<Bytes, Bytes>>,
}

impl LmdbBackend {
    /// Open or create the store at the given directory.
    ///
    /// # Errors
    /// Returns an error if the directory or any table cannot be created.
    ///
    /// # Safety
    /// Uses unsafe to call heed's open method which requires ensuring
    /// the environment is not opened multiple times with different options.
    #[allow(unsafe_code)]
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        // SAFETY: each data directory is opened once per process
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(1024 * 1024 * 1024) // 1GB max
                .max_dbs(Table::COUNT as u32)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let mut dbs = Vec::with_capacity(Table::COUNT);
        for table in Table::ALL {
            dbs.push(env.create_database(&mut wtxn, Some(table.name()))?);
        }
        wtxn.commit()?;

        tracing::debug!("Opened claim store at {}", path.display());
        Ok(Self { env, dbs })
    }

    fn db(&self, table: Table) -> &Database<Bytes, Bytes> {
        &self.dbs[table.index()]
    }
}

impl Backend for LmdbBackend {
    fn get(&self, table: Table, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let rtxn = self.env.read_txn()?;
        let value = self.db(table).get(&rtxn, key)?.map(<[u8]>::to_vec);
        Ok(value)
    }

    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let mut wtxn = self.env.write_txn()?;
        self.db(table).put(&mut wtxn, key, value)?;
        wtxn.commit()?;
        Ok(())
    }

    fn delete(&self, table: Table, key: &[u8]) -> StorageResult<bool> {
        let mut wtxn = self.env.write_txn()?;
        let deleted = self.db(table).delete(&mut wtxn, key)?;
        wtxn.commit()?;
        Ok(deleted)
    }

    fn scan_prefix(&self, table: Table, prefix: &[u8]) -> StorageResult<Vec<Row>> {
        let rtxn = self.env.read_txn()?;
        let db = self.db(table);
        let mut rows = Vec::new();
        if prefix.is_empty() {
            for entry in db.iter(&rtxn)? {
                let (key, value) = entry?;
                rows.push((key.to_vec(), value.to_vec()));
            }
        } else {
            for entry in db.prefix_iter(&rtxn, prefix)? {
                let (key, value) = entry?;
                rows.push((key.to_vec(), value.to_vec()));
            }
        }
        Ok(rows)
    }

    fn clear(&self, table: Table) -> StorageResult<()> {
        let mut wtxn = self.env.write_txn()?;
        self.db(table).clear(&mut wtxn)?;
        wtxn.commit()?;
        Ok(())
    }

    fn len(&self, table: Table) -> StorageResult<u64> {
        let rtxn = self.env.read_txn()?;
        Ok(self.db(table).len(&rtxn)?)
    }

    fn next_id(&self, table: Table) -> StorageResult<u64> {
        let key = table.sequence_key();
        let meta = self.db(Table::Meta);

        let mut wtxn = self.env.write_txn()?;
        let current = meta
            .get(&wtxn, &key)?
            .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
            .map_or(0, u64::from_be_bytes);
        let next = current + 1;
        meta.put(&mut wtxn, &key, &next.to_be_bytes())?;
        wtxn.commit()?;

        Ok(next)
    }
}
