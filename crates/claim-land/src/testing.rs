//! Test doubles.

use std::sync::atomic::{AtomicUsize, Ordering};

use claim_storage::{Backend, MemoryBackend, Row, StorageError, StorageResult, Table};

const NEVER: usize = usize::MAX;

/// Memory backend whose writes start failing after a set number of puts.
pub struct FlakyBackend {
    inner: MemoryBackend,
    puts_left: AtomicUsize,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self {
            inner: MemoryBackend::new(),
            puts_left: AtomicUsize::new(NEVER),
        }
    }

    /// Allow `n` more puts, then fail every put until [`Self::heal`].
    pub fn fail_puts_after(&self, n: usize) {
        self.puts_left.store(n, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.puts_left.store(NEVER, Ordering::SeqCst);
    }

    fn take_put(&self) -> StorageResult<()> {
        let left = self.puts_left.load(Ordering::SeqCst);
        if left == NEVER {
            return Ok(());
        }
        if left == 0 {
            return Err(StorageError::Io(std::io::Error::other("injected write failure")));
        }
        self.puts_left.store(left - 1, Ordering::SeqCst);
        Ok(())
    }
}

impl Backend for FlakyBackend {
    fn get(&self, table: Table, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(table, key)
    }

    fn put(&self, table: Table, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.take_put()?;
        self.inner.put(table, key, value)
    }

    fn delete(&self, table: Table, key: &[u8]) -> StorageResult<bool> {
        self.inner.delete(table, key)
    }

    fn scan_prefix(&self, table: Table, prefix: &[u8]) -> StorageResult<Vec<Row>> {
        self.inner.scan_prefix(table, prefix)
    }

    fn clear(&self, table: Table) -> StorageResult<()> {
        self.inner.clear(table)
    }

    fn len(&self, table: Table) -> StorageResult<u64> {
        self.inner.len(table)
    }

    fn next_id(&self, table: Table) -> StorageResult<u64> {
        self.inner.next_id(table)
    }
}
