//! Storage error types.

use thiserror::Error;

/// Storage error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// LMDB error.
    #[error("database error: {0}")]
    Database(#[from] heed::Error),

    /// Row could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored key does not have the layout its table requires.
    #[error("corrupt key in table {table}: {len} bytes")]
    CorruptKey { table: &'static str, len: usize },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
