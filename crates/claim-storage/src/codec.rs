//! Row value serialization.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::StorageResult;

/// Serialize a row value.
pub fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

/// Deserialize a row value.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(bincode::deserialize(bytes)?)
}
