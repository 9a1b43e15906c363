//! Row storage for the land-claim subsystem.
//!
//! The claim core talks to storage through the [`Backend`] trait: a handful of
//! named tables holding opaque byte rows, with single-statement atomicity and
//! nothing more. There are no multi-statement transactions, so callers that
//! write several rows in sequence must tolerate a crash between any two.
//!
//! Two implementations are provided:
//!
//! - [`LmdbBackend`]: persistent, one LMDB named database per table (`heed`)
//! - [`MemoryBackend`]: ephemeral, `BTreeMap`s behind a lock
//!
//! # Tables
//!
//! ```text
//! ┌────────────────────┬──────────────────────────────┬──────────────────────────┐
//! │  Table             │  Key                         │  Value                   │
//! ├────────────────────┼──────────────────────────────┼──────────────────────────┤
//! │  Lands             │  land id (u64 BE)            │  bincode land row        │
//! │  SubLands          │  sub-land id (u64 BE)        │  bincode sub-land row    │
//! │  SubLandsByParent  │  parent id ++ sub-land id    │  empty                   │
//! │  ChunkCells        │  dimension ++ 0 ++ cx ++ cz  │  bincode ordered id list │
//! │  Dimensions        │  dimension name              │  empty                   │
//! │  Meta              │  "seq.{table}"               │  u64 BE                  │
//! └────────────────────┴──────────────────────────────┴──────────────────────────┘
//! ```
//!
//! Integer keys are big-endian (chunk coordinates additionally sign-flipped)
//! so that byte order equals numeric order and scans come back sorted.

mod backend;
mod codec;
mod error;
mod keys;
mod lmdb;
mod memory;

pub use backend::{Backend, BackendExt, Row, Table};
pub use codec::{decode, encode};
pub use error::{StorageError, StorageResult};
pub use keys::{CellKey, ChildKey, RowKey};
pub use lmdb::LmdbBackend;
pub use memory::MemoryBackend;
