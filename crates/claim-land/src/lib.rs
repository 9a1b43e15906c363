//! Land claims over a sparse, multi-dimension voxel world.
//!
//! Players claim axis-aligned boxes. This crate stores them, answers "which
//! land owns this point" fast enough to run for every entity on every poll,
//! and decides who may do what inside a land.
//!
//! # Layout
//!
//! ```text
//!   Claims ──────────────► PermissionResolver
//!     │                          │
//!     ├─► ReindexService         ▼
//!     │        │          SpatialQueryEngine
//!     │        ▼            │            │
//!     └──► LandStore ◄──────┘            └──► SubLandStore
//!              │
//!              ▼
//!          ChunkIndex        (land ids per 16×16 cell, per dimension)
//! ```
//!
//! # Consistency
//!
//! The land table is the truth; the chunk index is a cache over it. Index
//! writes are not transactional with row writes, so the index can miss or
//! keep extra ids after a failure or crash. Every lookup re-reads the rows
//! the index points at and tests their real boxes, so drift can hide a land
//! from lookups but never attribute a point to the wrong land. Run
//! [`ReindexService::rebuild_all`] to repair it; [`ReindexService::audit`]
//! reports drift without touching anything.

use std::sync::Arc;

pub mod claims;
pub mod config;
mod error;
mod index;
mod land_store;
mod model;
pub mod permission;
pub mod poller;
pub mod pricing;
mod query;
pub mod reindex;
mod sub_land_store;

#[cfg(test)]
mod testing;

pub use claims::{Claims, DeletedLand};
pub use config::{ClaimConfig, MapSettings, SettingsProvider};
pub use error::{ClaimError, ClaimResult};
pub use index::{CellIds, ChunkIndex, RebuildFailure, RebuildSummary};
pub use land_store::LandStore;
pub use model::{Anchor, Land, LandFlags, LandId, NewLand, NewSubLand, PlayerId, SubLand, SubLandId};
pub use permission::{Action, Actor, ExplosionOutcome, PermissionResolver};
pub use poller::{
    BoundaryCrossing, BoundaryPoller, ConnectionContext, EntityId, EntityPosition, PollerHandle,
    PositionSource, Presence,
};
pub use query::SpatialQueryEngine;
pub use reindex::{DriftEntry, DriftReport, PruneFailure, ReindexError, ReindexReport, ReindexService};
pub use sub_land_store::SubLandStore;

pub use claim_spatial::{Aabb, BlockPos, ChunkKey};

/// Storage shared by every store in one claim service.
pub type SharedBackend = Arc<dyn claim_storage::Backend>;
