//! Chunk index: which lands touch which 16×16 cell.
//!
//! One logical table keyed by `(dimension, chunk x, chunk z)`; each row holds
//! the ordered ids of every land whose footprint intersects the cell. Cells
//! never exist empty.
//!
//! The index is a cache derived from the land table. Writes are one statement
//! per cell with no rollback, so a failure halfway through a registration
//! leaves some cells updated and others not. Readers must treat the ids they
//! get back as candidates and re-check each land's real box; the repair path
//! is [`ChunkIndex::rebuild`] (via [`crate::ReindexService`]).

use std::collections::BTreeSet;
use std::fmt;

use claim_spatial::{Aabb, ChunkKey};
use claim_storage::{BackendExt, CellKey, Table};
use hashbrown::HashSet;
use smallvec::SmallVec;
use thiserror::Error;
use tracing::{debug, trace};

use crate::error::LogStorage;
use crate::{ClaimError, ClaimResult, Land, LandId, SharedBackend};

/// Ids stored in one cell. Most cells hold a single land.
pub type CellIds = SmallVec<[LandId; 4]>;

/// Counts from a completed rebuild.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    /// Distinct dimensions that received cells.
    pub dimensions: usize,
    /// Lands registered.
    pub lands: usize,
}

/// A rebuild that stopped early. Counts cover the work done before the failure.
#[derive(Debug, Error)]
#[error("rebuild stopped after {lands} lands in {dimensions} dimensions: {source}")]
pub struct RebuildFailure {
    pub dimensions: usize,
    pub lands: usize,
    #[source]
    pub source: ClaimError,
}

/// Log context for one cell access.
struct CellSubject<'a> {
    land: Option<LandId>,
    chunk: ChunkKey,
    dimension: &'a str,
}

impl fmt::Display for CellSubject<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(land) = self.land {
            write!(f, "land {land} ")?;
        }
        write!(f, "cell {} in {}", self.chunk, self.dimension)
    }
}

/// Sparse per-dimension chunk → land id index.
#[derive(Clone)]
pub struct ChunkIndex {
    backend: SharedBackend,
}

impl ChunkIndex {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Record that `dimension` has an index. Idempotent.
    ///
    /// Names must be non-empty and free of NUL, the separator between name
    /// and chunk in cell keys.
    pub fn ensure_dimension(&self, dimension: &str) -> ClaimResult<()> {
        if dimension.is_empty() || dimension.contains('\0') {
            return Err(ClaimError::InvalidDimension(dimension.to_owned()));
        }
        let key = dimension.as_bytes();
        let subject = format!("dimension {dimension}");
        if !self
            .backend
            .contains(Table::Dimensions, key)
            .log_storage("ensure_dimension", &subject)?
        {
            self.backend
                .put(Table::Dimensions, key, &[])
                .log_storage("ensure_dimension", &subject)?;
            debug!("Created chunk index for dimension {dimension}");
        }
        Ok(())
    }

    /// Dimensions that have an index, in name order.
    pub fn dimensions(&self) -> ClaimResult<Vec<String>> {
        let rows = self
            .backend
            .scan(Table::Dimensions)
            .log_storage("dimensions", &"dimension table")?;
        Ok(rows
            .into_iter()
            .filter_map(|(key, _)| String::from_utf8(key).ok())
            .collect())
    }

    fn read_cell(&self, key: &[u8], op: &'static str, subject: &CellSubject<'_>) -> ClaimResult<CellIds> {
        Ok(self
            .backend
            .get_as::<CellIds>(Table::ChunkCells, key)
            .log_storage(op, subject)?
            .unwrap_or_default())
    }

    /// Append `id` to every cell under the footprint of `bounds`, creating cells as needed.
    ///
    /// Not idempotent: call exactly once per registration. On failure, cells
    /// written before the failing one keep the id.
    pub fn register_footprint(&self, id: LandId, dimension: &str, bounds: &Aabb) -> ClaimResult<usize> {
        let mut touched = 0;
        for chunk in bounds.covered_cells() {
            let key = CellKey::encode(dimension, chunk);
            let subject = CellSubject {
                land: Some(id),
                chunk,
                dimension,
            };
            let mut ids = self.read_cell(&key, "register_footprint", &subject)?;
            ids.push(id);
            self.backend
                .put_as(Table::ChunkCells, &key, &ids)
                .log_storage("register_footprint", &subject)?;
            touched += 1;
        }
        trace!("Registered land {id} in {touched} cells of {dimension}");
        Ok(touched)
    }

    /// Remove one occurrence of `id` from every cell under `bounds`, deleting cells left empty.
    ///
    /// Cells that do not hold the id are skipped. On failure, cells handled
    /// before the failing one stay updated.
    pub fn unregister_footprint(&self, id: LandId, dimension: &str, bounds: &Aabb) -> ClaimResult<usize> {
        let mut touched = 0;
        for chunk in bounds.covered_cells() {
            let key = CellKey::encode(dimension, chunk);
            let subject = CellSubject {
                land: Some(id),
                chunk,
                dimension,
            };
            let mut ids = self.read_cell(&key, "unregister_footprint", &subject)?;
            let Some(pos) = ids.iter().position(|&other| other == id) else {
                continue;
            };
            ids.remove(pos);
            if ids.is_empty() {
                self.backend
                    .delete(Table::ChunkCells, &key)
                    .log_storage("unregister_footprint", &subject)?;
            } else {
                self.backend
                    .put_as(Table::ChunkCells, &key, &ids)
                    .log_storage("unregister_footprint", &subject)?;
            }
            touched += 1;
        }
        trace!("Unregistered land {id} from {touched} cells of {dimension}");
        Ok(touched)
    }

    /// Ids stored in the cell containing column `(x, z)`.
    pub fn candidates_at(&self, dimension: &str, x: i32, z: i32) -> ClaimResult<CellIds> {
        self.cell(dimension, ChunkKey::from_block(x, z))
    }

    /// Ids stored in one cell, in insertion order.
    pub fn cell(&self, dimension: &str, chunk: ChunkKey) -> ClaimResult<CellIds> {
        let key = CellKey::encode(dimension, chunk);
        let subject = CellSubject {
            land: None,
            chunk,
            dimension,
        };
        self.read_cell(&key, "cell", &subject)
    }

    /// Union of ids across every cell under `bounds`, ascending and deduplicated.
    ///
    /// A superset of the lands actually intersecting `bounds`; never authoritative alone.
    pub fn candidates_near(&self, dimension: &str, bounds: &Aabb) -> ClaimResult<Vec<LandId>> {
        let mut found = BTreeSet::new();
        for chunk in bounds.covered_cells() {
            found.extend(self.cell(dimension, chunk)?);
        }
        Ok(found.into_iter().collect())
    }

    /// Every cell of `dimension`, in chunk order.
    pub fn cells(&self, dimension: &str) -> ClaimResult<Vec<(ChunkKey, CellIds)>> {
        let rows = self
            .backend
            .scan_as::<CellIds>(Table::ChunkCells, &CellKey::dimension_prefix(dimension))
            .log_storage("cells", &format_args!("dimension {dimension}"))?;
        Ok(rows
            .into_iter()
            .filter_map(|(key, ids)| CellKey::from_bytes(&key).map(|key| (key.chunk, ids)))
            .collect())
    }

    /// Every cell of every dimension, in key order.
    pub fn snapshot(&self) -> ClaimResult<Vec<(CellKey, CellIds)>> {
        let rows = self
            .backend
            .scan_as::<CellIds>(Table::ChunkCells, &[])
            .log_storage("snapshot", &"chunk index")?;
        Ok(rows
            .into_iter()
            .filter_map(|(key, ids)| CellKey::from_bytes(&key).map(|key| (key, ids)))
            .collect())
    }

    /// Drop every cell and dimension marker.
    pub fn clear(&self) -> ClaimResult<()> {
        self.backend
            .clear(Table::ChunkCells)
            .log_storage("clear", &"chunk cells")?;
        self.backend
            .clear(Table::Dimensions)
            .log_storage("clear", &"dimension table")?;
        Ok(())
    }

    /// Clear the index and register every land in `lands` once.
    ///
    /// Not transactional. A failure leaves a partial index; rerunning repairs it.
    pub fn rebuild<'a>(
        &self,
        lands: impl IntoIterator<Item = &'a Land>,
    ) -> Result<RebuildSummary, RebuildFailure> {
        let mut dimensions: HashSet<&str> = HashSet::new();
        let mut summary = RebuildSummary::default();
        let fail = |summary: RebuildSummary, source| RebuildFailure {
            dimensions: summary.dimensions,
            lands: summary.lands,
            source,
        };

        self.clear().map_err(|e| fail(summary, e))?;

        for land in lands {
            if dimensions.insert(land.dimension.as_str()) {
                self.ensure_dimension(&land.dimension)
                    .map_err(|e| fail(summary, e))?;
                summary.dimensions += 1;
            }
            self.register_footprint(land.id, &land.dimension, &land.bounds)
                .map_err(|e| fail(summary, e))?;
            summary.lands += 1;
        }

        debug!(
            "Rebuilt chunk index: {} lands across {} dimensions",
            summary.lands, summary.dimensions
        );
        Ok(summary)
    }
}
