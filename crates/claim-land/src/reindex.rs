//! Chunk index repair.

use std::collections::{BTreeMap, BTreeSet};

use claim_storage::CellKey;
use thiserror::Error;
use tracing::{info, warn};

use crate::{ClaimError, ClaimResult, LandId, LandStore, RebuildFailure, SubLandStore};

/// Counts from a completed [`ReindexService::rebuild_all`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReindexReport {
    pub dimensions: usize,
    pub lands: usize,
    /// Sub-lands deleted because their parent was gone.
    pub orphans_pruned: usize,
}

/// One disagreement between the stored index and the land table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriftEntry {
    pub cell: CellKey,
    pub land: LandId,
}

/// Result of [`ReindexService::audit`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriftReport {
    /// Land footprints with no entry in a cell they cover.
    pub missing: Vec<DriftEntry>,
    /// Cell entries for lands that are gone, do not cover the cell, or are listed twice.
    pub stale: Vec<DriftEntry>,
}

impl DriftReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.stale.is_empty()
    }
}

/// Failure of the orphan sweep that follows a successful rebuild.
#[derive(Debug, Error)]
#[error("index rebuilt ({lands} lands) but orphan pruning failed: {source}")]
pub struct PruneFailure {
    pub lands: usize,
    #[source]
    pub source: ClaimError,
}

#[derive(Debug, Error)]
pub enum ReindexError {
    #[error(transparent)]
    Rebuild(#[from] RebuildFailure),
    #[error(transparent)]
    Prune(#[from] PruneFailure),
}

#[derive(Clone)]
pub struct ReindexService {
    lands: LandStore,
    sub_lands: SubLandStore,
}

impl ReindexService {
    pub fn new(lands: LandStore, sub_lands: SubLandStore) -> Self {
        Self { lands, sub_lands }
    }

    /// Drop every cached cell and re-derive the index from the land table,
    /// then delete sub-lands whose parent no longer exists.
    ///
    /// Safe to rerun after a failure.
    pub fn rebuild_all(&self) -> Result<ReindexReport, ReindexError> {
        let lands = self.lands.all().map_err(|source| RebuildFailure {
            dimensions: 0,
            lands: 0,
            source,
        })?;

        let summary = self.lands.index().rebuild(&lands).inspect_err(|failure| {
            warn!("Chunk index rebuild failed: {failure}");
        })?;

        let orphans_pruned = self.prune_orphans().map_err(|source| PruneFailure {
            lands: summary.lands,
            source,
        })?;

        info!(
            "Reindexed {} lands across {} dimensions, pruned {orphans_pruned} orphaned sub-lands",
            summary.lands, summary.dimensions
        );
        Ok(ReindexReport {
            dimensions: summary.dimensions,
            lands: summary.lands,
            orphans_pruned,
        })
    }

    /// Delete every sub-land whose parent land is missing. Returns how many went.
    pub fn prune_orphans(&self) -> ClaimResult<usize> {
        let mut pruned = 0;
        let mut checked: BTreeMap<LandId, bool> = BTreeMap::new();

        for sub in self.sub_lands.all()? {
            let parent_exists = match checked.get(&sub.parent) {
                Some(&exists) => exists,
                None => {
                    let exists = self.lands.exists(sub.parent)?;
                    checked.insert(sub.parent, exists);
                    exists
                }
            };
            if !parent_exists && self.sub_lands.delete(sub.id)? {
                pruned += 1;
            }
        }
        Ok(pruned)
    }

    /// Compare the stored index against the one the land table implies.
    ///
    /// Read-only. A clean report means [`Self::rebuild_all`] would leave
    /// every cell's id set unchanged.
    pub fn audit(&self) -> ClaimResult<DriftReport> {
        let mut expected: BTreeMap<Vec<u8>, (CellKey, BTreeSet<LandId>)> = BTreeMap::new();
        for land in self.lands.all()? {
            for chunk in land.bounds.covered_cells() {
                let key = CellKey::new(land.dimension.as_str(), chunk);
                expected
                    .entry(key.to_bytes())
                    .or_insert_with(|| (key, BTreeSet::new()))
                    .1
                    .insert(land.id);
            }
        }

        let mut report = DriftReport::default();
        for (cell, ids) in self.lands.index().snapshot()? {
            let want = expected.remove(&cell.to_bytes()).map(|(_, ids)| ids).unwrap_or_default();
            let mut seen = BTreeSet::new();
            for &id in &ids {
                if !want.contains(&id) || !seen.insert(id) {
                    report.stale.push(DriftEntry { cell: cell.clone(), land: id });
                }
            }
            for &id in want.difference(&seen) {
                report.missing.push(DriftEntry { cell: cell.clone(), land: id });
            }
        }
        for (cell, ids) in expected.into_values() {
            report
                .missing
                .extend(ids.into_iter().map(|land| DriftEntry { cell: cell.clone(), land }));
        }

        if !report.is_clean() {
            warn!(
                "Chunk index drift: {} missing, {} stale entries",
                report.missing.len(),
                report.stale.len()
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use claim_spatial::Aabb;
    use claim_storage::MemoryBackend;

    use super::*;
    use crate::testing::FlakyBackend;
    use crate::{Anchor, ChunkIndex, NewLand, NewSubLand, PlayerId, SharedBackend, SpatialQueryEngine};

    fn stores(backend: SharedBackend) -> (LandStore, SubLandStore) {
        (
            LandStore::new(backend.clone(), ChunkIndex::new(backend.clone())),
            SubLandStore::new(backend),
        )
    }

    fn new_land(dimension: &str, bounds: Aabb) -> NewLand {
        NewLand {
            owner: PlayerId::new("alice"),
            name: String::new(),
            dimension: dimension.to_owned(),
            bounds,
            anchor: Anchor::center_of(&bounds),
            paid: 0,
        }
    }

    #[test]
    fn test_partial_registration_repaired_by_reindex() {
        let flaky = Arc::new(FlakyBackend::new());
        let backend: SharedBackend = flaky.clone();
        let (lands, sub_lands) = stores(backend);
        let engine = SpatialQueryEngine::new(lands.clone(), sub_lands.clone());
        let service = ReindexService::new(lands.clone(), sub_lands);

        // Dimension marker and land row succeed, then the second cell write fails
        let bounds = Aabb::new((0, 40), (0, 100), (0, 0));
        flaky.fail_puts_after(3);
        let id = lands.create(new_land("overworld", bounds)).unwrap();
        flaky.heal();

        assert_eq!(engine.land_at("overworld", 5, 0, None).unwrap(), Some(id));
        assert_eq!(engine.land_at("overworld", 20, 0, None).unwrap(), None);

        let drift = service.audit().unwrap();
        assert_eq!(drift.missing.len(), 2);
        assert!(drift.stale.is_empty());

        let report = service.rebuild_all().unwrap();
        assert_eq!((report.dimensions, report.lands), (1, 1));
        assert_eq!(engine.land_at("overworld", 20, 0, None).unwrap(), Some(id));
        assert_eq!(engine.land_at("overworld", 40, 0, None).unwrap(), Some(id));
        assert!(service.audit().unwrap().is_clean());
    }

    #[test]
    fn test_rebuild_failure_reports_progress() {
        let flaky = Arc::new(FlakyBackend::new());
        let backend: SharedBackend = flaky.clone();
        let (lands, sub_lands) = stores(backend);
        lands.create(new_land("overworld", Aabb::new((0, 5), (0, 10), (0, 5)))).unwrap();
        lands.create(new_land("nether", Aabb::new((0, 5), (0, 10), (0, 5)))).unwrap();
        let service = ReindexService::new(lands, sub_lands);

        // overworld marker + one cell, then the nether marker fails
        flaky.fail_puts_after(2);
        match service.rebuild_all() {
            Err(ReindexError::Rebuild(failure)) => {
                assert_eq!((failure.dimensions, failure.lands), (1, 1));
                assert!(failure.source.is_storage());
            }
            other => panic!("expected rebuild failure, got {other:?}"),
        }

        flaky.heal();
        let report = service.rebuild_all().unwrap();
        assert_eq!((report.dimensions, report.lands), (2, 2));
    }

    #[test]
    fn test_audit_finds_stale_entries() {
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        let (lands, sub_lands) = stores(backend);
        let service = ReindexService::new(lands.clone(), sub_lands);
        let bounds = Aabb::new((0, 5), (0, 10), (0, 5));

        let id = lands.create(new_land("overworld", bounds)).unwrap();
        lands.index().register_footprint(LandId(99), "overworld", &bounds).unwrap();
        lands.index().register_footprint(id, "overworld", &bounds).unwrap();

        let drift = service.audit().unwrap();
        assert!(drift.missing.is_empty());
        assert_eq!(
            drift.stale.iter().map(|entry| entry.land).collect::<Vec<_>>(),
            vec![LandId(99), id]
        );

        service.rebuild_all().unwrap();
        assert!(service.audit().unwrap().is_clean());
    }

    #[test]
    fn test_rebuild_prunes_orphans() {
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        let (lands, sub_lands) = stores(backend);
        let service = ReindexService::new(lands.clone(), sub_lands.clone());
        let bounds = Aabb::new((0, 20), (0, 50), (0, 20));

        let parent = lands.create(new_land("overworld", bounds)).unwrap();
        let keeper = lands.create(new_land("overworld", Aabb::new((100, 120), (0, 50), (0, 20)))).unwrap();
        for (land, x) in [(parent, 0), (parent, 10), (keeper, 100)] {
            sub_lands
                .create(NewSubLand {
                    parent: land,
                    owner: PlayerId::new("bob"),
                    name: String::new(),
                    bounds: Aabb::new((x, x + 5), (0, 10), (0, 5)),
                })
                .unwrap();
        }

        lands.delete(parent).unwrap();
        let report = service.rebuild_all().unwrap();
        assert_eq!(report.orphans_pruned, 2);
        assert_eq!(sub_lands.all().unwrap().len(), 1);
        assert_eq!(service.prune_orphans().unwrap(), 0);
    }
}
