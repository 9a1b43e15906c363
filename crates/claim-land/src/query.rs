//! Point lookup and overlap checks.
//!
//! Both go through the chunk index for candidates, then re-read each
//! candidate's row and test its real box. Stale or missing index entries
//! therefore cost at most a missed or extra candidate read, never a wrong
//! answer about a land that is actually there and indexed.

use std::cmp::Reverse;

use claim_spatial::{Aabb, BlockPos};
use tracing::trace;

use crate::{
    ChunkIndex, ClaimError, ClaimResult, Land, LandFlags, LandId, LandStore, SubLand, SubLandId,
    SubLandStore,
};

/// Ordering key for lands covering the same point: private beats public,
/// then the lower id wins.
fn priority(land: &Land) -> (bool, Reverse<LandId>) {
    (!land.is_public(), Reverse(land.id))
}

#[derive(Clone)]
pub struct SpatialQueryEngine {
    lands: LandStore,
    sub_lands: SubLandStore,
}

impl SpatialQueryEngine {
    pub fn new(lands: LandStore, sub_lands: SubLandStore) -> Self {
        Self { lands, sub_lands }
    }

    pub fn lands(&self) -> &LandStore {
        &self.lands
    }

    pub fn sub_lands(&self) -> &SubLandStore {
        &self.sub_lands
    }

    fn index(&self) -> &ChunkIndex {
        self.lands.index()
    }

    /// Id of the land covering `(x, z)`, additionally requiring `y` in range when given.
    pub fn land_at(&self, dimension: &str, x: i32, z: i32, y: Option<i32>) -> ClaimResult<Option<LandId>> {
        Ok(self.resolve_land(dimension, x, z, y)?.map(|land| land.id))
    }

    /// Like [`Self::land_at`], returning the freshly read row.
    ///
    /// When several lands cover the point, a private land outranks any public
    /// one and ties go to the lowest id.
    pub fn resolve_land(&self, dimension: &str, x: i32, z: i32, y: Option<i32>) -> ClaimResult<Option<Land>> {
        let candidates = self.index().candidates_at(dimension, x, z)?;
        let mut best: Option<Land> = None;

        for id in candidates {
            let Some(land) = self.lands.find(id)? else {
                trace!("Chunk index points at missing land {id}");
                continue;
            };
            if land.dimension != dimension || !land.covers(x, z, y) {
                continue;
            }
            if best.as_ref().is_none_or(|cur| priority(&land) > priority(cur)) {
                best = Some(land);
            }
        }
        Ok(best)
    }

    /// Sub-land of `land` covering `pos`, if any.
    pub fn sub_land_at(&self, land: &Land, pos: BlockPos) -> ClaimResult<Option<SubLand>> {
        self.sub_lands.at(land.id, pos)
    }

    /// Check that `bounds` keeps at least `min_buffer` blocks of horizontal
    /// clearance from every existing land whose height range it shares.
    ///
    /// Public lands flagged [`LandFlags::NESTED_CLAIMS_ON_PUBLIC`] never
    /// conflict. On rejection every conflicting id is returned.
    pub fn check_availability(&self, dimension: &str, bounds: &Aabb, min_buffer: i32) -> ClaimResult<()> {
        let expanded = bounds.expand_xz(min_buffer.max(0));
        let mut conflicts = Vec::new();

        for id in self.index().candidates_near(dimension, &expanded)? {
            let Some(land) = self.lands.find(id)? else {
                continue;
            };
            if land.dimension != dimension {
                continue;
            }
            if land.is_public() && land.flags.contains(LandFlags::NESTED_CLAIMS_ON_PUBLIC) {
                continue;
            }
            if expanded.intersects_3d(&land.bounds) {
                conflicts.push(id);
            }
        }

        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(ClaimError::OverlapConflict(conflicts))
        }
    }

    /// Check that `bounds` fits inside `parent` and overlaps none of its
    /// sub-lands other than `exclude` (the sub-land being resized, if any).
    pub fn check_sub_availability(
        &self,
        parent: LandId,
        bounds: &Aabb,
        exclude: Option<SubLandId>,
    ) -> ClaimResult<()> {
        let land = self.lands.get(parent)?;
        if !land.bounds.contains(bounds) {
            return Err(ClaimError::ContainmentViolation {
                parent,
                bounds: *bounds,
            });
        }

        let conflicts: Vec<SubLandId> = self
            .sub_lands
            .by_parent(parent)?
            .into_iter()
            .filter(|sub| Some(sub.id) != exclude && sub.bounds.intersects_3d(bounds))
            .map(|sub| sub.id)
            .collect();

        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(ClaimError::SubLandOverlap(conflicts))
        }
    }
}
