//! Entry point for command and economy callers.

use claim_spatial::Aabb;
use tracing::{info, warn};

use crate::{
    Anchor, ChunkIndex, ClaimConfig, ClaimError, ClaimResult, DriftReport, Land, LandId, LandStore,
    NewLand, NewSubLand, PermissionResolver, PlayerId, ReindexError, ReindexReport, ReindexService,
    SharedBackend, SpatialQueryEngine, SubLandId, SubLandStore, pricing,
};

/// Outcome of [`Claims::delete_land`].
#[derive(Clone, Debug, PartialEq)]
pub struct DeletedLand {
    pub land: Land,
    pub sub_lands_removed: usize,
    /// Amount owed back to the former owner.
    pub refund: u64,
}

/// Every claim service over one backend, wired with one config.
#[derive(Clone)]
pub struct Claims {
    config: ClaimConfig,
    engine: SpatialQueryEngine,
    permissions: PermissionResolver,
    reindex: ReindexService,
}

impl Claims {
    pub fn open(backend: SharedBackend, config: ClaimConfig) -> Self {
        let index = ChunkIndex::new(backend.clone());
        let lands = LandStore::new(backend.clone(), index);
        let sub_lands = SubLandStore::new(backend);
        let engine = SpatialQueryEngine::new(lands.clone(), sub_lands.clone());
        let permissions = PermissionResolver::new(engine.clone())
            .with_protected_entities(config.protected_entities.iter().cloned());
        let reindex = ReindexService::new(lands, sub_lands);
        Self {
            config,
            engine,
            permissions,
            reindex,
        }
    }

    pub fn config(&self) -> &ClaimConfig {
        &self.config
    }

    pub fn lands(&self) -> &LandStore {
        self.engine.lands()
    }

    pub fn sub_lands(&self) -> &SubLandStore {
        self.engine.sub_lands()
    }

    pub fn engine(&self) -> &SpatialQueryEngine {
        &self.engine
    }

    pub fn permissions(&self) -> &PermissionResolver {
        &self.permissions
    }

    pub fn reindex(&self) -> &ReindexService {
        &self.reindex
    }

    /// Price of claiming `bounds` at the configured rate.
    pub fn quote(&self, bounds: &Aabb) -> u64 {
        pricing::quote(bounds, self.config.land_price)
    }

    /// Reject footprints wider than the configured maximum on either axis.
    ///
    /// Keeps cell iteration bounded for every later index write and lookup.
    fn check_max_size(&self, bounds: &Aabb) -> ClaimResult<()> {
        let max = self.config.max_land_size;
        let (width_x, width_z) = (bounds.width_x(), bounds.width_z());
        if width_x > i64::from(max) || width_z > i64::from(max) {
            return Err(ClaimError::TooLarge { width_x, width_z, max });
        }
        Ok(())
    }

    /// Player purchase: size check, availability with the configured gap, then create.
    ///
    /// The anchor defaults to the top center of the box. Charging the player
    /// is up to the caller; the quoted price is recorded as paid.
    pub fn create_land(
        &self,
        owner: PlayerId,
        name: impl Into<String>,
        dimension: &str,
        bounds: Aabb,
    ) -> ClaimResult<LandId> {
        let min = self.config.min_land_size;
        let (width_x, width_z) = (bounds.width_x(), bounds.width_z());
        if width_x < i64::from(min) || width_z < i64::from(min) {
            return Err(ClaimError::TooSmall { width_x, width_z, min });
        }
        self.check_max_size(&bounds)?;

        self.check_availability(dimension, &bounds)?;

        self.lands().create(NewLand {
            owner,
            name: name.into(),
            dimension: dimension.to_owned(),
            bounds,
            anchor: Anchor::center_of(&bounds),
            paid: self.quote(&bounds),
        })
    }

    /// Admin creation of public land. Skips the size minimum and the gap, not
    /// the size maximum or overlap.
    pub fn create_public_land(&self, name: impl Into<String>, dimension: &str, bounds: Aabb) -> ClaimResult<LandId> {
        self.check_max_size(&bounds)?;
        self.engine.check_availability(dimension, &bounds, 0)?;
        let id = self.lands().create(NewLand {
            owner: PlayerId::public(),
            name: name.into(),
            dimension: dimension.to_owned(),
            bounds,
            anchor: Anchor::center_of(&bounds),
            paid: 0,
        })?;
        self.lands().set_public(id)?;
        Ok(id)
    }

    /// Delete a land and every sub-land under it.
    ///
    /// The land goes first. If removing its sub-lands then fails they are
    /// left unreachable and the next [`Self::rebuild_all`] prunes them.
    pub fn delete_land(&self, id: LandId) -> ClaimResult<DeletedLand> {
        let land = self.lands().get(id)?;
        if !self.lands().delete(id)? {
            return Err(ClaimError::LandNotFound(id));
        }

        let sub_lands_removed = match self.sub_lands().delete_by_parent(id) {
            Ok(removed) => removed,
            Err(err) => {
                warn!("Sub-lands of deleted land {id} left for pruning: {err}");
                0
            }
        };

        let refund = pricing::refund(&land, self.config.refund_coefficient);
        info!("Land {id} deleted, refund {refund} to {}", land.owner);
        Ok(DeletedLand {
            land,
            sub_lands_removed,
            refund,
        })
    }

    pub fn land_at(&self, dimension: &str, x: i32, z: i32, y: Option<i32>) -> ClaimResult<Option<LandId>> {
        self.engine.land_at(dimension, x, z, y)
    }

    /// [`SpatialQueryEngine::check_availability`] with the configured gap.
    pub fn check_availability(&self, dimension: &str, bounds: &Aabb) -> ClaimResult<()> {
        self.engine
            .check_availability(dimension, bounds, self.config.min_land_distance)
    }

    /// Create a sub-land after checking containment and sibling overlap.
    pub fn create_sub_land(&self, new: NewSubLand) -> ClaimResult<SubLandId> {
        self.engine.check_sub_availability(new.parent, &new.bounds, None)?;
        self.sub_lands().create(new)
    }

    /// Move a sub-land's box, checking it against its parent and siblings but not itself.
    pub fn resize_sub_land(&self, id: SubLandId, bounds: Aabb) -> ClaimResult<()> {
        let sub = self.sub_lands().get(id)?;
        self.engine.check_sub_availability(sub.parent, &bounds, Some(id))?;
        self.sub_lands().set_bounds(id, bounds)?;
        info!("Resized sub-land {id} to {bounds}");
        Ok(())
    }

    pub fn delete_sub_land(&self, id: SubLandId) -> ClaimResult<bool> {
        self.sub_lands().delete(id)
    }

    /// Re-derive the chunk index and prune orphaned sub-lands.
    pub fn rebuild_all(&self) -> Result<ReindexReport, ReindexError> {
        self.reindex.rebuild_all()
    }

    pub fn audit(&self) -> ClaimResult<DriftReport> {
        self.reindex.audit()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use claim_storage::MemoryBackend;

    use super::*;
    use crate::{LandFlags, MapSettings};

    fn claims(settings: MapSettings) -> Claims {
        Claims::open(Arc::new(MemoryBackend::new()), ClaimConfig::load(&settings))
    }

    #[test]
    fn test_create_land_checks_size_and_records_price() {
        let claims = claims(MapSettings::new().with("LAND_PRICE", "2"));
        let alice = PlayerId::new("alice");

        assert!(matches!(
            claims.create_land(alice.clone(), "tiny", "overworld", Aabb::new((0, 3), (0, 10), (0, 20))),
            Err(ClaimError::TooSmall { width_x: 4, width_z: 21, min: 5 })
        ));

        let id = claims
            .create_land(alice, "home", "overworld", Aabb::new((0, 9), (0, 10), (0, 9)))
            .unwrap();
        assert_eq!(claims.lands().get(id).unwrap().paid, 200);
    }

    #[test]
    fn test_oversized_claims_rejected_before_indexing() {
        let claims = claims(MapSettings::new().with("LAND_MAX_SIZE", "64"));
        let world = Aabb::new((i32::MIN, i32::MAX), (0, 10), (i32::MIN, i32::MAX));

        assert!(matches!(
            claims.create_land(PlayerId::new("a"), "", "overworld", world),
            Err(ClaimError::TooLarge { max: 64, .. })
        ));
        assert!(matches!(
            claims.create_public_land("", "overworld", Aabb::new((0, 64), (0, 10), (0, 10))),
            Err(ClaimError::TooLarge { width_x: 65, width_z: 11, max: 64 })
        ));
        assert_eq!(claims.lands().len().unwrap(), 0);
        assert!(claims.lands().index().snapshot().unwrap().is_empty());

        claims
            .create_land(PlayerId::new("a"), "", "overworld", Aabb::new((0, 63), (0, 10), (0, 63)))
            .unwrap();
    }

    #[test]
    fn test_create_land_honors_gap() {
        let claims = claims(MapSettings::new().with("MIN_LAND_DISTANCE", "5"));
        let existing = claims
            .create_land(PlayerId::new("a"), "", "overworld", Aabb::new((0, 10), (0, 100), (0, 10)))
            .unwrap();

        assert!(matches!(
            claims.create_land(PlayerId::new("b"), "", "overworld", Aabb::new((11, 15), (0, 100), (0, 10))),
            Err(ClaimError::OverlapConflict(ids)) if ids == vec![existing]
        ));
        claims
            .create_land(PlayerId::new("b"), "", "overworld", Aabb::new((16, 20), (0, 100), (0, 10)))
            .unwrap();
    }

    #[test]
    fn test_public_land_is_flagged_and_free() {
        let claims = claims(MapSettings::new());
        let id = claims
            .create_public_land("spawn", "overworld", Aabb::new((0, 2), (0, 10), (0, 2)))
            .unwrap();
        let land = claims.lands().get(id).unwrap();

        assert!(land.is_public());
        assert_eq!(land.paid, 0);
        assert!(land.flags.contains(LandFlags::PUBLIC_INTERACTIONS));
    }

    #[test]
    fn test_delete_land_cascades_and_refunds() {
        let claims = claims(MapSettings::new().with("LAND_SELL_REFUND_COEFFICIENT", "0.5"));
        let id = claims
            .create_land(PlayerId::new("a"), "", "overworld", Aabb::new((0, 9), (0, 10), (0, 9)))
            .unwrap();
        claims
            .create_sub_land(NewSubLand {
                parent: id,
                owner: PlayerId::new("b"),
                name: "shed".to_owned(),
                bounds: Aabb::new((0, 2), (0, 5), (0, 2)),
            })
            .unwrap();

        let deleted = claims.delete_land(id).unwrap();
        assert_eq!(deleted.sub_lands_removed, 1);
        assert_eq!(deleted.refund, 5_000);
        assert!(claims.sub_lands().all().unwrap().is_empty());
        assert_eq!(claims.land_at("overworld", 5, 5, None).unwrap(), None);
        assert!(matches!(claims.delete_land(id), Err(ClaimError::LandNotFound(_))));
    }

    #[test]
    fn test_resize_sub_land_excludes_itself() {
        let claims = claims(MapSettings::new());
        let parent = claims
            .create_land(PlayerId::new("a"), "", "overworld", Aabb::new((0, 20), (0, 50), (0, 20)))
            .unwrap();
        let sub = |x: (i32, i32)| NewSubLand {
            parent,
            owner: PlayerId::new("b"),
            name: String::new(),
            bounds: Aabb::new(x, (0, 10), (0, 5)),
        };
        let first = claims.create_sub_land(sub((0, 5))).unwrap();
        let second = claims.create_sub_land(sub((10, 15))).unwrap();

        claims.resize_sub_land(first, Aabb::new((0, 8), (0, 10), (0, 5))).unwrap();
        assert!(matches!(
            claims.resize_sub_land(first, Aabb::new((0, 12), (0, 10), (0, 5))),
            Err(ClaimError::SubLandOverlap(ids)) if ids == vec![second]
        ));
        assert!(matches!(
            claims.resize_sub_land(second, Aabb::new((10, 21), (0, 10), (0, 5))),
            Err(ClaimError::ContainmentViolation { .. })
        ));
    }
}
