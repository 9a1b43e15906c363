//! Authoritative land table.

use claim_storage::{BackendExt, RowKey, Table};
use tracing::{info, warn};

use crate::error::LogStorage;
use crate::model::{share, unshare};
use crate::{
    Anchor, ChunkIndex, ClaimError, ClaimResult, Land, LandFlags, LandId, NewLand, PlayerId,
    SharedBackend,
};

/// Land rows plus the chunk index kept alongside them.
///
/// The row is the source of truth. Creation persists the row first and
/// registers the footprint second; if the second step fails the land still
/// exists, just unindexed until the next reindex.
#[derive(Clone)]
pub struct LandStore {
    backend: SharedBackend,
    index: ChunkIndex,
}

impl LandStore {
    pub fn new(backend: SharedBackend, index: ChunkIndex) -> Self {
        Self { backend, index }
    }

    pub fn index(&self) -> &ChunkIndex {
        &self.index
    }

    /// Persist a new land and index its footprint.
    ///
    /// Public lands are always stored with `paid == 0`.
    pub fn create(&self, new: NewLand) -> ClaimResult<LandId> {
        if !new.anchor.within(&new.bounds) {
            return Err(ClaimError::BoundsViolation {
                x: new.anchor.x,
                z: new.anchor.z,
                bounds: new.bounds,
            });
        }

        self.index.ensure_dimension(&new.dimension)?;

        let id = LandId(
            self.backend
                .next_id(Table::Lands)
                .log_storage("create_land", &format_args!("new land in {}", new.dimension))?,
        );
        let paid = if new.owner.is_public() { 0 } else { new.paid };
        let land = Land {
            id,
            owner: new.owner,
            name: new.name,
            dimension: new.dimension,
            bounds: new.bounds,
            anchor: new.anchor,
            shared: Vec::new(),
            flags: LandFlags::empty(),
            paid,
        };
        self.write(&land, "create_land")?;
        info!(
            "Created land {id} '{}' for {} in {} at {}",
            land.name, land.owner, land.dimension, land.bounds
        );

        if self
            .index
            .register_footprint(id, &land.dimension, &land.bounds)
            .is_err()
        {
            warn!("Land {id} was stored but not fully indexed; a reindex will repair it");
        }
        Ok(id)
    }

    /// Unindex and delete a land. Returns `false` if it did not exist.
    ///
    /// If unregistering fails the row is kept, so the land stays authoritative.
    pub fn delete(&self, id: LandId) -> ClaimResult<bool> {
        let Some(land) = self.find(id)? else {
            return Ok(false);
        };
        self.index
            .unregister_footprint(id, &land.dimension, &land.bounds)?;
        let deleted = self
            .backend
            .delete(Table::Lands, RowKey::new(id.0).as_bytes())
            .log_storage("delete_land", &format_args!("land {id} in {}", land.dimension))?;
        if deleted {
            info!("Deleted land {id} '{}'", land.name);
        }
        Ok(deleted)
    }

    pub fn find(&self, id: LandId) -> ClaimResult<Option<Land>> {
        self.backend
            .get_as(Table::Lands, RowKey::new(id.0).as_bytes())
            .log_storage("find_land", &format_args!("land {id}"))
    }

    /// Like [`Self::find`], but absence is [`ClaimError::LandNotFound`].
    pub fn get(&self, id: LandId) -> ClaimResult<Land> {
        self.find(id)?.ok_or(ClaimError::LandNotFound(id))
    }

    pub fn exists(&self, id: LandId) -> ClaimResult<bool> {
        self.backend
            .contains(Table::Lands, RowKey::new(id.0).as_bytes())
            .log_storage("land_exists", &format_args!("land {id}"))
    }

    /// Every land, ascending by id.
    pub fn all(&self) -> ClaimResult<Vec<Land>> {
        let rows = self
            .backend
            .scan_as::<Land>(Table::Lands, &[])
            .log_storage("all_lands", &"land table")?;
        Ok(rows.into_iter().map(|(_, land)| land).collect())
    }

    pub fn by_owner(&self, owner: &PlayerId) -> ClaimResult<Vec<Land>> {
        let mut lands = self.all()?;
        lands.retain(|land| land.owner == *owner);
        Ok(lands)
    }

    pub fn count_by_owner(&self, owner: &PlayerId) -> ClaimResult<usize> {
        Ok(self.by_owner(owner)?.len())
    }

    pub fn len(&self) -> ClaimResult<u64> {
        self.backend
            .len(Table::Lands)
            .log_storage("count_lands", &"land table")
    }

    pub fn flags(&self, id: LandId) -> ClaimResult<LandFlags> {
        Ok(self.get(id)?.flags)
    }

    /// Turn `flag` on or off, returning the resulting flag set.
    pub fn set_flag(&self, id: LandId, flag: LandFlags, enabled: bool) -> ClaimResult<LandFlags> {
        let land = self.update(id, "set_flag", |land| {
            land.flags.set(flag, enabled);
            Ok(())
        })?;
        Ok(land.flags)
    }

    pub fn rename(&self, id: LandId, name: impl Into<String>) -> ClaimResult<()> {
        let name = name.into();
        self.update(id, "rename_land", |land| {
            land.name = name;
            Ok(())
        })?;
        Ok(())
    }

    /// Hand the land to another player. Transferring to the public sentinel
    /// goes through [`Self::set_public`].
    pub fn transfer_owner(&self, id: LandId, new_owner: PlayerId) -> ClaimResult<()> {
        if new_owner.is_public() {
            return self.set_public(id);
        }
        self.update(id, "transfer_land", |land| {
            info!("Transferring land {id} from {} to {new_owner}", land.owner);
            land.owner = new_owner;
            Ok(())
        })?;
        Ok(())
    }

    pub fn add_shared_user(&self, id: LandId, player: PlayerId) -> ClaimResult<()> {
        self.update(id, "add_shared_user", |land| {
            if share(&mut land.shared, player.clone()) {
                Ok(())
            } else {
                Err(ClaimError::AlreadyShared(player))
            }
        })?;
        Ok(())
    }

    pub fn remove_shared_user(&self, id: LandId, player: &PlayerId) -> ClaimResult<()> {
        self.update(id, "remove_shared_user", |land| {
            if unshare(&mut land.shared, player) {
                Ok(())
            } else {
                Err(ClaimError::NotShared(player.clone()))
            }
        })?;
        Ok(())
    }

    pub fn teleport_anchor(&self, id: LandId) -> ClaimResult<Anchor> {
        Ok(self.get(id)?.anchor)
    }

    /// Move the teleport anchor. Its column must stay inside the footprint.
    pub fn set_teleport_anchor(&self, id: LandId, anchor: Anchor) -> ClaimResult<()> {
        self.update(id, "set_teleport_anchor", |land| {
            if !anchor.within(&land.bounds) {
                return Err(ClaimError::BoundsViolation {
                    x: anchor.x,
                    z: anchor.z,
                    bounds: land.bounds,
                });
            }
            land.anchor = anchor;
            Ok(())
        })?;
        Ok(())
    }

    /// Hand the land to the server: public owner, nothing refundable, and the
    /// three public interaction flags on.
    pub fn set_public(&self, id: LandId) -> ClaimResult<()> {
        self.update(id, "set_public", |land| {
            land.owner = PlayerId::public();
            land.paid = 0;
            land.flags |= LandFlags::PUBLIC_INTERACTIONS;
            Ok(())
        })?;
        info!("Land {id} is now public");
        Ok(())
    }

    pub fn is_public(&self, id: LandId) -> ClaimResult<bool> {
        Ok(self.get(id)?.is_public())
    }

    /// Read, modify and write back one row. Nothing is written if `apply` fails.
    fn update(
        &self,
        id: LandId,
        op: &'static str,
        apply: impl FnOnce(&mut Land) -> ClaimResult<()>,
    ) -> ClaimResult<Land> {
        let mut land = self.get(id)?;
        apply(&mut land)?;
        self.write(&land, op)?;
        Ok(land)
    }

    fn write(&self, land: &Land, op: &'static str) -> ClaimResult<()> {
        self.backend
            .put_as(Table::Lands, RowKey::new(land.id.0).as_bytes(), land)
            .log_storage(op, &format_args!("land {} in {}", land.id, land.dimension))
    }
}
