//! Sub-land table.
//!
//! Sub-lands are not in the chunk index. They are only ever reached through
//! their parent, and a parent rarely holds more than a handful, so lookups scan
//! the parent's children linearly via the `SubLandsByParent` link table.

use claim_spatial::{Aabb, BlockPos};
use claim_storage::{BackendExt, ChildKey, RowKey, Table};
use tracing::{info, warn};

use crate::error::LogStorage;
use crate::model::{share, unshare};
use crate::{ClaimError, ClaimResult, LandId, NewSubLand, PlayerId, SharedBackend, SubLand, SubLandId};

#[derive(Clone)]
pub struct SubLandStore {
    backend: SharedBackend,
}

impl SubLandStore {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Persist a sub-land under an existing parent.
    ///
    /// Containment and sibling overlap are not checked here; see
    /// [`crate::SpatialQueryEngine::check_sub_availability`].
    pub fn create(&self, new: NewSubLand) -> ClaimResult<SubLandId> {
        let parent = new.parent;
        if !self
            .backend
            .contains(Table::Lands, RowKey::new(parent.0).as_bytes())
            .log_storage("create_sub_land", &format_args!("parent land {parent}"))?
        {
            return Err(ClaimError::LandNotFound(parent));
        }

        let id = SubLandId(
            self.backend
                .next_id(Table::SubLands)
                .log_storage("create_sub_land", &format_args!("new sub-land in land {parent}"))?,
        );
        let sub = SubLand {
            id,
            parent,
            owner: new.owner,
            name: new.name,
            bounds: new.bounds,
            shared: Vec::new(),
        };
        self.write(&sub, "create_sub_land")?;
        self.backend
            .put(
                Table::SubLandsByParent,
                ChildKey::new(parent.0, id.0).as_bytes(),
                &[],
            )
            .log_storage("create_sub_land", &format_args!("sub-land {id} link to land {parent}"))?;

        info!("Created sub-land {id} '{}' in land {parent} at {}", sub.name, sub.bounds);
        Ok(id)
    }

    /// Delete a sub-land. Returns `false` if it did not exist.
    pub fn delete(&self, id: SubLandId) -> ClaimResult<bool> {
        let Some(sub) = self.find(id)? else {
            return Ok(false);
        };
        self.unlink(&sub)?;
        let deleted = self
            .backend
            .delete(Table::SubLands, RowKey::new(id.0).as_bytes())
            .log_storage("delete_sub_land", &format_args!("sub-land {id}"))?;
        Ok(deleted)
    }

    /// Delete every sub-land of `parent`, returning how many were removed.
    pub fn delete_by_parent(&self, parent: LandId) -> ClaimResult<usize> {
        let mut removed = 0;
        for sub in self.by_parent(parent)? {
            if self.delete(sub.id)? {
                removed += 1;
            }
        }
        if removed > 0 {
            info!("Deleted {removed} sub-lands of land {parent}");
        }
        Ok(removed)
    }

    pub fn find(&self, id: SubLandId) -> ClaimResult<Option<SubLand>> {
        self.backend
            .get_as(Table::SubLands, RowKey::new(id.0).as_bytes())
            .log_storage("find_sub_land", &format_args!("sub-land {id}"))
    }

    pub fn get(&self, id: SubLandId) -> ClaimResult<SubLand> {
        self.find(id)?.ok_or(ClaimError::SubLandNotFound(id))
    }

    /// Every sub-land, ascending by id.
    pub fn all(&self) -> ClaimResult<Vec<SubLand>> {
        let rows = self
            .backend
            .scan_as::<SubLand>(Table::SubLands, &[])
            .log_storage("all_sub_lands", &"sub-land table")?;
        Ok(rows.into_iter().map(|(_, sub)| sub).collect())
    }

    /// Children of `parent`, ascending by id.
    pub fn by_parent(&self, parent: LandId) -> ClaimResult<Vec<SubLand>> {
        let links = self
            .backend
            .scan_prefix(Table::SubLandsByParent, &ChildKey::parent_prefix(parent.0))
            .log_storage("sub_lands_by_parent", &format_args!("land {parent}"))?;

        let mut subs = Vec::with_capacity(links.len());
        for (key, _) in links {
            let Some(link) = ChildKey::from_bytes(&key) else {
                warn!("Skipping malformed sub-land link under land {parent}");
                continue;
            };
            let id = SubLandId(link.child());
            match self.find(id)? {
                Some(sub) => subs.push(sub),
                None => warn!("Sub-land link {parent} -> {id} has no row"),
            }
        }
        Ok(subs)
    }

    pub fn by_parent_and_owner(&self, parent: LandId, owner: &PlayerId) -> ClaimResult<Vec<SubLand>> {
        let mut subs = self.by_parent(parent)?;
        subs.retain(|sub| sub.owner == *owner);
        Ok(subs)
    }

    /// First child of `parent` (lowest id) whose box contains `pos`.
    pub fn at(&self, parent: LandId, pos: BlockPos) -> ClaimResult<Option<SubLand>> {
        Ok(self.by_parent(parent)?.into_iter().find(|sub| sub.covers(pos)))
    }

    pub fn rename(&self, id: SubLandId, name: impl Into<String>) -> ClaimResult<()> {
        let name = name.into();
        self.update(id, "rename_sub_land", |sub| {
            sub.name = name;
            Ok(())
        })
    }

    pub fn transfer_owner(&self, id: SubLandId, new_owner: PlayerId) -> ClaimResult<()> {
        self.update(id, "transfer_sub_land", |sub| {
            sub.owner = new_owner;
            Ok(())
        })
    }

    pub fn add_shared_user(&self, id: SubLandId, player: PlayerId) -> ClaimResult<()> {
        self.update(id, "add_sub_land_shared_user", |sub| {
            if share(&mut sub.shared, player.clone()) {
                Ok(())
            } else {
                Err(ClaimError::AlreadyShared(player))
            }
        })
    }

    pub fn remove_shared_user(&self, id: SubLandId, player: &PlayerId) -> ClaimResult<()> {
        self.update(id, "remove_sub_land_shared_user", |sub| {
            if unshare(&mut sub.shared, player) {
                Ok(())
            } else {
                Err(ClaimError::NotShared(player.clone()))
            }
        })
    }

    /// Replace the box. Callers check it first with
    /// [`crate::SpatialQueryEngine::check_sub_availability`], excluding `id`.
    pub fn set_bounds(&self, id: SubLandId, bounds: Aabb) -> ClaimResult<()> {
        self.update(id, "resize_sub_land", |sub| {
            sub.bounds = bounds;
            Ok(())
        })
    }

    fn unlink(&self, sub: &SubLand) -> ClaimResult<()> {
        self.backend
            .delete(
                Table::SubLandsByParent,
                ChildKey::new(sub.parent.0, sub.id.0).as_bytes(),
            )
            .log_storage(
                "delete_sub_land",
                &format_args!("sub-land {} link to land {}", sub.id, sub.parent),
            )?;
        Ok(())
    }

    fn update(
        &self,
        id: SubLandId,
        op: &'static str,
        apply: impl FnOnce(&mut SubLand) -> ClaimResult<()>,
    ) -> ClaimResult<()> {
        let mut sub = self.get(id)?;
        apply(&mut sub)?;
        self.write(&sub, op)
    }

    fn write(&self, sub: &SubLand, op: &'static str) -> ClaimResult<()> {
        self.backend
            .put_as(Table::SubLands, RowKey::new(sub.id.0).as_bytes(), sub)
            .log_storage(op, &format_args!("sub-land {} of land {}", sub.id, sub.parent))
    }
}
