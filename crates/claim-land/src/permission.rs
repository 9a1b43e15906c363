//! Allow/deny decisions.
//!
//! Every decision re-reads the authoritative land row through
//! [`SpatialQueryEngine`], so a stale chunk index can only make a decision
//! late, never wrong in the actor's favor. A storage failure denies.

use claim_spatial::BlockPos;
use hashbrown::HashSet;
use tracing::warn;

use crate::{ClaimResult, Land, LandFlags, PlayerId, SpatialQueryEngine};

/// Who is acting.
#[derive(Copy, Clone, Debug)]
pub struct Actor<'a> {
    pub id: &'a PlayerId,
    pub is_admin: bool,
}

impl<'a> Actor<'a> {
    pub const fn player(id: &'a PlayerId) -> Self {
        Self { id, is_admin: false }
    }

    pub const fn admin(id: &'a PlayerId) -> Self {
        Self { id, is_admin: true }
    }
}

/// Protected action kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Place or break a block.
    EditBlock,
    /// Use a block: doors, chests, buttons.
    InteractBlock,
    /// Use a creature: ride, trade, leash.
    InteractActor,
    /// Hurt a creature.
    DamageActor,
}

impl Action {
    /// Whether the land lookup for this action honors the land's height range.
    ///
    /// Block actions match on the footprint alone; creature actions match
    /// in 3D.
    pub const fn uses_height(self) -> bool {
        matches!(self, Self::InteractActor | Self::DamageActor)
    }

    /// Flag that opens this action to everyone, if one exists.
    pub const fn public_flag(self) -> Option<LandFlags> {
        match self {
            Self::EditBlock => None,
            Self::InteractBlock => Some(LandFlags::PUBLIC_BLOCK_INTERACT),
            Self::InteractActor => Some(LandFlags::PUBLIC_ACTOR_INTERACT),
            Self::DamageActor => Some(LandFlags::PUBLIC_ACTOR_DAMAGE),
        }
    }
}

/// Result of filtering an explosion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExplosionOutcome {
    /// The blast started in a land that forbids explosions.
    Cancel,
    /// Blocks that may be destroyed.
    Proceed(Vec<BlockPos>),
}

/// Land-level rules, after any sub-land grant has been considered.
fn land_allows(land: &Land, actor: Actor<'_>, action: Action) -> bool {
    if action.public_flag().is_some_and(|flag| land.flags.contains(flag)) {
        return true;
    }
    if land.is_public() {
        actor.is_admin
    } else {
        land.is_member(actor.id)
    }
}

#[derive(Clone)]
pub struct PermissionResolver {
    engine: SpatialQueryEngine,
    protected_entities: HashSet<String>,
}

impl PermissionResolver {
    pub fn new(engine: SpatialQueryEngine) -> Self {
        Self {
            engine,
            protected_entities: HashSet::new(),
        }
    }

    /// Entity type ids that only administrators may damage on public land.
    #[must_use]
    pub fn with_protected_entities<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protected_entities = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn engine(&self) -> &SpatialQueryEngine {
        &self.engine
    }

    /// Whether `actor` may perform `action` at `pos`.
    pub fn is_allowed(&self, actor: Actor<'_>, action: Action, dimension: &str, pos: BlockPos) -> bool {
        self.decide(actor, action, dimension, pos, None)
            .unwrap_or_else(|err| {
                warn!("Denying {action:?} by {} at {pos} in {dimension}: {err}", actor.id);
                false
            })
    }

    /// [`Action::DamageActor`] against an entity of type `entity_type`.
    pub fn can_damage_actor(&self, actor: Actor<'_>, dimension: &str, pos: BlockPos, entity_type: &str) -> bool {
        self.decide(actor, Action::DamageActor, dimension, pos, Some(entity_type))
            .unwrap_or_else(|err| {
                warn!("Denying damage to {entity_type} by {} at {pos} in {dimension}: {err}", actor.id);
                false
            })
    }

    fn decide(
        &self,
        actor: Actor<'_>,
        action: Action,
        dimension: &str,
        pos: BlockPos,
        entity_type: Option<&str>,
    ) -> ClaimResult<bool> {
        let y = action.uses_height().then_some(pos.y);
        let Some(land) = self.engine.resolve_land(dimension, pos.x, pos.z, y)? else {
            return Ok(true);
        };

        if let Some(sub) = self.engine.sub_land_at(&land, pos)? {
            if sub.is_member(actor.id) {
                return Ok(true);
            }
        }

        if land.is_public()
            && !actor.is_admin
            && entity_type.is_some_and(|ty| self.protected_entities.contains(ty))
        {
            return Ok(false);
        }

        Ok(land_allows(&land, actor, action))
    }

    /// Decide what an explosion at `origin` may destroy.
    ///
    /// Lookups use footprints only. Any storage failure cancels the blast.
    pub fn explosion(&self, dimension: &str, origin: BlockPos, blocks: &[BlockPos]) -> ExplosionOutcome {
        match self.filter_explosion(dimension, origin, blocks) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!("Cancelling explosion at {origin} in {dimension}: {err}");
                ExplosionOutcome::Cancel
            }
        }
    }

    fn filter_explosion(&self, dimension: &str, origin: BlockPos, blocks: &[BlockPos]) -> ClaimResult<ExplosionOutcome> {
        let allows = |land: Option<Land>| land.is_none_or(|land| land.flags.contains(LandFlags::EXPLOSION));

        if !allows(self.engine.resolve_land(dimension, origin.x, origin.z, None)?) {
            return Ok(ExplosionOutcome::Cancel);
        }

        let mut kept = Vec::with_capacity(blocks.len());
        for &block in blocks {
            if allows(self.engine.resolve_land(dimension, block.x, block.z, None)?) {
                kept.push(block);
            }
        }
        Ok(ExplosionOutcome::Proceed(kept))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use claim_spatial::Aabb;
    use claim_storage::MemoryBackend;

    use super::*;
    use crate::{Anchor, ChunkIndex, LandId, LandStore, NewLand, NewSubLand, SharedBackend, SubLandStore};

    struct World {
        resolver: PermissionResolver,
    }

    impl World {
        fn new() -> Self {
            let backend: SharedBackend = Arc::new(MemoryBackend::new());
            let engine = SpatialQueryEngine::new(
                LandStore::new(backend.clone(), ChunkIndex::new(backend.clone())),
                SubLandStore::new(backend),
            );
            Self {
                resolver: PermissionResolver::new(engine).with_protected_entities(["villager"]),
            }
        }

        fn claim(&self, owner: &str, bounds: Aabb) -> LandId {
            self.resolver
                .engine()
                .lands()
                .create(NewLand {
                    owner: PlayerId::new(owner),
                    name: String::new(),
                    dimension: "overworld".to_owned(),
                    bounds,
                    anchor: Anchor::center_of(&bounds),
                    paid: 10,
                })
                .unwrap()
        }

        fn allowed(&self, actor: Actor<'_>, action: Action, pos: BlockPos) -> bool {
            self.resolver.is_allowed(actor, action, "overworld", pos)
        }
    }

    #[test]
    fn test_private_land_members_only() {
        let world = World::new();
        let land = world.claim("alice", Aabb::new((0, 10), (0, 100), (0, 10)));
        let alice = PlayerId::new("alice");
        let bob = PlayerId::new("bob");
        let inside = BlockPos::new(5, 50, 5);

        assert!(world.allowed(Actor::player(&alice), Action::EditBlock, inside));
        assert!(!world.allowed(Actor::player(&bob), Action::EditBlock, inside));
        assert!(!world.allowed(Actor::admin(&bob), Action::EditBlock, inside));

        world.resolver.engine().lands().add_shared_user(land, bob.clone()).unwrap();
        assert!(world.allowed(Actor::player(&bob), Action::EditBlock, inside));

        // Unclaimed ground
        assert!(world.allowed(Actor::player(&bob), Action::EditBlock, BlockPos::new(50, 50, 50)));
    }

    #[test]
    fn test_public_land_admins_unless_flagged() {
        let world = World::new();
        let land = world.claim(PlayerId::PUBLIC, Aabb::new((0, 10), (0, 100), (0, 10)));
        let bob = PlayerId::new("bob");
        let inside = BlockPos::new(5, 50, 5);

        assert!(!world.allowed(Actor::player(&bob), Action::InteractBlock, inside));
        assert!(world.allowed(Actor::admin(&bob), Action::InteractBlock, inside));

        let lands = world.resolver.engine().lands();
        lands.set_flag(land, LandFlags::PUBLIC_BLOCK_INTERACT, true).unwrap();
        assert!(world.allowed(Actor::player(&bob), Action::InteractBlock, inside));
        // Editing has no public flag
        assert!(!world.allowed(Actor::player(&bob), Action::EditBlock, inside));
    }

    #[test]
    fn test_block_checks_ignore_height() {
        let world = World::new();
        world.claim("alice", Aabb::new((0, 10), (60, 70), (0, 10)));
        let bob = PlayerId::new("bob");
        let above = BlockPos::new(5, 200, 5);

        assert!(!world.allowed(Actor::player(&bob), Action::EditBlock, above));
        assert!(world.allowed(Actor::player(&bob), Action::DamageActor, above));
        assert!(!world.allowed(Actor::player(&bob), Action::DamageActor, BlockPos::new(5, 65, 5)));
    }

    #[test]
    fn test_sub_land_only_grants() {
        let world = World::new();
        let land = world.claim("alice", Aabb::new((0, 20), (0, 100), (0, 20)));
        let engine = world.resolver.engine();
        engine
            .sub_lands()
            .create(NewSubLand {
                parent: land,
                owner: PlayerId::new("carol"),
                name: "shop".to_owned(),
                bounds: Aabb::new((0, 5), (0, 100), (0, 5)),
            })
            .unwrap();

        let alice = PlayerId::new("alice");
        let carol = PlayerId::new("carol");
        let in_sub = BlockPos::new(2, 50, 2);

        assert!(world.allowed(Actor::player(&carol), Action::EditBlock, in_sub));
        assert!(!world.allowed(Actor::player(&carol), Action::EditBlock, BlockPos::new(15, 50, 15)));
        // The land owner keeps access inside the sub-land
        assert!(world.allowed(Actor::player(&alice), Action::EditBlock, in_sub));
    }

    #[test]
    fn test_protected_entities_on_public_land() {
        let world = World::new();
        let land = world.claim(PlayerId::PUBLIC, Aabb::new((0, 10), (0, 100), (0, 10)));
        world
            .resolver
            .engine()
            .lands()
            .set_public(land)
            .unwrap();
        let bob = PlayerId::new("bob");
        let inside = BlockPos::new(5, 50, 5);

        assert!(world.resolver.can_damage_actor(Actor::player(&bob), "overworld", inside, "zombie"));
        assert!(!world.resolver.can_damage_actor(Actor::player(&bob), "overworld", inside, "villager"));
        assert!(world.resolver.can_damage_actor(Actor::admin(&bob), "overworld", inside, "villager"));
    }

    #[test]
    fn test_explosion_filtering() {
        let world = World::new();
        world.claim("alice", Aabb::new((0, 10), (0, 100), (0, 10)));
        let open = world.claim("bob", Aabb::new((20, 30), (0, 100), (0, 10)));
        world
            .resolver
            .engine()
            .lands()
            .set_flag(open, LandFlags::EXPLOSION, true)
            .unwrap();

        let blocks = [BlockPos::new(9, 60, 5), BlockPos::new(15, 60, 5), BlockPos::new(21, 60, 5)];

        assert_eq!(
            world.resolver.explosion("overworld", BlockPos::new(5, 60, 5), &blocks),
            ExplosionOutcome::Cancel
        );
        assert_eq!(
            world.resolver.explosion("overworld", BlockPos::new(15, 60, 5), &blocks),
            ExplosionOutcome::Proceed(vec![BlockPos::new(15, 60, 5), BlockPos::new(21, 60, 5)])
        );
    }
}
