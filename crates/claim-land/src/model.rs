//! Claim records.

use std::fmt;

use bitflags::bitflags;
use claim_spatial::{Aabb, BlockPos};
use serde::{Deserialize, Serialize};

/// Land id. Allocated monotonically, never reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandId(pub u64);

/// Sub-land id. Separate sequence from [`LandId`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubLandId(pub u64);

impl fmt::Display for LandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SubLandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable player identifier.
///
/// The reserved value `"0"` marks server-owned public land.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub const PUBLIC: &'static str = "0";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn public() -> Self {
        Self(Self::PUBLIC.to_owned())
    }

    pub fn is_public(&self) -> bool {
        self.0 == Self::PUBLIC
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

bitflags! {
    /// Per-land policy switches.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct LandFlags: u8 {
        /// Explosions may destroy blocks inside the land.
        const EXPLOSION = 1 << 0;
        /// Anyone may interact with blocks (doors, chests, buttons).
        const PUBLIC_BLOCK_INTERACT = 1 << 1;
        /// Anyone may interact with creatures.
        const PUBLIC_ACTOR_INTERACT = 1 << 2;
        /// Anyone may damage creatures.
        const PUBLIC_ACTOR_DAMAGE = 1 << 3;
        /// Private claims may be created inside this land while it is public.
        const NESTED_CLAIMS_ON_PUBLIC = 1 << 4;
    }
}

impl LandFlags {
    /// Switched on whenever a land is made public.
    pub const PUBLIC_INTERACTIONS: Self = Self::PUBLIC_BLOCK_INTERACT
        .union(Self::PUBLIC_ACTOR_INTERACT)
        .union(Self::PUBLIC_ACTOR_DAMAGE);
}

/// Teleport target of a land.
#[derive(Copy, Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Anchor {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Anchor standing on top of the box, at the center of its footprint.
    pub fn center_of(bounds: &Aabb) -> Self {
        let (min, max) = (bounds.min(), bounds.max());
        Self {
            x: (f64::from(min.x) + f64::from(max.x)) / 2.0,
            y: f64::from(max.y),
            z: (f64::from(min.z) + f64::from(max.z)) / 2.0,
        }
    }

    /// Block column the anchor stands in.
    pub fn column(&self) -> (i32, i32) {
        (self.x.floor() as i32, self.z.floor() as i32)
    }

    /// Whether the anchor's column lies in the box footprint. Height is free.
    pub fn within(&self, bounds: &Aabb) -> bool {
        let (x, z) = self.column();
        bounds.contains_column(x, z)
    }
}

/// A top-level claim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Land {
    pub id: LandId,
    pub owner: PlayerId,
    pub name: String,
    pub dimension: String,
    pub bounds: Aabb,
    pub anchor: Anchor,
    /// Insertion-ordered, no duplicates.
    pub shared: Vec<PlayerId>,
    pub flags: LandFlags,
    /// What the owner paid; basis for refunds. Always 0 on public land.
    pub paid: u64,
}

impl Land {
    pub fn is_public(&self) -> bool {
        self.owner.is_public()
    }

    /// Owner or shared user.
    pub fn is_member(&self, player: &PlayerId) -> bool {
        self.owner == *player || self.shared.contains(player)
    }

    /// Point test; `y == None` checks the footprint only.
    pub fn covers(&self, x: i32, z: i32, y: Option<i32>) -> bool {
        self.bounds.contains_column(x, z) && y.is_none_or(|y| self.bounds.contains_y(y))
    }
}

/// Input for [`crate::LandStore::create`].
#[derive(Clone, Debug, PartialEq)]
pub struct NewLand {
    pub owner: PlayerId,
    pub name: String,
    pub dimension: String,
    pub bounds: Aabb,
    pub anchor: Anchor,
    pub paid: u64,
}

/// A claim nested in exactly one parent land.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubLand {
    pub id: SubLandId,
    pub parent: LandId,
    pub owner: PlayerId,
    pub name: String,
    pub bounds: Aabb,
    pub shared: Vec<PlayerId>,
}

impl SubLand {
    pub fn is_member(&self, player: &PlayerId) -> bool {
        self.owner == *player || self.shared.contains(player)
    }

    pub fn covers(&self, pos: BlockPos) -> bool {
        self.bounds.contains_point(pos)
    }
}

/// Input for [`crate::SubLandStore::create`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSubLand {
    pub parent: LandId,
    pub owner: PlayerId,
    pub name: String,
    pub bounds: Aabb,
}

/// Add `player` to an ordered shared list. Returns false if already present.
pub(crate) fn share(list: &mut Vec<PlayerId>, player: PlayerId) -> bool {
    if list.contains(&player) {
        return false;
    }
    list.push(player);
    true
}

/// Remove `player` from an ordered shared list. Returns false if absent.
pub(crate) fn unshare(list: &mut Vec<PlayerId>, player: &PlayerId) -> bool {
    let Some(pos) = list.iter().position(|p| p == player) else {
        return false;
    };
    list.remove(pos);
    true
}
