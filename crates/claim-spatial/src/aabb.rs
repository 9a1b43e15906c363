//! Axis-aligned block boxes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chunk::{ChunkKey, covered_cells};

/// Integer block position.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub const fn chunk(self) -> ChunkKey {
        ChunkKey::from_block(self.x, self.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.x, self.y, self.z)
    }
}

/// Closed axis-aligned box: both `min` and `max` are inside.
///
/// Construction always orders the corners, so `min <= max` on every axis.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Aabb {
    min: BlockPos,
    max: BlockPos,
}

impl Aabb {
    /// Box spanning two opposite corners given in any order.
    pub fn from_corners(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Box from per-axis bounds; each pair may be given in any order.
    pub fn new(x: (i32, i32), y: (i32, i32), z: (i32, i32)) -> Self {
        Self::from_corners(BlockPos::new(x.0, y.0, z.0), BlockPos::new(x.1, y.1, z.1))
    }

    #[inline]
    pub const fn min(&self) -> BlockPos {
        self.min
    }

    #[inline]
    pub const fn max(&self) -> BlockPos {
        self.max
    }

    /// Whether column `(x, z)` lies inside the horizontal footprint.
    #[inline]
    pub const fn contains_column(&self, x: i32, z: i32) -> bool {
        self.min.x <= x && x <= self.max.x && self.min.z <= z && z <= self.max.z
    }

    #[inline]
    pub const fn contains_y(&self, y: i32) -> bool {
        self.min.y <= y && y <= self.max.y
    }

    #[inline]
    pub const fn contains_point(&self, pos: BlockPos) -> bool {
        self.contains_column(pos.x, pos.z) && self.contains_y(pos.y)
    }

    /// Whether `other` lies entirely within `self`. Equal boxes contain each other.
    pub const fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && other.max.x <= self.max.x
            && self.min.y <= other.min.y
            && other.max.y <= self.max.y
            && self.min.z <= other.min.z
            && other.max.z <= self.max.z
    }

    /// Footprint overlap on X and Z, ignoring height.
    pub const fn intersects_2d(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.z <= other.max.z
            && other.min.z <= self.max.z
    }

    pub const fn intersects_y(&self, other: &Self) -> bool {
        self.min.y <= other.max.y && other.min.y <= self.max.y
    }

    pub const fn intersects_3d(&self, other: &Self) -> bool {
        self.intersects_2d(other) && self.intersects_y(other)
    }

    /// Grow the box by `distance` on X and Z only; height is untouched.
    pub const fn expand_xz(&self, distance: i32) -> Self {
        Self {
            min: BlockPos::new(
                self.min.x.saturating_sub(distance),
                self.min.y,
                self.min.z.saturating_sub(distance),
            ),
            max: BlockPos::new(
                self.max.x.saturating_add(distance),
                self.max.y,
                self.max.z.saturating_add(distance),
            ),
        }
    }

    /// Number of block columns along X.
    pub const fn width_x(&self) -> i64 {
        self.max.x as i64 - self.min.x as i64 + 1
    }

    /// Number of block columns along Z.
    pub const fn width_z(&self) -> i64 {
        self.max.z as i64 - self.min.z as i64 + 1
    }

    /// Number of columns in the horizontal footprint. Saturates at `u64::MAX`.
    pub const fn footprint_area(&self) -> u64 {
        (self.width_x() as u64).saturating_mul(self.width_z() as u64)
    }

    /// Chunk cells touched by the horizontal footprint.
    pub fn covered_cells(&self) -> impl Iterator<Item = ChunkKey> + use<> {
        covered_cells(self.min.x, self.max.x, self.min.z, self.max.z)
    }
}

impl fmt::Display for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) -> ({})", self.min, self.max)
    }
}

/// Closed X/Z interval overlap.
pub const fn intersects_2d(a: &Aabb, b: &Aabb) -> bool {
    a.intersects_2d(b)
}

/// Closed X/Y/Z interval overlap.
pub const fn intersects_3d(a: &Aabb, b: &Aabb) -> bool {
    a.intersects_3d(b)
}

/// Whether `inner` lies entirely inside `outer`.
pub const fn contains_3d(outer: &Aabb, inner: &Aabb) -> bool {
    outer.contains(inner)
}
