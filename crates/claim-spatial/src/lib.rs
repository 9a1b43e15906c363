//! Claim geometry.
//!
//! Axis-aligned boxes in block coordinates and the 16×16 horizontal chunk
//! grid used to index them. Everything here is pure and infallible.
//!
//! All interval tests are closed: a box `[0, 10]` contains both `0` and `10`,
//! and two boxes sharing a single boundary block intersect.

pub mod aabb;
pub mod chunk;

pub use aabb::{Aabb, BlockPos, contains_3d, intersects_2d, intersects_3d};
pub use chunk::{CHUNK_SHIFT, CHUNK_SIZE, ChunkKey, covered_cells};
