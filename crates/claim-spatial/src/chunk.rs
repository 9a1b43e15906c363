//! Chunk grid coordinates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Width of a chunk cell in blocks.
pub const CHUNK_SIZE: i32 = 16;

/// `log2(CHUNK_SIZE)`.
pub const CHUNK_SHIFT: u32 = 4;

/// A 16×16 horizontal grid cell.
///
/// Displays as `"{x}_{z}"`, the composite key the cell rows are addressed by.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Serialize, Deserialize)]
pub struct ChunkKey {
    pub x: i32,
    pub z: i32,
}

impl ChunkKey {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The cell containing block column `(x, z)`.
    ///
    /// Arithmetic shift floors, so `-1` maps to cell `-1` and `-16` to `-1`.
    #[inline]
    pub const fn from_block(x: i32, z: i32) -> Self {
        Self {
            x: x >> CHUNK_SHIFT,
            z: z >> CHUNK_SHIFT,
        }
    }

    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }

    /// Lowest block coordinate covered by this cell on each axis.
    pub const fn min_block(self) -> (i32, i32) {
        (self.x << CHUNK_SHIFT, self.z << CHUNK_SHIFT)
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.x, self.z)
    }
}

/// Error parsing a `"{x}_{z}"` chunk key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseChunkKeyError(String);

impl fmt::Display for ParseChunkKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid chunk key: {:?}", self.0)
    }
}

impl std::error::Error for ParseChunkKeyError {}

impl FromStr for ChunkKey {
    type Err = ParseChunkKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseChunkKeyError(s.to_owned());
        let (x, z) = s.split_once('_').ok_or_else(err)?;
        Ok(Self {
            x: x.parse().map_err(|_| err())?,
            z: z.parse().map_err(|_| err())?,
        })
    }
}

/// Every chunk cell touched by the column range `[min_x, max_x] × [min_z, max_z]`.
///
/// Both ranges are inclusive. Callers pass already-ordered bounds; an inverted
/// range yields nothing.
pub fn covered_cells(min_x: i32, max_x: i32, min_z: i32, max_z: i32) -> impl Iterator<Item = ChunkKey> {
    let lo = ChunkKey::from_block(min_x, min_z);
    let hi = ChunkKey::from_block(max_x, max_z);
    (lo.x..=hi.x).flat_map(move |cx| (lo.z..=hi.z).map(move |cz| ChunkKey::new(cx, cz)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_to_chunk() {
        assert_eq!(ChunkKey::from_block(0, 0), ChunkKey::new(0, 0));
        assert_eq!(ChunkKey::from_block(15, 15), ChunkKey::new(0, 0));
        assert_eq!(ChunkKey::from_block(16, 0), ChunkKey::new(1, 0));
        assert_eq!(ChunkKey::from_block(-1, -1), ChunkKey::new(-1, -1));
        assert_eq!(ChunkKey::from_block(-16, -17), ChunkKey::new(-1, -2));
    }

    #[test]
    fn covered_cells_inclusive() {
        let cells: Vec<_> = covered_cells(0, 16, 0, 15).collect();
        assert_eq!(cells, vec![ChunkKey::new(0, 0), ChunkKey::new(1, 0)]);

        let single: Vec<_> = covered_cells(3, 3, 3, 3).collect();
        assert_eq!(single, vec![ChunkKey::new(0, 0)]);

        let straddle: Vec<_> = covered_cells(-1, 0, -1, 0).collect();
        assert_eq!(straddle.len(), 4);
        assert!(straddle.contains(&ChunkKey::new(-1, -1)));
        assert!(straddle.contains(&ChunkKey::new(0, 0)));
    }

    #[test]
    fn covered_cells_translation() {
        let boxes = [(0, 40, -5, 20), (-33, -1, 100, 130), (7, 7, 7, 7)];
        for (min_x, max_x, min_z, max_z) in boxes {
            let base: Vec<_> = covered_cells(min_x, max_x, min_z, max_z).collect();
            for (shift, dx) in [(16, 1), (-16, -1)] {
                let shifted: Vec<_> =
                    covered_cells(min_x + shift, max_x + shift, min_z, max_z).collect();
                let expected: Vec<_> = base.iter().map(|c| c.offset(dx, 0)).collect();
                assert_eq!(shifted, expected);
            }
        }
    }

    #[test]
    fn inverted_range_is_empty() {
        assert_eq!(covered_cells(40, 0, 0, 0).count(), 0);
    }

    #[test]
    fn display_and_parse() {
        for key in [ChunkKey::new(3, -7), ChunkKey::new(-1, -1), ChunkKey::new(0, 12)] {
            let text = key.to_string();
            assert_eq!(text.parse::<ChunkKey>(), Ok(key));
        }
        assert_eq!(ChunkKey::new(-2, 5).to_string(), "-2_5");
        assert!("12".parse::<ChunkKey>().is_err());
        assert!("a_b".parse::<ChunkKey>().is_err());
    }
}
