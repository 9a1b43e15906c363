//! Claim error types.

use std::fmt;

use claim_spatial::Aabb;
use claim_storage::{StorageError, StorageResult};
use thiserror::Error;

use crate::{LandId, PlayerId, SubLandId};

/// Errors returned by claim operations.
///
/// Everything except [`ClaimError::Storage`] is an expected rejection the
/// caller reports to the player. Storage failures are logged where they are
/// converted and handed back; nothing here aborts the process.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// Referenced land does not exist.
    #[error("land {0} not found")]
    LandNotFound(LandId),

    /// Referenced sub-land does not exist.
    #[error("sub-land {0} not found")]
    SubLandNotFound(SubLandId),

    /// Sub-land box leaves its parent's box.
    #[error("box {bounds} is not inside parent land {parent}")]
    ContainmentViolation { parent: LandId, bounds: Aabb },

    /// Candidate box conflicts with existing lands.
    #[error("box conflicts with lands {0:?}")]
    OverlapConflict(Vec<LandId>),

    /// Candidate box conflicts with sibling sub-lands.
    #[error("box conflicts with sub-lands {0:?}")]
    SubLandOverlap(Vec<SubLandId>),

    /// Teleport anchor outside its land's footprint.
    #[error("point ({x}, {z}) is outside {bounds}")]
    BoundsViolation { x: f64, z: f64, bounds: Aabb },

    #[error("{0} is already shared on this claim")]
    AlreadyShared(PlayerId),

    #[error("{0} is not shared on this claim")]
    NotShared(PlayerId),

    /// Dimension name is empty or contains NUL, which the cell key layout reserves.
    #[error("invalid dimension name {0:?}")]
    InvalidDimension(String),

    /// Footprint wider than the configured maximum on X or Z.
    #[error("claim is {width_x}x{width_z}, maximum side is {max}")]
    TooLarge { width_x: i64, width_z: i64, max: i32 },

    /// Footprint narrower than the configured minimum on X or Z.
    #[error("claim is {width_x}x{width_z}, minimum side is {min}")]
    TooSmall { width_x: i64, width_z: i64, min: i32 },

    /// Underlying store signaled an error.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl ClaimError {
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Result type for claim operations.
pub type ClaimResult<T> = Result<T, ClaimError>;

/// Log a storage failure with its operation context and convert it.
pub(crate) trait LogStorage<T> {
    fn log_storage(self, op: &'static str, subject: &dyn fmt::Display) -> ClaimResult<T>;
}

impl<T> LogStorage<T> for StorageResult<T> {
    fn log_storage(self, op: &'static str, subject: &dyn fmt::Display) -> ClaimResult<T> {
        self.map_err(|err| {
            tracing::error!(op, "storage failure on {subject}: {err}");
            ClaimError::Storage(err)
        })
    }
}
