//! Entity positions fed by console commands.

use std::collections::BTreeMap;

use claim_land::{BlockPos, EntityId, EntityPosition, PositionSource};
use parking_lot::RwLock;

/// Last position reported for each simulated entity.
#[derive(Default)]
pub struct ConsolePositions {
    entities: RwLock<BTreeMap<EntityId, EntityPosition>>,
}

impl ConsolePositions {
    pub fn place(&self, entity: EntityId, dimension: &str, pos: BlockPos) {
        self.entities.write().insert(
            entity,
            EntityPosition {
                entity,
                dimension: dimension.to_owned(),
                pos,
            },
        );
    }

    pub fn remove(&self, entity: EntityId) {
        self.entities.write().remove(&entity);
    }
}

impl PositionSource for ConsolePositions {
    fn positions(&self) -> Vec<EntityPosition> {
        self.entities.read().values().cloned().collect()
    }
}
