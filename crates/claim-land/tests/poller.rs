use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use claim_land::{
    Aabb, Anchor, BlockPos, BoundaryCrossing, BoundaryPoller, ChunkIndex, EntityId, EntityPosition,
    LandStore, NewLand, PlayerId, PositionSource, Presence, SharedBackend, SpatialQueryEngine,
    SubLandStore,
};
use claim_storage::MemoryBackend;
use hashbrown::HashMap;
use parking_lot::Mutex;

/// Positions set by the test.
#[derive(Default)]
struct Scripted(Mutex<Vec<EntityPosition>>);

impl Scripted {
    fn place(&self, entity: EntityId, x: i32, z: i32) {
        let mut positions = self.0.lock();
        positions.retain(|p| p.entity != entity);
        positions.push(EntityPosition {
            entity,
            dimension: "overworld".to_owned(),
            pos: BlockPos::new(x, 64, z),
        });
    }
}

impl PositionSource for Scripted {
    fn positions(&self) -> Vec<EntityPosition> {
        self.0.lock().clone()
    }
}

fn engine() -> SpatialQueryEngine {
    let backend: SharedBackend = Arc::new(MemoryBackend::new());
    SpatialQueryEngine::new(
        LandStore::new(backend.clone(), ChunkIndex::new(backend.clone())),
        SubLandStore::new(backend),
    )
}

fn claim(engine: &SpatialQueryEngine, bounds: Aabb) -> claim_land::LandId {
    engine
        .lands()
        .create(NewLand {
            owner: PlayerId::new("owner"),
            name: String::new(),
            dimension: "overworld".to_owned(),
            bounds,
            anchor: Anchor::center_of(&bounds),
            paid: 0,
        })
        .unwrap()
}

#[test]
fn poll_once_reports_entries_and_exits() {
    let engine = engine();
    // Height is ignored by the poller
    let land = claim(&engine, Aabb::new((0, 10), (0, 10), (0, 10)));

    let presence = Presence::new();
    let source = Arc::new(Scripted::default());
    let (poller, events) = BoundaryPoller::new(engine, presence.clone(), source.clone());

    let walker = EntityId(1);
    let stranger = EntityId(2);
    presence.connect(walker);
    source.place(walker, -5, 5);
    source.place(stranger, 5, 5);

    assert_eq!(poller.poll_once(), 0);

    source.place(walker, 5, 5);
    assert_eq!(poller.poll_once(), 1);
    assert_eq!(
        events.try_recv().unwrap(),
        BoundaryCrossing {
            entity: walker,
            from: None,
            to: Some(land),
        }
    );
    assert_eq!(poller.poll_once(), 0);

    source.place(walker, 50, 5);
    assert_eq!(poller.poll_once(), 1);
    assert_eq!(events.try_recv().unwrap().to, None);
    assert!(events.try_recv().is_err());

    presence.disconnect(walker);
    source.place(walker, 5, 5);
    assert_eq!(poller.poll_once(), 0);
}

#[test]
fn spawned_poller_runs_until_stopped() {
    let engine = engine();
    let land = claim(&engine, Aabb::new((0, 10), (0, 10), (0, 10)));

    let presence = Presence::new();
    let source = Arc::new(Scripted::default());
    let entity = EntityId(7);
    presence.connect(entity);
    source.place(entity, 3, 3);

    let (poller, events) = BoundaryPoller::new(engine, presence.clone(), source);
    let handle = poller.spawn(Duration::from_millis(5)).unwrap();

    let crossing = events.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(crossing.to, Some(land));

    assert!(handle.stop());
    assert!(events.recv_timeout(Duration::from_millis(50)).is_err());
    assert_eq!(presence.context(entity).unwrap().current, Some(land));
}

#[test]
fn poller_survives_concurrent_creates_and_deletes() {
    let engine = engine();
    let presence = Presence::new();
    let source = Arc::new(Scripted::default());
    let spots = [(EntityId(1), 5, 5), (EntityId(2), 40, -20), (EntityId(3), -70, 100)];
    for &(entity, x, z) in &spots {
        presence.connect(entity);
        source.place(entity, x, z);
    }

    let (poller, events) = BoundaryPoller::new(engine.clone(), presence.clone(), source.clone());
    let handle = poller.spawn(Duration::from_millis(1)).unwrap();

    let writer = {
        let engine = engine.clone();
        thread::spawn(move || {
            let mut created = Vec::new();
            for i in 0..300_usize {
                let (_, x, z) = spots[i % spots.len()];
                // Odd lands sit just beside their entity
                let shift = if i % 2 == 0 { 0 } else { 20 };
                let bounds = Aabb::new((x - 3 + shift, x + 3 + shift), (0, 128), (z - 3, z + 3));
                created.push((claim(&engine, bounds), bounds));
                if i % 3 == 2 {
                    let (old, _) = created[created.len() - 3];
                    assert!(engine.lands().delete(old).unwrap());
                }
            }
            created
        })
    };
    let mut boxes: HashMap<claim_land::LandId, Aabb> = writer.join().unwrap().into_iter().collect();

    // The poller is still live: move an entity onto fresh land and wait for it
    source.place(EntityId(1), 1000, 1000);
    let last_bounds = Aabb::new((995, 1005), (0, 128), (995, 1005));
    let last = claim(&engine, last_bounds);
    boxes.insert(last, last_bounds);

    let deadline = Instant::now() + Duration::from_secs(5);
    while presence.context(EntityId(1)).and_then(|c| c.current) != Some(last) {
        assert!(Instant::now() < deadline, "poller never saw the final land");
        thread::sleep(Duration::from_millis(1));
    }

    assert!(handle.stop());

    let crossings: Vec<BoundaryCrossing> = events.try_iter().collect();
    assert!(!crossings.is_empty());
    for crossing in crossings {
        let Some(id) = crossing.to else {
            continue;
        };
        let bounds = boxes.get(&id).unwrap_or_else(|| panic!("crossing into unknown land {id}"));
        let mut seen_at = spots
            .iter()
            .filter(|(entity, _, _)| *entity == crossing.entity)
            .map(|&(_, x, z)| (x, z))
            .collect::<Vec<_>>();
        if crossing.entity == EntityId(1) {
            seen_at.push((1000, 1000));
        }
        assert!(
            seen_at.iter().any(|&(x, z)| bounds.contains_column(x, z)),
            "{} reported inside land {id} at {bounds}",
            crossing.entity
        );
    }
}
