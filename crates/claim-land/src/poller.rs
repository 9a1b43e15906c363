//! Boundary poller: tells callers when an entity walks into or out of a land.
//!
//! Runs beside the mutation path and only reads. Lookups may see a stale
//! index; the worst outcome is a late or repeated notification.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use claim_spatial::BlockPos;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::{LandId, SpatialQueryEngine};

/// Connection-scoped entity handle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityPosition {
    pub entity: EntityId,
    pub dimension: String,
    pub pos: BlockPos,
}

/// Where connected entities currently are.
pub trait PositionSource: Send + Sync {
    fn positions(&self) -> Vec<EntityPosition>;
}

/// An entity moved between lands. `None` is unclaimed ground.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoundaryCrossing {
    pub entity: EntityId,
    pub from: Option<LandId>,
    pub to: Option<LandId>,
}

/// Per-connection notification state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionContext {
    /// Land the entity was last seen in.
    pub current: Option<LandId>,
}

/// Contexts of every connected entity, behind one lock.
#[derive(Clone, Default)]
pub struct Presence {
    contexts: Arc<Mutex<HashMap<EntityId, ConnectionContext>>>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `entity`. Reconnecting resets its context.
    pub fn connect(&self, entity: EntityId) {
        self.contexts.lock().insert(entity, ConnectionContext::default());
    }

    /// Forget `entity`. Returns its last context, if it was connected.
    pub fn disconnect(&self, entity: EntityId) -> Option<ConnectionContext> {
        self.contexts.lock().remove(&entity)
    }

    pub fn context(&self, entity: EntityId) -> Option<ConnectionContext> {
        self.contexts.lock().get(&entity).cloned()
    }

    pub fn len(&self) -> usize {
        self.contexts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.lock().is_empty()
    }

    /// Record that `entity` is now in `land`.
    ///
    /// Returns the crossing if that differs from the last observation.
    /// Entities that are not connected are ignored.
    pub fn observe(&self, entity: EntityId, land: Option<LandId>) -> Option<BoundaryCrossing> {
        let mut contexts = self.contexts.lock();
        let context = contexts.get_mut(&entity)?;
        if context.current == land {
            return None;
        }
        let from = std::mem::replace(&mut context.current, land);
        Some(BoundaryCrossing {
            entity,
            from,
            to: land,
        })
    }
}

pub struct BoundaryPoller {
    engine: SpatialQueryEngine,
    presence: Presence,
    source: Arc<dyn PositionSource>,
    events: Sender<BoundaryCrossing>,
}

impl BoundaryPoller {
    /// Create a poller and the receiving end of its crossing events.
    pub fn new(
        engine: SpatialQueryEngine,
        presence: Presence,
        source: Arc<dyn PositionSource>,
    ) -> (Self, Receiver<BoundaryCrossing>) {
        let (events, rx) = crossbeam_channel::unbounded();
        let poller = Self {
            engine,
            presence,
            source,
            events,
        };
        (poller, rx)
    }

    /// Resolve every position once. Returns how many crossings were emitted.
    ///
    /// Lookups ignore height. A failed lookup keeps the entity's previous state.
    pub fn poll_once(&self) -> usize {
        let mut emitted = 0;
        for EntityPosition { entity, dimension, pos } in self.source.positions() {
            let land = match self.engine.land_at(&dimension, pos.x, pos.z, None) {
                Ok(land) => land,
                Err(err) => {
                    debug!("Skipping {entity} at {pos} in {dimension}: {err}");
                    continue;
                }
            };
            let Some(crossing) = self.presence.observe(entity, land) else {
                continue;
            };
            trace!("{entity} crossed from {:?} to {:?}", crossing.from, crossing.to);
            if self.events.send(crossing).is_err() {
                trace!("Crossing receiver dropped");
            }
            emitted += 1;
        }
        emitted
    }

    /// Poll every `interval` on a background thread until the handle is stopped or dropped.
    pub fn spawn(self, interval: Duration) -> io::Result<PollerHandle> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let thread = thread::Builder::new()
            .name("claim-poller".to_owned())
            .spawn(move || {
                loop {
                    self.poll_once();
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Boundary poller stopped");
            })?;
        info!("Boundary poller started ({}ms interval)", interval.as_millis());
        Ok(PollerHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

/// Owner of a running poller thread.
pub struct PollerHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Stop the poller and wait for its thread. Returns `false` if the thread panicked.
    pub fn stop(mut self) -> bool {
        self.shutdown()
    }

    fn shutdown(&mut self) -> bool {
        // Dropping the sender disconnects the poller's stop channel
        self.stop.take();
        let Some(thread) = self.thread.take() else {
            return true;
        };
        if thread.join().is_err() {
            warn!("Boundary poller thread panicked");
            return false;
        }
        true
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
