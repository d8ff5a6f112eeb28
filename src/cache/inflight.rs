//! Single-flight coordination for cache misses.
//!
//! The first caller to miss on a key becomes the leader: its work is spawned
//! onto the runtime and published as a shared future. Callers arriving while
//! that work runs join the same future instead of starting their own. The
//! spawned task removes its slot when it finishes, whether or not anyone is
//! still awaiting it, so a disconnected client never cancels a generation.

use std::{future::Future, hash::Hash, sync::Arc};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use thiserror::Error;
use tracing::warn;

const SOURCE: &str = "cache::inflight";

type Flight<V> = Shared<BoxFuture<'static, Result<V, FlightAborted>>>;

/// The spawned work panicked or the runtime shut down before it finished.
#[derive(Debug, Clone, Copy, Error)]
#[error("in-flight work was aborted before completing")]
pub struct FlightAborted;

/// Whether a caller started the work or joined work already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRole {
    Leader,
    Follower,
}

pub struct SingleFlight<K, V> {
    slots: Arc<DashMap<K, Flight<V>>>,
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Await the in-flight result for `key`, spawning `work` if none is running.
    ///
    /// `work` is only built when this caller becomes the leader.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> (Result<V, FlightAborted>, FlightRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let (flight, role) = match self.slots.entry(key.clone()) {
            Entry::Occupied(occupied) => (occupied.get().clone(), FlightRole::Follower),
            Entry::Vacant(vacant) => {
                let guard = SlotGuard {
                    slots: Arc::clone(&self.slots),
                    key,
                };
                let fut = work();
                let handle = tokio::spawn(async move {
                    let _guard = guard;
                    fut.await
                });
                let flight = handle
                    .map(|joined| {
                        joined.map_err(|err| {
                            warn!(
                                target = SOURCE,
                                op = "run",
                                result = "aborted",
                                error = %err,
                                "In-flight task did not complete"
                            );
                            FlightAborted
                        })
                    })
                    .boxed()
                    .shared();
                vacant.insert(flight.clone());
                (flight, FlightRole::Leader)
            }
        };

        (flight.await, role)
    }

    /// Number of keys with work currently running.
    pub fn in_flight(&self) -> usize {
        self.slots.len()
    }

    pub fn is_running(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }
}

/// Clears a slot when the spawned task finishes or unwinds.
struct SlotGuard<K: Eq + Hash, V> {
    slots: Arc<DashMap<K, Flight<V>>>,
    key: K,
}

impl<K: Eq + Hash, V> Drop for SlotGuard<K, V> {
    fn drop(&mut self) {
        self.slots.remove(&self.key);
    }
}
