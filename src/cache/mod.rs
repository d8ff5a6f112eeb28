//! In-memory artifact caching.
//!
//! - [`ArtifactCache`]: bounded LRU per render variant, keyed by revision.
//! - [`SingleFlight`]: coalesces concurrent misses on the same key.
//!
//! Nothing here survives a restart; every entry can be regenerated from the
//! revision it names.

mod inflight;
mod lock;
mod store;

pub use inflight::{FlightAborted, FlightRole, SingleFlight};
pub use store::{ArtifactCache, ArtifactStore};
pub(crate) use store::{METRIC_CACHE_EVICT, METRIC_CACHE_HIT, METRIC_CACHE_MISS};
