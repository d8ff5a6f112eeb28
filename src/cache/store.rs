//! Revision-keyed artifact storage.
//!
//! One bounded LRU per [`RenderVariant`]; a styled and an unstyled rendering of
//! the same revision live in different stores and can never be confused.
//! Entries are only ever removed by capacity eviction: a revision's output is
//! immutable, so there is nothing to invalidate.

use std::{num::NonZeroUsize, sync::Arc, sync::Mutex};

use lru::LruCache;
use metrics::counter;
use tracing::debug;

use crate::config::CacheSettings;
use crate::domain::{
    artifacts::ArtifactSet,
    revision::{ArtifactKey, RevisionRef},
    types::RenderVariant,
};

use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_HIT: &str = "revdoc_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "revdoc_cache_miss_total";
pub(crate) const METRIC_CACHE_EVICT: &str = "revdoc_cache_evict_total";

/// Bounded LRU of artifact sets for a single render variant.
pub struct ArtifactStore {
    variant: RenderVariant,
    entries: Mutex<LruCache<RevisionRef, Arc<ArtifactSet>>>,
}

impl ArtifactStore {
    pub fn new(variant: RenderVariant, capacity: NonZeroUsize) -> Self {
        Self {
            variant,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn variant(&self) -> RenderVariant {
        self.variant
    }

    /// Look up a revision, marking it most recently used on a hit.
    pub fn get(&self, revision: &RevisionRef) -> Option<Arc<ArtifactSet>> {
        let found = mutex_lock(&self.entries, SOURCE, "get")
            .get(revision)
            .cloned();
        let metric = if found.is_some() {
            METRIC_CACHE_HIT
        } else {
            METRIC_CACHE_MISS
        };
        counter!(metric, "variant" => self.variant.as_str()).increment(1);
        found
    }

    /// Store an artifact set, returning the revision evicted to make room.
    ///
    /// Re-inserting a revision already present replaces it in place; that is
    /// not an eviction.
    pub fn put(&self, revision: RevisionRef, artifacts: Arc<ArtifactSet>) -> Option<RevisionRef> {
        let displaced = mutex_lock(&self.entries, SOURCE, "put")
            .push(revision.clone(), artifacts)
            .map(|(key, _)| key);

        match displaced {
            Some(evicted) if evicted != revision => {
                counter!(METRIC_CACHE_EVICT, "variant" => self.variant.as_str()).increment(1);
                debug!(
                    target = SOURCE,
                    op = "put",
                    variant = self.variant.as_str(),
                    inserted = revision.short(),
                    evicted = evicted.short(),
                    "Evicted least recently used artifact set"
                );
                Some(evicted)
            }
            _ => None,
        }
    }

    /// Presence check that leaves recency order untouched.
    pub fn contains(&self, revision: &RevisionRef) -> bool {
        mutex_lock(&self.entries, SOURCE, "contains").contains(revision)
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> NonZeroUsize {
        mutex_lock(&self.entries, SOURCE, "capacity").cap()
    }
}

/// The artifact cache handed to request handlers: one store per variant.
pub struct ArtifactCache {
    default: ArtifactStore,
    styled: ArtifactStore,
}

impl ArtifactCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            default: ArtifactStore::new(RenderVariant::Default, capacity),
            styled: ArtifactStore::new(RenderVariant::Styled, capacity),
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.capacity)
    }

    pub fn store(&self, variant: RenderVariant) -> &ArtifactStore {
        match variant {
            RenderVariant::Default => &self.default,
            RenderVariant::Styled => &self.styled,
        }
    }

    pub fn get(&self, key: &ArtifactKey) -> Option<Arc<ArtifactSet>> {
        self.store(key.variant).get(&key.revision)
    }

    pub fn put(&self, key: ArtifactKey, artifacts: Arc<ArtifactSet>) -> Option<RevisionRef> {
        self.store(key.variant).put(key.revision, artifacts)
    }
}
