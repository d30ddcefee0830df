//! Cache Entry Module
//!
//! Defines one cached compiled template together with the timestamps that
//! drive freshness checks and timed eviction.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::time::Instant;

// == Cache Entry ==
/// A compiled template and the moments it was compiled from and loaded at.
///
/// Fields are only set by the constructors, so `compiled` and `loaded_at`
/// always change together: refreshing a template means replacing its entry.
#[derive(Debug)]
pub struct CacheEntry<T> {
    compiled: Arc<T>,
    source_modified: SystemTime,
    loaded_at: Instant,
}

impl<T> CacheEntry<T> {
    // == Constructor ==
    /// Creates an entry loaded now.
    ///
    /// # Arguments
    /// * `compiled` - The compiled template
    /// * `source_modified` - Modification time of the source it was compiled from
    pub fn new(compiled: T, source_modified: SystemTime) -> Self {
        Self::with_loaded_at(compiled, source_modified, Instant::now())
    }

    /// Creates an entry with an explicit load instant.
    pub(crate) fn with_loaded_at(compiled: T, source_modified: SystemTime, loaded_at: Instant) -> Self {
        Self {
            compiled: Arc::new(compiled),
            source_modified,
            loaded_at,
        }
    }

    /// Returns a shared handle to the compiled template.
    pub fn compiled(&self) -> Arc<T> {
        Arc::clone(&self.compiled)
    }

    pub fn source_modified(&self) -> SystemTime {
        self.source_modified
    }

    pub fn loaded_instant(&self) -> Instant {
        self.loaded_at
    }

    // == Age ==
    /// Time elapsed between loading and `now`.
    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.loaded_at)
    }

    /// Time elapsed since loading.
    pub fn age(&self) -> Duration {
        self.age_at(Instant::now())
    }

    // == Eviction Check ==
    /// Returns true once the entry has been loaded for strictly longer than `max_age`.
    pub fn is_older_than(&self, max_age: Duration, now: Instant) -> bool {
        self.age_at(now) > max_age
    }

    // == Freshness Check ==
    /// Returns true if the source was modified after this entry was compiled.
    ///
    /// Equal timestamps count as fresh.
    pub fn is_stale(&self, current_modified: SystemTime) -> bool {
        current_modified > self.source_modified
    }
}

// == Entry Snapshot ==
/// Read-only view of an entry, used for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySnapshot {
    pub name: String,
    pub age: Duration,
    pub source_modified: SystemTime,
}
