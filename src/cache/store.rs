//! Entry Store Module
//!
//! Maps template names to their cached entries and runs sweep passes.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{CacheEntry, CacheStats, EntrySnapshot};

// == Entry Store ==
/// Storage for compiled templates, keyed by the name callers requested.
#[derive(Debug)]
pub struct EntryStore<T> {
    /// Name to entry mapping; names are case-sensitive
    entries: HashMap<String, CacheEntry<T>>,
    /// Lookup and eviction counters
    stats: CacheStats,
}

impl<T> EntryStore<T> {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
        }
    }

    // == Get ==
    /// Looks up the entry for `name` without side effects.
    pub fn get(&self, name: &str) -> Option<&CacheEntry<T>> {
        self.entries.get(name)
    }

    // == Put ==
    /// Stores `entry` under `name`, returning the entry it replaced.
    pub fn put(&mut self, name: impl Into<String>, entry: CacheEntry<T>) -> Option<CacheEntry<T>> {
        self.entries.insert(name.into(), entry)
    }

    // == Remove ==
    /// Removes the entry for `name`. Returns whether an entry was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    // == Clear ==
    /// Removes every entry, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    // == Sweep ==
    /// Evicts every entry loaded strictly longer than `max_age` ago.
    ///
    /// Returns the number of entries removed.
    pub fn evict_older_than(&mut self, max_age: Duration) -> usize {
        let now = Instant::now();
        let before = self.entries.len();

        self.entries
            .retain(|_, entry| !entry.is_older_than(max_age, now));

        let evicted = before - self.entries.len();
        self.stats.record_evictions(evicted);
        evicted
    }

    /// Returns the names of all cached templates, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns a read-only view of every entry, sorted by name.
    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        let now = Instant::now();
        let mut snapshot: Vec<EntrySnapshot> = self
            .entries
            .iter()
            .map(|(name, entry)| EntrySnapshot {
                name: name.clone(),
                age: entry.age_at(now),
                source_modified: entry.source_modified(),
            })
            .collect();
        snapshot.sort_by(|a, b| a.name.cmp(&b.name));
        snapshot
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for EntryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
