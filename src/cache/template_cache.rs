//! Template Cache Module
//!
//! Serves compiled templates from memory while their sources are unchanged,
//! recompiles them when the source is modified, and owns the background task
//! that evicts templates once they have been loaded for too long.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheEntry, CacheStats, EntrySnapshot, EntryStore};
use crate::config::{validate_sweep_interval, CacheConfig};
use crate::engine::{HandlebarsEngine, TemplateEngine};
use crate::error::{CacheError, Result};
use crate::source::{Encoding, FsSource, TemplateSource};
use crate::tasks::{spawn_sweep_task, sweep_once, SweepSchedule};

// == Template Cache ==
/// Time-bounded cache of compiled templates.
///
/// Each instance owns its configuration, its engine and exactly one sweep
/// task. Lookups hand out shared handles: while a source is unchanged, every
/// caller receives the same compiled template.
///
/// A cache must be created inside a Tokio runtime. Dropping it, or calling
/// [`TemplateCache::shutdown`], stops the sweep task.
pub struct TemplateCache<E: TemplateEngine = HandlebarsEngine, S: TemplateSource = FsSource> {
    /// Entries shared with the sweep task
    store: Arc<RwLock<EntryStore<E::Template>>>,
    /// Compiles sources into templates
    engine: E,
    /// Provides source bytes and modification times
    source: S,
    /// Directory template names are resolved against
    base_path: parking_lot::RwLock<PathBuf>,
    /// Publishes sweep settings to the sweep task
    schedule: watch::Sender<SweepSchedule>,
    /// The sweep task
    sweeper: JoinHandle<()>,
}

impl TemplateCache {
    // == Constructor ==
    /// Creates a cache reading templates from disk and compiling them with
    /// a fresh [`HandlebarsEngine`].
    pub fn new(config: CacheConfig) -> Result<Self> {
        Self::with_parts(config, HandlebarsEngine::new(), FsSource)
    }
}

impl<E: TemplateEngine, S: TemplateSource> TemplateCache<E, S> {
    /// Creates a cache with an explicit engine and source.
    ///
    /// Sweeps once immediately and arms the sweep timer.
    pub fn with_parts(config: CacheConfig, engine: E, source: S) -> Result<Self> {
        config.validate()?;
        Handle::try_current().map_err(|_| CacheError::NoRuntime)?;

        let store = Arc::new(RwLock::new(EntryStore::new()));
        let (schedule, receiver) = watch::channel(SweepSchedule::new(
            config.max_duration,
            config.sweep_interval,
        ));
        let sweeper = spawn_sweep_task(Arc::clone(&store), receiver);

        info!(
            "Template cache created: base_path={}, max_duration={:?}, sweep_interval={:?}",
            config.base_path.display(),
            config.max_duration,
            config.sweep_interval
        );

        Ok(Self {
            store,
            engine,
            source,
            base_path: parking_lot::RwLock::new(config.base_path),
            schedule,
            sweeper,
        })
    }

    // == Configuration ==
    /// Sets the directory template names are resolved against.
    ///
    /// Cached entries keep their compiled templates; their next lookup
    /// checks freshness against the file under the new directory.
    pub fn set_base_path(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        info!("Template base path set to {}", path.display());
        *self.base_path.write() = path;
    }

    /// Sets how long a template stays in memory after being loaded.
    ///
    /// The sweep task re-sweeps immediately under the new duration.
    pub fn set_max_duration(&self, max_duration: Duration) {
        info!("Template max duration set to {:?}", max_duration);
        self.schedule
            .send_modify(|schedule| schedule.max_duration = max_duration);
    }

    /// Sets the period between sweeps.
    ///
    /// The pending sweep timer is cancelled, a sweep runs immediately, and the
    /// timer is re-armed with the new interval.
    pub fn set_sweep_interval(&self, interval: Duration) -> Result<()> {
        validate_sweep_interval(interval)?;
        info!("Template sweep interval set to {:?}", interval);
        self.schedule
            .send_modify(|schedule| schedule.interval = interval);
        Ok(())
    }

    pub fn max_duration(&self) -> Duration {
        self.schedule.borrow().max_duration
    }

    pub fn sweep_interval(&self) -> Duration {
        self.schedule.borrow().interval
    }

    pub fn base_path(&self) -> PathBuf {
        self.base_path.read().clone()
    }

    /// Returns the current configuration.
    pub fn config(&self) -> CacheConfig {
        let schedule = *self.schedule.borrow();
        CacheConfig {
            base_path: self.base_path(),
            max_duration: schedule.max_duration,
            sweep_interval: schedule.interval,
        }
    }

    /// Returns the engine templates are compiled with.
    ///
    /// Helpers registered on it apply to every template of this cache.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    // == Get Template ==
    /// Returns the compiled template for `name`, decoding its source as UTF-8.
    ///
    /// May block; see [`TemplateCache::get_template_with_encoding`].
    pub async fn get_template(&self, name: &str) -> Result<Arc<E::Template>> {
        self.get_template_with_encoding(name, Encoding::Utf8).await
    }

    /// Returns the compiled template for `name`.
    ///
    /// Serves the cached template unless its source was modified after it was
    /// compiled, in which case the source is read and compiled again. A failed
    /// read or compile leaves the cache unchanged.
    ///
    /// # Blocking
    /// The stat, read and compile run synchronously on the calling worker
    /// while the store's write lock is held, so other lookups on this cache
    /// wait behind a slow disk or a large compile. On a busy multi-threaded
    /// runtime, run lookups inside `tokio::task::spawn_blocking`.
    ///
    /// # Errors
    /// - [`CacheError::NotFound`] if no source exists for `name`
    /// - [`CacheError::Compile`] if the engine rejects the source
    /// - [`CacheError::Io`] if the source cannot be read or inspected
    pub async fn get_template_with_encoding(
        &self,
        name: &str,
        encoding: Encoding,
    ) -> Result<Arc<E::Template>> {
        let path = self.resolve(name)?;

        // Held until the new entry is stored so sweeps never see a partial reload
        let mut store = self.store.write().await;

        let mut refreshing = false;
        if let Some(entry) = store.get(name) {
            let modified = self
                .source
                .modified(&path)
                .map_err(|e| CacheError::from_io(name, &path, e))?;

            if !entry.is_stale(modified) {
                let compiled = entry.compiled();
                store.stats_mut().record_hit();
                debug!("Template '{}' served from memory", name);
                return Ok(compiled);
            }

            debug!("Template '{}' changed on disk, recompiling", name);
            refreshing = true;
        }

        let entry = self.load(name, &path, encoding)?;
        let compiled = entry.compiled();
        store.put(name, entry);

        if refreshing {
            store.stats_mut().record_recompilation();
        } else {
            store.stats_mut().record_miss();
            debug!("Template '{}' compiled and cached", name);
        }

        Ok(compiled)
    }

    // == Inspection ==
    /// Number of templates currently in memory.
    pub async fn count_in_memory(&self) -> usize {
        self.store.read().await.len()
    }

    /// Names of the templates currently in memory, sorted.
    pub async fn cached_names(&self) -> Vec<String> {
        self.store.read().await.keys()
    }

    /// Age and source modification time of every template in memory.
    pub async fn cached_entries(&self) -> Vec<EntrySnapshot> {
        self.store.read().await.snapshot()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    // == Explicit Eviction ==
    /// Drops the template cached under `name`.
    ///
    /// Returns false if nothing was cached under that name.
    pub async fn remove(&self, name: &str) -> bool {
        let removed = self.store.write().await.remove(name);
        if removed {
            debug!("Template '{}' removed from memory", name);
        }
        removed
    }

    /// Drops every cached template, returning how many were dropped.
    pub async fn empty(&self) -> usize {
        let dropped = self.store.write().await.clear();
        info!("Template cache emptied: dropped {} templates", dropped);
        dropped
    }

    /// Runs a sweep pass now, outside the schedule.
    pub async fn sweep(&self) -> usize {
        sweep_once(&self.store, self.max_duration()).await
    }

    // == Shutdown ==
    /// Stops the sweep task. Lookups keep working, without timed eviction.
    pub fn shutdown(&self) {
        self.schedule.send_modify(|schedule| schedule.running = false);
    }

    /// Returns true once the sweep task has exited.
    pub fn is_sweeper_finished(&self) -> bool {
        self.sweeper.is_finished()
    }

    // == Private Helpers ==
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let path = self.base_path.read().join(name);
        if !self.source.exists(&path) {
            debug!("Template '{}' not found at {}", name, path.display());
            return Err(CacheError::NotFound(name.to_string()));
        }
        Ok(path)
    }

    fn load(&self, name: &str, path: &Path, encoding: Encoding) -> Result<CacheEntry<E::Template>> {
        let text = self
            .source
            .read_to_string(path, encoding)
            .map_err(|e| CacheError::from_io(name, path, e))?;
        let compiled = self.engine.compile(name, &text)?;
        let modified = self
            .source
            .modified(path)
            .map_err(|e| CacheError::from_io(name, path, e))?;

        Ok(CacheEntry::new(compiled, modified))
    }
}
