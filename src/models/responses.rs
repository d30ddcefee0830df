//! Response DTOs for the template service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::path::Path;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheStats, EntrySnapshot};
use crate::config::CacheConfig;

/// Response body for rendering (POST /render/*name)
#[derive(Debug, Clone, Serialize)]
pub struct RenderResponse {
    /// The rendered template name
    pub name: String,
    /// Rendered output
    pub output: String,
}

impl RenderResponse {
    pub fn new(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
        }
    }
}

/// Response body for removing one template (DELETE /templates/*name)
#[derive(Debug, Clone, Serialize)]
pub struct RemoveResponse {
    /// Human readable outcome
    pub message: String,
    /// The template name
    pub name: String,
    /// Whether the template was in memory
    pub removed: bool,
}

impl RemoveResponse {
    /// Creates a new RemoveResponse
    pub fn new(name: impl Into<String>, removed: bool) -> Self {
        let name = name.into();
        let message = if removed {
            format!("Template '{}' removed from memory", name)
        } else {
            format!("Template '{}' was not in memory", name)
        };
        Self {
            message,
            name,
            removed,
        }
    }
}

/// Response body for emptying the cache (DELETE /templates)
#[derive(Debug, Clone, Serialize)]
pub struct EmptyResponse {
    pub message: String,
    /// Number of templates dropped
    pub dropped: usize,
}

impl EmptyResponse {
    pub fn new(dropped: usize) -> Self {
        Self {
            message: format!("Dropped {} templates from memory", dropped),
            dropped,
        }
    }
}

/// One cached template in a listing
#[derive(Debug, Clone, Serialize)]
pub struct CachedTemplateInfo {
    pub name: String,
    /// When the template was loaded, ISO 8601
    pub loaded_at: String,
    /// Time since loading in milliseconds
    pub age_ms: u64,
    /// Modification time of the source it was compiled from, ISO 8601
    pub source_modified_at: String,
}

impl CachedTemplateInfo {
    /// Converts a snapshot taken at `now` into wall-clock times.
    pub fn from_snapshot(snapshot: EntrySnapshot, now: DateTime<Utc>) -> Self {
        let age = chrono::Duration::from_std(snapshot.age).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            loaded_at: (now - age).to_rfc3339(),
            age_ms: millis(snapshot.age),
            source_modified_at: rfc3339(snapshot.source_modified),
            name: snapshot.name,
        }
    }
}

/// Response body for listing cached templates (GET /templates)
#[derive(Debug, Clone, Serialize)]
pub struct TemplatesResponse {
    pub count: usize,
    pub templates: Vec<CachedTemplateInfo>,
}

impl TemplatesResponse {
    pub fn new(snapshot: Vec<EntrySnapshot>) -> Self {
        let now = Utc::now();
        let templates: Vec<CachedTemplateInfo> = snapshot
            .into_iter()
            .map(|entry| CachedTemplateInfo::from_snapshot(entry, now))
            .collect();
        Self {
            count: templates.len(),
            templates,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Lookups served from memory
    pub hits: u64,
    /// Lookups that compiled a template not in memory
    pub misses: u64,
    /// Lookups that recompiled a changed template
    pub recompilations: u64,
    /// Templates evicted by sweeps
    pub evictions: u64,
    /// Current number of templates in memory
    pub total_entries: usize,
    /// Hit rate (hits / all lookups)
    pub hit_rate: f64,
    pub max_duration_ms: u64,
    pub sweep_interval_ms: u64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: &CacheStats, config: &CacheConfig) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            recompilations: stats.recompilations,
            evictions: stats.evictions,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
            max_duration_ms: millis(config.max_duration),
            sweep_interval_ms: millis(config.sweep_interval),
        }
    }
}

/// Response body for the configuration endpoint (PUT /config)
#[derive(Debug, Clone, Serialize)]
pub struct ConfigResponse {
    pub base_path: String,
    pub max_duration_secs: f64,
    pub sweep_interval_secs: f64,
}

impl From<CacheConfig> for ConfigResponse {
    fn from(config: CacheConfig) -> Self {
        Self {
            base_path: display_path(&config.base_path),
            max_duration_secs: config.max_duration.as_secs_f64(),
            sweep_interval_secs: config.sweep_interval.as_secs_f64(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
