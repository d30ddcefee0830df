//! Configuration Module
//!
//! Holds the per-instance cache configuration and loads the service
//! configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CacheError, Result};

// == Defaults ==
/// Default templates directory
pub const DEFAULT_BASE_PATH: &str = "./";

/// Default time a template stays in memory after being loaded
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_secs(60);

/// Default period between two sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

// == Cache Config ==
/// Configuration owned by one [`TemplateCache`](crate::cache::TemplateCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Root directory template names are resolved against
    pub base_path: PathBuf,
    /// Entries loaded longer ago than this are evicted by the next sweep
    pub max_duration: Duration,
    /// Period of the background sweep
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// Creates a config rooted at `base_path` with default durations.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Self::default()
        }
    }

    /// Sets the maximum duration.
    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Sets the sweep interval.
    pub fn with_sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Rejects settings the sweep task cannot run with.
    pub fn validate(&self) -> Result<()> {
        validate_sweep_interval(self.sweep_interval)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from(DEFAULT_BASE_PATH),
            max_duration: DEFAULT_MAX_DURATION,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// A zero interval would turn the sweep loop into a busy loop.
pub(crate) fn validate_sweep_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(CacheError::InvalidConfig(
            "sweep interval must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Converts a number of seconds (fractions allowed) into a [`Duration`].
pub fn duration_from_secs(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| CacheError::InvalidConfig(format!("invalid duration: {} seconds", secs)))
}

// == Service Config ==
/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache settings
    pub cache: CacheConfig,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TEMPLATES_PATH` - Templates directory (default: `./`)
    /// - `MAX_DURATION` - Seconds a template stays in memory (default: 60)
    /// - `SWEEP_INTERVAL` - Seconds between sweeps, fractions allowed (default: 10)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    pub fn from_env() -> Self {
        let base_path = env::var("TEMPLATES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_BASE_PATH));

        Self {
            cache: CacheConfig {
                base_path,
                max_duration: secs_from_env("MAX_DURATION").unwrap_or(DEFAULT_MAX_DURATION),
                sweep_interval: secs_from_env("SWEEP_INTERVAL")
                    .filter(|interval| !interval.is_zero())
                    .unwrap_or(DEFAULT_SWEEP_INTERVAL),
            },
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            server_port: 3000,
        }
    }
}

fn secs_from_env(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .and_then(|secs| duration_from_secs(secs).ok())
}
