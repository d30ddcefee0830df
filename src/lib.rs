//! Template Cache - A time-bounded in-memory cache for compiled templates
//!
//! Keeps compiled Handlebars templates in memory while they are requested,
//! recompiles them when their source file changes, and evicts them once they
//! have been loaded for longer than the configured maximum duration.

pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod source;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheEntry, CacheStats, EntryStore, TemplateCache};
pub use config::{CacheConfig, Config};
pub use engine::{HandlebarsEngine, HandlebarsTemplate, TemplateEngine};
pub use error::{CacheError, Result};
pub use source::{Encoding, FsSource, TemplateSource};
pub use tasks::spawn_sweep_task;
