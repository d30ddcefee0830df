//! Cache Module
//!
//! Provides the in-memory store of compiled templates, the freshness-checked
//! retrieval built on top of it, and the statistics both maintain.

mod entry;
mod stats;
mod store;
mod template_cache;


// Re-export public types
pub use entry::{CacheEntry, EntrySnapshot};
pub use stats::CacheStats;
pub use store::EntryStore;
pub use template_cache::TemplateCache;
