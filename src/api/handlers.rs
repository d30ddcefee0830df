//! API Handlers
//!
//! HTTP request handlers for each template service endpoint.

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::warn;

use crate::cache::TemplateCache;
use crate::config::{validate_sweep_interval, CacheConfig};
use crate::error::{CacheError, Result};
use crate::models::{
    validate_template_name, ConfigRequest, ConfigResponse, EmptyResponse, HealthResponse,
    RemoveResponse, RenderRequest, RenderResponse, StatsResponse, TemplatesResponse,
};

/// Application state shared across all handlers.
///
/// The cache synchronizes internally, so handlers share it through an `Arc`.
/// `templates_root` is the directory the service started with; the base path
/// can only be moved below it.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<TemplateCache>,
    pub templates_root: Arc<PathBuf>,
}

impl AppState {
    /// Creates a new AppState around the given cache, rooted at its current
    /// base path.
    pub fn new(cache: TemplateCache) -> Self {
        let templates_root = cache.base_path();
        Self {
            cache: Arc::new(cache),
            templates_root: Arc::new(templates_root),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Ok(Self::new(TemplateCache::new(config.clone())?))
    }
}

fn checked_name(name: String) -> Result<String> {
    match validate_template_name(&name) {
        Some(message) => Err(CacheError::InvalidRequest(message)),
        None => Ok(name),
    }
}

/// Handler for POST /render/*name
///
/// Fetches the template through the cache and renders it with the request context.
pub async fn render_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<RenderRequest>,
) -> Result<Json<RenderResponse>> {
    let name = checked_name(name)?;
    let encoding = req.encoding()?;

    let template = state
        .cache
        .get_template_with_encoding(&name, encoding)
        .await
        .inspect_err(|e| warn!("Lookup of template '{}' failed: {}", name, e))?;
    let output = template.render(&req.context)?;

    Ok(Json(RenderResponse::new(name, output)))
}

/// Handler for GET /templates
///
/// Lists the templates currently in memory.
pub async fn list_handler(State(state): State<AppState>) -> Json<TemplatesResponse> {
    Json(TemplatesResponse::new(state.cache.cached_entries().await))
}

/// Handler for DELETE /templates/*name
///
/// Drops one template from memory. Absent templates are not an error.
pub async fn remove_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<RemoveResponse>> {
    let name = checked_name(name)?;
    let removed = state.cache.remove(&name).await;

    Ok(Json(RemoveResponse::new(name, removed)))
}

/// Handler for DELETE /templates
pub async fn empty_handler(State(state): State<AppState>) -> Json<EmptyResponse> {
    Json(EmptyResponse::new(state.cache.empty().await))
}

/// Handler for PUT /config
///
/// Validates every field before applying any of them.
pub async fn config_handler(
    State(state): State<AppState>,
    Json(req): Json<ConfigRequest>,
) -> Result<Json<ConfigResponse>> {
    let max_duration = req.max_duration()?;
    let sweep_interval = req.sweep_interval()?;
    if let Some(interval) = sweep_interval {
        validate_sweep_interval(interval)?;
    }
    let base_path = req
        .base_path
        .as_deref()
        .map(|requested| confined_base_path(&state.templates_root, requested))
        .transpose()?;

    if let Some(base_path) = base_path {
        state.cache.set_base_path(base_path);
    }
    if let Some(max_duration) = max_duration {
        state.cache.set_max_duration(max_duration);
    }
    if let Some(interval) = sweep_interval {
        state.cache.set_sweep_interval(interval)?;
    }

    Ok(Json(ConfigResponse::from(state.cache.config())))
}

/// Resolves `requested` against `root` and accepts it only if it is an
/// existing directory inside `root` once symlinks and `..` are resolved.
fn confined_base_path(root: &FsPath, requested: &str) -> Result<PathBuf> {
    let root = root.canonicalize().map_err(|e| {
        CacheError::InvalidConfig(format!(
            "templates root {} is not accessible: {}",
            root.display(),
            e
        ))
    })?;
    let candidate = root.join(requested).canonicalize().map_err(|_| {
        CacheError::InvalidConfig(format!("base path '{}' does not exist", requested))
    })?;

    if !candidate.starts_with(&root) || !candidate.is_dir() {
        warn!("Rejected base path '{}' outside {}", requested, root.display());
        return Err(CacheError::InvalidConfig(format!(
            "base path '{}' must be a directory inside the templates root",
            requested
        )));
    }
    Ok(candidate)
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.cache.stats().await;
    Json(StatsResponse::new(&stats, &state.cache.config()))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
