//! Error types for the template cache
//!
//! Provides unified error handling using thiserror.

use std::io;
use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for template lookups, compilation and configuration.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The template source does not exist under the base path
    #[error("Template not found: {0}")]
    NotFound(String),

    /// The engine rejected the template source
    #[error("Failed to compile template '{name}': {message}")]
    Compile { name: String, message: String },

    /// The compiled template could not be rendered with the given data
    #[error("Failed to render template '{name}': {message}")]
    Render { name: String, message: String },

    /// Reading or inspecting the template source failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The cache was constructed outside of a Tokio runtime
    #[error("No Tokio runtime available to run the sweep task")]
    NoRuntime,
}

impl CacheError {
    /// Wraps an I/O error raised while accessing `path`.
    ///
    /// A missing file is reported as [`CacheError::NotFound`] under `name` so a
    /// source deleted between resolution and read still surfaces as not found.
    pub fn from_io(name: &str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            return CacheError::NotFound(name.to_string());
        }
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Compile { .. } | CacheError::Render { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            CacheError::InvalidRequest(_) | CacheError::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            CacheError::Io { .. } | CacheError::NoRuntime => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the template cache.
pub type Result<T> = std::result::Result<T, CacheError>;
