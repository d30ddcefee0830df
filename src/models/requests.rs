//! Request DTOs for the template service API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::path::{Component, Path};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::config::duration_from_secs;
use crate::error::Result;
use crate::source::Encoding;

/// Request body for rendering a template (POST /render/*name)
///
/// # Fields
/// - `context`: Data the template is rendered with (defaults to `null`)
/// - `encoding`: Source encoding label (defaults to UTF-8)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub encoding: Option<String>,
}

impl RenderRequest {
    /// Parses the requested encoding, UTF-8 when absent.
    pub fn encoding(&self) -> Result<Encoding> {
        self.encoding
            .as_deref()
            .map_or(Ok(Encoding::Utf8), str::parse::<Encoding>)
    }
}

/// Request body for updating the cache configuration (PUT /config)
///
/// Every field is optional; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigRequest {
    /// Seconds a template stays in memory after being loaded
    #[serde(default)]
    pub max_duration_secs: Option<f64>,
    /// Seconds between two sweeps, fractions allowed
    #[serde(default)]
    pub sweep_interval_secs: Option<f64>,
    /// Templates directory
    #[serde(default)]
    pub base_path: Option<String>,
}

impl ConfigRequest {
    pub fn max_duration(&self) -> Result<Option<Duration>> {
        self.max_duration_secs.map(duration_from_secs).transpose()
    }

    pub fn sweep_interval(&self) -> Result<Option<Duration>> {
        self.sweep_interval_secs.map(duration_from_secs).transpose()
    }
}

/// Validates a template name taken from a URL.
///
/// Returns an error message if validation fails, None if valid. Names must
/// stay inside the templates directory.
pub fn validate_template_name(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("Template name cannot be empty".to_string());
    }

    let path = Path::new(name);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Some(format!(
            "Template name '{}' must be a relative path inside the templates directory",
            name
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CacheError;

    #[test]
    fn test_render_request_deserialize() {
        let json = r#"{"context": {"name": "Ada"}}"#;
        let req: RenderRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.context["name"], "Ada");
        assert_eq!(req.encoding().unwrap(), Encoding::Utf8);
    }

    #[test]
    fn test_render_request_empty_body() {
        let req: RenderRequest = serde_json::from_str("{}").unwrap();
        assert!(req.context.is_null());
        assert!(req.encoding.is_none());
    }

    #[test]
    fn test_render_request_encoding() {
        let req: RenderRequest = serde_json::from_str(r#"{"encoding": "latin1"}"#).unwrap();
        assert_eq!(req.encoding().unwrap(), Encoding::Latin1);

        let req: RenderRequest = serde_json::from_str(r#"{"encoding": "ebcdic"}"#).unwrap();
        assert!(matches!(req.encoding(), Err(CacheError::InvalidRequest(_))));
    }

    #[test]
    fn test_config_request_durations() {
        let json = r#"{"max_duration_secs": 2, "sweep_interval_secs": 0.25}"#;
        let req: ConfigRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.max_duration().unwrap(), Some(Duration::from_secs(2)));
        assert_eq!(req.sweep_interval().unwrap(), Some(Duration::from_millis(250)));
        assert!(req.base_path.is_none());
    }

    #[test]
    fn test_config_request_negative_duration() {
        let req: ConfigRequest = serde_json::from_str(r#"{"max_duration_secs": -1}"#).unwrap();
        assert!(req.max_duration().is_err());
    }

    #[test]
    fn test_validate_template_name() {
        assert!(validate_template_name("page.hbs").is_none());
        assert!(validate_template_name("emails/welcome.hbs").is_none());
        assert!(validate_template_name("").is_some());
        assert!(validate_template_name("../secret.txt").is_some());
        assert!(validate_template_name("emails/../../secret.txt").is_some());
        assert!(validate_template_name("/etc/passwd").is_some());
    }
}
