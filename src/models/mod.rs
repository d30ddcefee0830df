//! Request and Response models for the template service API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_template_name, ConfigRequest, RenderRequest};
pub use responses::{
    CachedTemplateInfo, ConfigResponse, EmptyResponse, HealthResponse, RemoveResponse,
    RenderResponse, StatsResponse, TemplatesResponse,
};
