//! API Module
//!
//! HTTP handlers and routing for the template service.
//!
//! # Endpoints
//! - `POST /render/*name` - Render a template through the cache
//! - `GET /templates` - List templates in memory
//! - `DELETE /templates/*name` - Drop one template from memory
//! - `DELETE /templates` - Drop every template from memory
//! - `PUT /config` - Change base path, max duration or sweep interval
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
