//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`reel`] - Fetch a reel and stage its artifacts
//! - [`cleanup`] - Deferred cleanup task status
//! - [`system`] - Home, health, capabilities, events, OpenAPI

use serde::{Deserialize, Serialize};

mod cleanup;
mod reel;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use cleanup::*;
pub use reel::*;
pub use system::*;

/// Query parameters for GET /download/reel
#[derive(Debug, Deserialize, Serialize, utoipa::IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ReelQuery {
    /// Instagram Reel URL, e.g. `https://www.instagram.com/reel/ABC123/`
    pub url: Option<String>,
}

/// Response for GET /cleanup/:id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CleanupStatusResponse {
    /// Task identity
    pub id: crate::types::CleanupTaskId,
    /// Current state of the task
    pub state: crate::types::CleanupState,
}
