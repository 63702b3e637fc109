//! Application state for the API server

use crate::ReelService;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone). Handlers reach
/// configuration through [`ReelService::get_config`] when they need it.
#[derive(Clone)]
pub struct AppState {
    /// The reel service handling downloads and cleanup
    pub service: Arc<ReelService>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service: Arc<ReelService>) -> Self {
        Self { service }
    }
}
