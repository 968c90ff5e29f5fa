//! Output module
//!
//! Serves converted poses over HTTP:
//! - JSON snapshot endpoints for poses and diagnostic skeletons
//! - SSE streams for real-time consumers (renderers, debug viewers)

pub mod routes;
pub mod sse;

use axum::Router;
use std::sync::Arc;

use crate::config::HttpConfig;
use crate::AppState;

/// HTTP server for pose output and status
pub struct PoseServer {
    app_state: Arc<AppState>,
    config: HttpConfig,
}

impl PoseServer {
    /// Create a new pose server
    pub fn new(app_state: Arc<AppState>, config: &HttpConfig) -> Self {
        Self {
            app_state,
            config: config.clone(),
        }
    }

    /// Build the router
    pub fn router(&self) -> Router {
        routes::create_router(Arc::clone(&self.app_state), &self.config)
    }
}
