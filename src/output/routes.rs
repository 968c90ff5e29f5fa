//! Route definitions for the pose output server

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::HttpConfig;
use crate::AppState;

use super::sse;

/// Create the main router with all routes
pub fn create_router(app_state: Arc<AppState>, config: &HttpConfig) -> Router {
    let cors = if config.cors_enabled {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        // JSON snapshots
        .route("/api/pose", get(get_pose))
        .route("/api/skeleton", get(get_skeleton))
        .route("/api/status", get(get_status))
        // SSE streams
        .route("/api/pose/stream", get(pose_stream))
        .route("/api/skeleton/stream", get(skeleton_stream))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub pose_subscribers: usize,
    pub filtering: bool,
}

/// Latest converted pose
async fn get_pose(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let pose = state.get_pose().await;
    ApiResponse::success(sse::pose_to_json(&pose))
}

/// Latest constraint-corrected skeleton
async fn get_skeleton(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let frame = state.get_skeleton().await;
    ApiResponse::success(sse::skeleton_to_json(&frame))
}

/// Service status
async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let filtering = state.config.read().await.converter.filtering;
    ApiResponse::success(StatusResponse {
        version: crate::VERSION.to_string(),
        pose_subscribers: state.pose_tx.receiver_count(),
        filtering,
    })
}

/// SSE stream of converted poses
async fn pose_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    sse::create_pose_stream(state)
}

/// SSE stream of corrected skeletons
async fn skeleton_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    sse::create_skeleton_stream(state)
}
