//! API Module
//!
//! HTTP API layer for the registry.
//! Every pipeline endpoint identifies its caller through the `x-strata-user`
//! header.

pub mod caller;
pub mod error;
pub mod extract;
pub mod health;
pub mod pipeline;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::{PermissionGate, PipelineService};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pipelines: Arc<PipelineService>,
    pub permissions: PermissionGate,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline endpoints
        .route(
            "/api/pipeline",
            post(pipeline::create_pipeline).get(pipeline::list_pipelines),
        )
        .route(
            "/api/pipeline/{id}",
            get(pipeline::get_pipeline)
                .post(pipeline::update_pipeline)
                .delete(pipeline::delete_pipeline),
        )
        .route(
            "/api/pipeline/{id}/{version_id}",
            get(pipeline::get_pipeline_version).delete(pipeline::delete_pipeline_version),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
