//! API route definitions

use crate::models::ModelManager;
use crate::trainer::ModelTrainer;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::session::ModelSession;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ModelManager>,
    pub trainer: Arc<ModelTrainer>,
    pub session: Arc<ModelSession>,
    pub prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
}

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health and status
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        // Registry
        .route("/models", get(handlers::list_models))
        .route("/models/scan", post(handlers::scan_models))
        .route("/models/{name}/load", post(handlers::load_registered_model))
        // Session model and generation
        .route("/load_model", post(handlers::load_model))
        .route("/generate_with_model", post(handlers::generate_with_model))
        // Training
        .route("/fine_tune", post(handlers::fine_tune))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}
