//! HTTP route handlers.

pub mod interactions;

use crate::state::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub commands: usize,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        commands: state.dispatcher.registry().len(),
    })
}

/// Routes for the interactions webhook and the health probe.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(&state.config.interactions_path, post(interactions::receive))
        .route("/health", get(health))
        .with_state(state)
}
