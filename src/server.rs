//! HTTP server setup and configuration.
//!
//! This module provides the router and application state used by both
//! the production server and integration tests.

use axum::{
    extract::{DefaultBodyLimit, State},
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::api::{self, ConversionPayload, HealthResponse};
use crate::error::ApiError;
use crate::services::{Converter, RendererHandle};

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub renderer: Arc<RendererHandle>,
    pub converter: Arc<Converter>,
    pub started_at: Instant,
}

/// Create application state around a renderer handle.
///
/// `started_at` is when the process started; `/health` reports uptime
/// relative to it. The handle may still be starting.
pub fn create_app_state(renderer: Arc<RendererHandle>, started_at: Instant) -> AppState {
    create_app_state_with_converter(Converter::new(renderer), started_at)
}

/// Create application state from a preconfigured converter.
pub fn create_app_state_with_converter(converter: Converter, started_at: Instant) -> AppState {
    AppState {
        renderer: converter.renderer().clone(),
        converter: Arc::new(converter),
        started_at,
    }
}

/// Build the API router with all endpoints and middleware.
///
/// This is the core router used by both production and tests.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(api::handle_info))
        .route("/convert", post(handle_convert))
        .route("/health", get(handle_health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

// Wrapper handlers to extract state components for the underlying API handlers

async fn handle_convert(
    State(state): State<AppState>,
    payload: ConversionPayload,
) -> Result<Response, ApiError> {
    api::handle_convert(State(state.converter), payload).await
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    api::handle_health(State(state.renderer), State(state.started_at)).await
}
