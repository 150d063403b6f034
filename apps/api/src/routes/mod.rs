pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

/// Multipart framing and the text fields ride on top of the file limit.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/analyse", post(handlers::handle_analyse))
        .route(
            "/api/v1/analyse/upload",
            post(handlers::handle_analyse_upload),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
