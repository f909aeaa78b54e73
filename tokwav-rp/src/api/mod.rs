//! REST API
//!
//! - `POST /recordings`      multipart upload of encoded tokens
//! - `GET  /recordings`      paginated list
//! - `GET  /recordings/:id`  single recording
//! - `GET  /health`

pub mod health;
pub mod recordings;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health))
        .route(
            "/recordings",
            get(recordings::list_recordings).post(recordings::create_recording),
        )
        .route("/recordings/:id", get(recordings::get_recording))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
