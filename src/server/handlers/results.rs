//! Retrieval of generated images.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use super::super::state::AppState;
use super::super::static_files::{CACHE_FOREVER, cached_bytes};

/// GET /static/results/:filename - return a previously generated PNG.
///
/// Result names are fresh UUIDs, so a stored file never changes.
pub async fn fetch(State(state): State<Arc<AppState>>, Path(filename): Path<String>) -> Response {
    let Some(path) = state.store.path_for(&filename) else {
        return (StatusCode::BAD_REQUEST, "Invalid result name").into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => cached_bytes("image/png", CACHE_FOREVER, bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "Result not found").into_response()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read result");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read result").into_response()
        }
    }
}
