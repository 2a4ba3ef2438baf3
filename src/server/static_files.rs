//! Static file serving for the frontend.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use include_dir::{Dir, include_dir};
use std::sync::Arc;

use super::state::AppState;

/// Embedded frontend files.
static FRONTEND: Dir = include_dir!("$CARGO_MANIFEST_DIR/frontend");

/// Content types the page is allowed to load from `/assets`.
const ASSET_TYPES: &[&str] = &[
    "text/css",
    "text/javascript",
    "application/javascript",
    "image/png",
    "image/svg+xml",
    "image/x-icon",
    "image/vnd.microsoft.icon",
];

/// Cache policy for URLs whose content never changes (busted assets, results).
pub(super) const CACHE_FOREVER: &str = "public, max-age=31536000, immutable";

/// A body with explicit content type and cache policy.
pub(super) fn cached_bytes(
    content_type: &str,
    cache_control: &'static str,
    body: Vec<u8>,
) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CACHE_CONTROL, cache_control.to_string()),
        ],
        body,
    )
        .into_response()
}

/// Serve index.html with a per-boot version on script and stylesheet URLs.
pub async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match FRONTEND.get_file("index.html") {
        Some(file) => {
            let contents = String::from_utf8_lossy(file.contents());
            let version = format!("?v={}", state.boot_time);
            let busted = contents
                .replace(".js\"", &format!(".js{}\"", version))
                .replace(".css\"", &format!(".css{}\"", version));
            Html(busted).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Frontend not bundled").into_response(),
    }
}

/// Serve a script, stylesheet or image from `frontend/assets`.
///
/// Anything else (unknown extensions, directories) is a 404.
pub async fn asset_handler(Path(path): Path<String>) -> Response {
    let Some(content_type) = asset_type(&path) else {
        return (StatusCode::NOT_FOUND, "Asset not found").into_response();
    };

    match FRONTEND.get_file(format!("assets/{}", path)) {
        Some(file) => cached_bytes(&content_type, CACHE_FOREVER, file.contents().to_vec()),
        None => (StatusCode::NOT_FOUND, "Asset not found").into_response(),
    }
}

/// Content type for an asset path, if it is one the page may load.
fn asset_type(path: &str) -> Option<String> {
    let mime = mime_guess::from_path(path).first()?;
    ASSET_TYPES
        .contains(&mime.essence_str())
        .then(|| mime.essence_str().to_string())
}
