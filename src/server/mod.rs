//! # HTTP Server for Watermarking
//!
//! Provides a web page for uploading an image and a JSON API that returns a
//! link to the watermarked copy.
//!
//! ## Usage
//!
//! ```bash
//! tilemark serve --listen 0.0.0.0:5000 --results-dir static/results
//! ```
//!
//! Then open http://localhost:5000 in a browser.
//!
//! ## Routes
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | `/` | upload page |
//! | GET | `/assets/*path` | page script and stylesheet |
//! | POST | `/api/watermark` | watermark a data-URI image |
//! | GET | `/static/results/:filename` | fetch a generated image |

mod handlers;
mod state;
mod static_files;

pub use handlers::watermark::{WatermarkRequest, WatermarkResponse};
pub use state::{AppState, ServerConfig};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::TilemarkError;
use crate::font;

/// Upload limit for `POST /api/watermark` (base64 inflates files by 4/3).
pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Frontend
        .route("/", get(static_files::index_handler))
        .route("/assets/*path", get(static_files::asset_handler))
        // Watermark API
        .route(
            "/api/watermark",
            post(handlers::watermark::create).layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        // Results
        .route("/static/results/:filename", get(handlers::results::fetch))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
///
/// Resolves the watermark font first (downloading it if configured), so a
/// server that cannot render text never starts listening.
///
/// ## Example
///
/// ```no_run
/// use tilemark::server::{ServerConfig, serve};
///
/// # async fn example() -> Result<(), tilemark::TilemarkError> {
/// serve(ServerConfig::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), TilemarkError> {
    let font = font::init(&config.fonts).await?;
    let app_state = Arc::new(AppState::new(&config, font)?);
    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            TilemarkError::Server(format!("Failed to bind to {}: {}", config.listen_addr, e))
        })?;

    info!(
        listen = %config.listen_addr,
        results = %config.results_dir.display(),
        "tilemark HTTP server started"
    );

    axum::serve(listener, app)
        .await
        .map_err(|e| TilemarkError::Server(format!("Server error: {}", e)))?;

    Ok(())
}
