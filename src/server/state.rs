//! Server state and configuration.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::TilemarkError;
use crate::font::{FontConfig, FontHandle};
use crate::store::ResultStore;
use crate::watermark::Compositor;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:5000")
    pub listen_addr: String,
    /// Directory generated images are written to
    pub results_dir: PathBuf,
    /// Font resolution settings
    pub fonts: FontConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".to_string(),
            results_dir: PathBuf::from("static/results"),
            fonts: FontConfig::default(),
        }
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub compositor: Compositor,
    pub store: ResultStore,
    /// Unix timestamp of server boot for cache busting.
    pub boot_time: u64,
}

impl AppState {
    /// Build state around an already-resolved font, creating the results
    /// directory if needed.
    pub fn new(config: &ServerConfig, font: FontHandle) -> Result<Self, TilemarkError> {
        let store = ResultStore::open(&config.results_dir)?;
        let boot_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(Self {
            compositor: Compositor::new(font),
            store,
            boot_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontSource;

    #[test]
    fn test_new_creates_results_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            results_dir: dir.path().join("nested").join("results"),
            ..ServerConfig::default()
        };
        let font = FontSource::Builtin.load().unwrap();

        let state = AppState::new(&config, font).unwrap();
        assert!(config.results_dir.is_dir());
        assert!(state.boot_time > 0);
    }
}
