//! # Error Types
//!
//! This module defines the error type used throughout the tilemark library.
//! Every pipeline stage maps its failures into one variant, and the HTTP layer
//! turns any of them into a short `success=false` message.

use thiserror::Error;

/// Main error type for tilemark operations
#[derive(Debug, Error)]
pub enum TilemarkError {
    /// Malformed or undecodable image payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// No usable typeface could be resolved
    #[error("Font error: {0}")]
    Font(String),

    /// Tiling or glyph placement failed
    #[error("Layout error: {0}")]
    Layout(String),

    /// Blending the watermark layer onto the source failed
    #[error("Composite error: {0}")]
    Composite(String),

    /// Writing or reading a stored result failed
    #[error("Persist error: {0}")]
    Persist(String),

    /// Request parameters out of range or unparseable
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Listener or task failures in the HTTP server
    #[error("Server error: {0}")]
    Server(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TilemarkError {
    /// Short, human-readable message suitable for an API response.
    ///
    /// Details stay in the logs; clients only learn which stage failed,
    /// except for request validation where the reason is the useful part.
    pub fn user_message(&self) -> String {
        match self {
            TilemarkError::Decode(_) => "Failed to load image".to_string(),
            TilemarkError::Font(_) => "Failed to load font".to_string(),
            TilemarkError::Layout(_) => "Failed to draw watermark".to_string(),
            TilemarkError::Composite(_) => "Failed to merge watermark layer".to_string(),
            TilemarkError::Persist(_) => "Failed to save watermarked image".to_string(),
            TilemarkError::InvalidRequest(reason) => reason.clone(),
            TilemarkError::Server(_) | TilemarkError::Io(_) => "Internal error".to_string(),
        }
    }
}
