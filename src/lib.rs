//! # Tilemark - Tiled Text Watermarks
//!
//! Tilemark stamps a repeating text watermark across an image. It provides:
//!
//! - **Layout**: a staggered grid of text placements sized from the image
//! - **Rendering**: outline fonts via `ab_glyph`, with a built-in bitmap fallback
//! - **Rotation**: bicubic rotation of the watermark layer about its center
//! - **Serving**: an upload page and a JSON API that store results as PNG
//!
//! ## Quick Start
//!
//! ```no_run
//! use tilemark::{Compositor, WatermarkSpec, font::FontSource};
//! use image::Rgb;
//!
//! let font = FontSource::Builtin.load()?;
//! let compositor = Compositor::new(font);
//!
//! let source = image::open("photo.jpg")
//!     .map_err(|e| tilemark::TilemarkError::Decode(e.to_string()))?;
//! let spec = WatermarkSpec::new("CONFIDENTIAL")
//!     .with_opacity(0.5)
//!     .with_color(Rgb([255, 0, 0]))
//!     .with_angle(30);
//!
//! let result = compositor.apply(&source, &spec)?;
//! result.image.save("photo-marked.png")
//!     .map_err(|e| tilemark::TilemarkError::Persist(e.to_string()))?;
//!
//! # Ok::<(), tilemark::TilemarkError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`watermark`] | Sizing, layout, rotation and compositing |
//! | [`font`] | Font resolution chain and glyph rendering |
//! | [`decode`] | Data-URI and image byte decoding |
//! | [`store`] | Persistence of generated images |
//! | [`server`] | HTTP server and upload page |
//! | [`error`] | Error types |

pub mod decode;
pub mod error;
pub mod font;
pub mod server;
pub mod store;
pub mod watermark;

// Re-exports for convenience
pub use error::TilemarkError;
pub use watermark::{Compositor, WatermarkSpec};
