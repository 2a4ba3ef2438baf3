//! # Typefaces and Font Resolution
//!
//! Watermark text is measured and painted through the [`Typeface`] trait.
//! Two implementations exist:
//!
//! | Typeface | Backing | Notes |
//! |----------|---------|-------|
//! | [`OutlineTypeface`] | ab_glyph (TTF/OTF/TTC) | anti-aliased, any glyph in the file |
//! | [`BitmapTypeface`] | Spleen 12x24 | built in, scaled nearest-neighbor, ASCII-ish coverage |
//!
//! A font is resolved once at startup from an ordered list of [`FontSource`]
//! strategies (first success wins) and the resulting [`FontHandle`] is shared
//! by every request.
//!
//! ## Example
//!
//! ```
//! use tilemark::font::{FontSource, resolve};
//!
//! let font = resolve(&[
//!     FontSource::File("/nonexistent/font.otf".into()),
//!     FontSource::Builtin,
//! ])?;
//! assert!(font.is_fallback());
//! # Ok::<(), tilemark::TilemarkError>(())
//! ```

mod bitmap;
pub mod fetch;
mod outline;

pub use bitmap::BitmapTypeface;
pub use outline::OutlineTypeface;

use image::{Pixel, Rgba, RgbaImage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::TilemarkError;

/// Default download location of the CJK font used for watermarks.
pub const DEFAULT_FONT_URL: &str = concat!(
    "https://github.com/adobe-fonts/source-han-sans/raw/release/",
    "OTF/SimplifiedChinese/SourceHanSansSC-Bold.otf"
);

/// File name the downloaded font is cached under.
pub const CACHED_FONT_FILE: &str = "SourceHanSansSC-Bold.otf";

/// Well-known CJK-capable system fonts, in preference order.
pub const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Bold.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
    "/System/Library/Fonts/PingFang.ttc",
    "C:\\Windows\\Fonts\\simhei.ttf",
    "C:\\Windows\\Fonts\\msyh.ttc",
    "C:\\Windows\\Fonts\\simkai.ttf",
    "C:\\Windows\\Fonts\\simsun.ttc",
];

/// Rendered size of a text string at a given pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphMetrics {
    pub width: u32,
    pub height: u32,
}

/// Text measurement and painting capability.
///
/// `draw` places the top-left corner of the text's line box at `origin`,
/// so a string drawn at `(x, y)` occupies `[x, x + width) × [y, y + height)`
/// as reported by `measure` for the same size.
pub trait Typeface: Send + Sync {
    /// Human-readable name (file path or built-in name) for logs.
    fn name(&self) -> &str;

    /// True for the degraded built-in typeface.
    fn is_fallback(&self) -> bool {
        false
    }

    /// Measure `text` rendered at `pixel_size`.
    fn measure(&self, text: &str, pixel_size: u32) -> GlyphMetrics;

    /// Paint `text` into `layer`, scaling `ink`'s alpha by glyph coverage.
    /// Pixels outside the layer are clipped.
    fn draw(
        &self,
        layer: &mut RgbaImage,
        text: &str,
        pixel_size: u32,
        origin: (i64, i64),
        ink: Rgba<u8>,
    );
}

/// Shared, immutable handle to the resolved typeface.
pub type FontHandle = Arc<dyn Typeface>;

/// One strategy in the font resolution chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    /// An outline font file on disk
    File(PathBuf),
    /// The built-in Spleen bitmap font
    Builtin,
}

impl FontSource {
    /// Load this source into a typeface.
    pub fn load(&self) -> Result<FontHandle, TilemarkError> {
        match self {
            FontSource::File(path) => {
                let data = std::fs::read(path)?;
                let face = OutlineTypeface::from_bytes(path.display().to_string(), data)?;
                Ok(Arc::new(face))
            }
            FontSource::Builtin => Ok(Arc::new(BitmapTypeface::new()?)),
        }
    }
}

/// Try each source in order and return the first that loads.
///
/// Missing files are skipped quietly; files that exist but fail to parse
/// are logged as warnings. Falling through to the built-in bitmap font is
/// reported as degraded quality.
pub fn resolve(sources: &[FontSource]) -> Result<FontHandle, TilemarkError> {
    for source in sources {
        if let FontSource::File(path) = source {
            if !path.exists() {
                debug!(path = %path.display(), "font candidate not present");
                continue;
            }
        }

        match source.load() {
            Ok(face) => {
                if face.is_fallback() {
                    warn!(
                        "no outline font available, using built-in bitmap font \
                         (quality degraded, CJK unsupported)"
                    );
                } else {
                    info!(font = face.name(), "loaded watermark font");
                }
                return Ok(face);
            }
            Err(e) => warn!(source = ?source, error = %e, "failed to load font candidate"),
        }
    }

    Err(TilemarkError::Font(format!(
        "none of {} font candidates could be loaded",
        sources.len()
    )))
}

/// Font settings shared by the server and the CLI.
#[derive(Debug, Clone)]
pub struct FontConfig {
    /// Directory the downloaded font is cached in.
    pub cache_dir: PathBuf,
    /// Where to download the preferred font from.
    pub download_url: String,
    /// Whether to download the preferred font when it is missing.
    pub download: bool,
    /// Extra font files to try after the cached font.
    pub extra_paths: Vec<PathBuf>,
    /// Whether the built-in bitmap font may be used as last resort.
    pub builtin: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("static/fonts"),
            download_url: DEFAULT_FONT_URL.to_string(),
            download: true,
            extra_paths: Vec::new(),
            builtin: true,
        }
    }
}

impl FontConfig {
    /// Path of the cached download.
    pub fn cached_font_path(&self) -> PathBuf {
        self.cache_dir.join(CACHED_FONT_FILE)
    }

    /// The resolution chain: cached download, user paths, system paths, built-in.
    pub fn sources(&self) -> Vec<FontSource> {
        let mut sources = vec![FontSource::File(self.cached_font_path())];
        sources.extend(self.extra_paths.iter().cloned().map(FontSource::File));
        sources.extend(
            SYSTEM_FONT_PATHS
                .iter()
                .map(|p| FontSource::File(PathBuf::from(p))),
        );
        if self.builtin {
            sources.push(FontSource::Builtin);
        }
        sources
    }
}

/// Startup initialization: fetch the preferred font if needed, then resolve.
///
/// The download is best effort; any failure there only means the chain
/// falls through to later candidates.
pub async fn init(config: &FontConfig) -> Result<FontHandle, TilemarkError> {
    if config.download {
        fetch::ensure_font(&config.download_url, &config.cached_font_path()).await;
    }
    resolve(&config.sources())
}

/// Character count, saturating at `u32::MAX`.
pub(crate) fn char_count(text: &str) -> u32 {
    u32::try_from(text.chars().count()).unwrap_or(u32::MAX)
}

/// Blend `ink` at `(x, y)` with its alpha scaled by `coverage` (0.0..=1.0).
pub(crate) fn blend_coverage(layer: &mut RgbaImage, x: i64, y: i64, ink: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= layer.width() as i64 || y >= layer.height() as i64 {
        return;
    }
    let alpha = (ink[3] as f32 * coverage.clamp(0.0, 1.0)).round() as u8;
    if alpha == 0 {
        return;
    }
    let src = Rgba([ink[0], ink[1], ink[2], alpha]);
    layer.get_pixel_mut(x as u32, y as u32).blend(&src);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_skips_missing_files() {
        let font = resolve(&[
            FontSource::File(PathBuf::from("/definitely/not/here.otf")),
            FontSource::Builtin,
        ])
        .unwrap();
        assert!(font.is_fallback());
    }

    #[test]
    fn test_resolve_skips_unparseable_files() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.ttf");
        std::fs::write(&bogus, b"not a font at all").unwrap();

        let font = resolve(&[FontSource::File(bogus), FontSource::Builtin]).unwrap();
        assert_eq!(font.name(), "spleen-12x24");
    }

    #[test]
    fn test_resolve_empty_chain_is_font_error() {
        let err = resolve(&[]).err().unwrap();
        assert!(matches!(err, TilemarkError::Font(_)));

        let err = resolve(&[FontSource::File(PathBuf::from("/nope.ttf"))])
            .err()
            .unwrap();
        assert!(matches!(err, TilemarkError::Font(_)));
    }

    #[test]
    fn test_sources_order() {
        let config = FontConfig {
            cache_dir: PathBuf::from("/cache"),
            extra_paths: vec![PathBuf::from("/mine.ttf")],
            ..Default::default()
        };
        let sources = config.sources();
        assert_eq!(
            sources[0],
            FontSource::File(PathBuf::from("/cache").join(CACHED_FONT_FILE))
        );
        assert_eq!(sources[1], FontSource::File(PathBuf::from("/mine.ttf")));
        assert_eq!(sources.last(), Some(&FontSource::Builtin));
        assert_eq!(sources.len(), 3 + SYSTEM_FONT_PATHS.len());
    }

    #[test]
    fn test_sources_without_builtin() {
        let config = FontConfig {
            builtin: false,
            ..Default::default()
        };
        assert!(!config.sources().contains(&FontSource::Builtin));
    }

    #[test]
    fn test_blend_coverage_clips_and_scales() {
        let mut layer = RgbaImage::new(4, 4);
        let ink = Rgba([255, 0, 0, 200]);

        blend_coverage(&mut layer, -1, 0, ink, 1.0);
        blend_coverage(&mut layer, 4, 4, ink, 1.0);
        assert!(layer.pixels().all(|p| p[3] == 0));

        blend_coverage(&mut layer, 1, 1, ink, 0.5);
        let px = layer.get_pixel(1, 1);
        assert_eq!(px[0], 255);
        assert_eq!(px[3], 100);
    }
}
