//! # Watermark Compositor
//!
//! Turns a source image plus a [`WatermarkSpec`] into a watermarked copy.
//!
//! ## Pipeline
//!
//! ```text
//! source ──► font size ──► measure / shrink ──► tile layout ──► draw layer
//!                                                                  │
//!            result ◄── alpha-over ◄── rotate layer (if angle≠0) ◄─┘
//! ```
//!
//! | Stage | Module |
//! |-------|--------|
//! | font size, auto-shrink | [`sizing`] |
//! | brick-wall tiling | [`layout`] |
//! | whole-layer rotation | [`rotate`] |
//! | alpha-over | [`composite`] |
//!
//! ## Example
//!
//! ```
//! use image::{DynamicImage, RgbImage};
//! use tilemark::font::FontSource;
//! use tilemark::watermark::{Compositor, WatermarkSpec};
//!
//! let font = FontSource::Builtin.load()?;
//! let compositor = Compositor::new(font);
//! let source = DynamicImage::ImageRgb8(RgbImage::new(400, 300));
//!
//! let spec = WatermarkSpec::new("DRAFT").with_angle(30);
//! let result = compositor.apply(&source, &spec)?;
//! assert_eq!(result.image.dimensions(), (400, 300));
//! # Ok::<(), tilemark::TilemarkError>(())
//! ```

pub mod composite;
pub mod layout;
pub mod rotate;
pub mod sizing;

use image::{DynamicImage, Rgb, Rgba, RgbaImage, imageops};
use tracing::{debug, warn};

use crate::error::TilemarkError;
use crate::font::{FontHandle, GlyphMetrics};
use layout::TileLayout;

/// Default font size, in percent of the image's shorter side.
pub const DEFAULT_FONT_SIZE_PERCENT: f64 = 10.0;

/// What to draw and how.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    /// Watermark text (non-empty)
    pub text: String,
    /// 0.0 (invisible) to 1.0 (opaque)
    pub opacity: f64,
    pub color: Rgb<u8>,
    /// Counter-clockwise degrees, interpreted mod 360
    pub angle: i32,
    /// Percent of the shorter image side
    pub font_size_percent: f64,
}

impl WatermarkSpec {
    /// Half-opaque white text, no rotation, default size.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            opacity: 0.5,
            color: Rgb([255, 255, 255]),
            angle: 0,
            font_size_percent: DEFAULT_FONT_SIZE_PERCENT,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_color(mut self, color: Rgb<u8>) -> Self {
        self.color = color;
        self
    }

    pub fn with_angle(mut self, angle: i32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_font_size_percent(mut self, percent: f64) -> Self {
        self.font_size_percent = percent;
        self
    }

    /// Check ranges; called by [`Compositor::apply`].
    pub fn validate(&self) -> Result<(), TilemarkError> {
        if self.text.trim().is_empty() {
            return Err(TilemarkError::InvalidRequest(
                "Watermark text must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(TilemarkError::InvalidRequest(format!(
                "Opacity must be between 0 and 100, got {}",
                self.opacity * 100.0
            )));
        }
        if !(self.font_size_percent.is_finite() && self.font_size_percent > 0.0) {
            return Err(TilemarkError::InvalidRequest(format!(
                "Font size must be a positive percent, got {}",
                self.font_size_percent
            )));
        }
        Ok(())
    }

    /// Ink alpha: `round(255 × opacity)`.
    pub fn alpha(&self) -> u8 {
        (255.0 * self.opacity).round().clamp(0.0, 255.0) as u8
    }

    fn ink(&self) -> Rgba<u8> {
        let [r, g, b] = self.color.0;
        Rgba([r, g, b, self.alpha()])
    }
}

/// Parse `#RRGGBB` (leading `#` optional).
pub fn parse_hex_color(value: &str) -> Result<Rgb<u8>, TilemarkError> {
    let hex = value.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    let invalid = || {
        TilemarkError::InvalidRequest(format!("Invalid color '{}', expected #RRGGBB", value))
    };

    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
    };
    Ok(Rgb([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
}

/// A finished watermark plus what the pipeline decided along the way.
#[derive(Debug, Clone)]
pub struct Watermarked {
    pub image: RgbaImage,
    pub font_size: u32,
    pub metrics: GlyphMetrics,
    pub layout: TileLayout,
    /// Number of watermark instances painted.
    pub drawn: usize,
    /// True when the built-in bitmap font was used.
    pub degraded_font: bool,
}

/// The watermark layer before compositing.
#[derive(Debug, Clone)]
pub struct RenderedLayer {
    pub layer: RgbaImage,
    pub font_size: u32,
    pub metrics: GlyphMetrics,
    pub layout: TileLayout,
}

/// Applies text watermarks with a fixed, startup-resolved typeface.
#[derive(Clone)]
pub struct Compositor {
    font: FontHandle,
}

impl Compositor {
    pub fn new(font: FontHandle) -> Self {
        Self { font }
    }

    pub fn font(&self) -> &FontHandle {
        &self.font
    }

    /// Size, tile and paint the watermark on a transparent `width × height`
    /// layer. Rotation is not applied here.
    ///
    /// The text is rasterized once and the result is stamped at every
    /// placement.
    pub fn render_layer(
        &self,
        width: u32,
        height: u32,
        spec: &WatermarkSpec,
    ) -> Result<RenderedLayer, TilemarkError> {
        let length = spec.text.chars().count();
        let base_size = sizing::base_font_size(width, height, spec.font_size_percent, length);
        let fitted = sizing::fit_text(self.font.as_ref(), &spec.text, base_size, width, height);
        debug!(
            font_size = fitted.font_size,
            text_width = fitted.metrics.width,
            text_height = fitted.metrics.height,
            "measured watermark text"
        );

        let layout = layout::plan(width, height, fitted.metrics)?;
        debug!(
            rows = layout.per_col,
            cols = layout.per_row,
            h_gap = layout.h_gap,
            v_gap = layout.v_gap,
            "watermark layout"
        );
        if layout.centered_fallback {
            debug!("no tile fits, using single centered watermark");
        }

        let mut layer = RgbaImage::new(width, height);
        let ink = spec.ink();
        if layout.centered_fallback {
            // A lone instance may overhang the image; paint it clipped in place
            for placement in &layout.placements {
                let origin = placement.origin();
                self.font.draw(&mut layer, &spec.text, fitted.font_size, origin, ink);
            }
        } else {
            // Grid tiles are in bounds, so the stamp is never larger than the layer
            let mut stamp = RgbaImage::new(fitted.metrics.width, fitted.metrics.height);
            self.font.draw(&mut stamp, &spec.text, fitted.font_size, (0, 0), ink);
            for placement in &layout.placements {
                let (x, y) = placement.origin();
                imageops::overlay(&mut layer, &stamp, x, y);
            }
        }
        debug!(drawn = layout.placements.len(), "drew watermarks");

        Ok(RenderedLayer {
            layer,
            font_size: fitted.font_size,
            metrics: fitted.metrics,
            layout,
        })
    }

    /// Watermark `source` according to `spec`.
    ///
    /// The source is only read. A failed rotation is logged and the
    /// unrotated layer is used instead.
    pub fn apply(
        &self,
        source: &DynamicImage,
        spec: &WatermarkSpec,
    ) -> Result<Watermarked, TilemarkError> {
        spec.validate()?;
        let (width, height) = (source.width(), source.height());
        if width == 0 || height == 0 {
            return Err(TilemarkError::Decode("image has no pixels".to_string()));
        }

        debug!(
            text = %spec.text,
            opacity = spec.opacity,
            color = ?spec.color.0,
            angle = spec.angle,
            font_size_percent = spec.font_size_percent,
            "watermark parameters"
        );
        let degraded_font = self.font.is_fallback();
        if degraded_font {
            warn!(font = self.font.name(), "rendering with fallback font, quality degraded");
        }

        let rendered = self.render_layer(width, height, spec)?;

        let layer = if spec.angle.rem_euclid(360) != 0 {
            debug!(angle = spec.angle, "rotating watermark layer");
            match rotate::rotate_layer(&rendered.layer, spec.angle) {
                Ok(rotated) => rotated,
                Err(e) => {
                    warn!(error = %e, "rotation failed, keeping unrotated layer");
                    rendered.layer
                }
            }
        } else {
            rendered.layer
        };

        let image = composite::composite(source, &layer)?;

        Ok(Watermarked {
            image,
            font_size: rendered.font_size,
            metrics: rendered.metrics,
            drawn: rendered.layout.placements.len(),
            layout: rendered.layout,
            degraded_font,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontSource;
    use crate::watermark::sizing::tests::SquareTypeface;
    use image::RgbImage;
    use std::sync::Arc;

    fn builtin() -> Compositor {
        Compositor::new(FontSource::Builtin.load().unwrap())
    }

    fn gray(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF0000").unwrap(), Rgb([255, 0, 0]));
        assert_eq!(parse_hex_color("00ff7f").unwrap(), Rgb([0, 255, 127]));
        assert!(parse_hex_color("#FF00").is_err());
        assert!(parse_hex_color("#GG0000").is_err());
        assert!(parse_hex_color("#ÿÿÿ").is_err());
    }

    #[test]
    fn test_alpha_rounds() {
        assert_eq!(WatermarkSpec::new("x").with_opacity(0.5).alpha(), 128);
        assert_eq!(WatermarkSpec::new("x").with_opacity(1.0).alpha(), 255);
        assert_eq!(WatermarkSpec::new("x").with_opacity(0.0).alpha(), 0);
    }

    #[test]
    fn test_validate() {
        assert!(WatermarkSpec::new("ok").validate().is_ok());
        assert!(WatermarkSpec::new("  ").validate().is_err());
        assert!(WatermarkSpec::new("x").with_opacity(1.5).validate().is_err());
        assert!(WatermarkSpec::new("x").with_font_size_percent(0.0).validate().is_err());
    }

    #[test]
    fn test_result_keeps_dimensions() {
        let compositor = builtin();
        for &(w, h) in &[(1000, 800), (37, 211), (1, 1), (640, 480)] {
            for angle in [0, 45, -30] {
                let spec = WatermarkSpec::new("CONFIDENTIAL").with_angle(angle);
                let result = compositor.apply(&gray(w, h), &spec).unwrap();
                assert_eq!(result.image.dimensions(), (w, h));
                assert!(result.drawn >= 1);
            }
        }
    }

    #[test]
    fn test_layer_transparent_outside_glyphs() {
        let compositor = Compositor::new(Arc::new(SquareTypeface { zero_width: false }));
        let spec = WatermarkSpec::new("AB").with_opacity(1.0);
        let rendered = compositor.render_layer(400, 300, &spec).unwrap();

        let (tw, th) = (rendered.metrics.width as i64, rendered.metrics.height as i64);
        for (x, y, px) in rendered.layer.enumerate_pixels() {
            let inside = rendered.layout.placements.iter().any(|p| {
                let (ox, oy) = p.origin();
                (x as i64) >= ox && (x as i64) < ox + tw && (y as i64) >= oy && (y as i64) < oy + th
            });
            if !inside {
                assert_eq!(px[3], 0, "stray ink at ({}, {})", x, y);
            } else {
                assert_eq!(px[3], 255);
            }
        }
    }

    #[test]
    fn test_zero_angle_layer_untouched() {
        let compositor = builtin();
        let spec = WatermarkSpec::new("TEST");
        let rendered = compositor.render_layer(300, 200, &spec).unwrap();
        let rotated = rotate::rotate_layer(&rendered.layer, 0).unwrap();
        assert_eq!(rotated, rendered.layer);
    }

    #[test]
    fn test_source_not_mutated() {
        let compositor = builtin();
        let source = gray(120, 90);
        let before = source.clone();
        compositor
            .apply(&source, &WatermarkSpec::new("X").with_opacity(1.0))
            .unwrap();
        assert_eq!(source, before);
    }

    #[test]
    fn test_watermark_changes_pixels_with_color() {
        let compositor = builtin();
        let spec = WatermarkSpec::new("TEST")
            .with_opacity(1.0)
            .with_color(Rgb([255, 0, 0]));
        let result = compositor.apply(&gray(1000, 800), &spec).unwrap();
        assert!(result.image.pixels().any(|p| p.0 == [255, 0, 0, 255]));
        assert!(result.degraded_font);
    }

    #[test]
    fn test_huge_font_percent_is_bounded() {
        let compositor = builtin();
        let spec = WatermarkSpec::new("TEST").with_font_size_percent(1e9);
        assert!(spec.validate().is_ok());

        let result = compositor.apply(&gray(1000, 800), &spec).unwrap();
        assert_eq!(result.image.dimensions(), (1000, 800));
        assert!(result.font_size <= 400);
        assert!(result.metrics.width <= 900);
        assert!(result.drawn >= 1);
    }

    #[test]
    fn test_stamped_layer_matches_direct_drawing() {
        let compositor = builtin();
        let spec = WatermarkSpec::new("Tile").with_opacity(1.0).with_color(Rgb([0, 90, 200]));
        let rendered = compositor.render_layer(640, 480, &spec).unwrap();
        assert!(!rendered.layout.centered_fallback);

        let mut expected = RgbaImage::new(640, 480);
        for placement in &rendered.layout.placements {
            compositor.font().draw(
                &mut expected,
                &spec.text,
                rendered.font_size,
                placement.origin(),
                spec.ink(),
            );
        }
        assert!(rendered.layer == expected);
    }

    #[test]
    fn test_tiny_font_on_large_image() {
        let compositor = builtin();
        let spec = WatermarkSpec::new("TEST").with_font_size_percent(0.01);
        let rendered = compositor.render_layer(2000, 2000, &spec).unwrap();
        assert_eq!(rendered.font_size, 1);
        assert!(rendered.layout.placements.len() > 100_000);
        assert_eq!(rendered.layer.dimensions(), (2000, 2000));
    }

    #[test]
    fn test_oversized_text_still_drawn() {
        let compositor = builtin();
        let spec = WatermarkSpec::new("W").with_font_size_percent(400.0);
        let result = compositor.apply(&gray(50, 50), &spec).unwrap();
        assert!(result.font_size < 200);
        assert!(result.drawn >= 1);
    }
}
