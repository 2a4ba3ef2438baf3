//! Font size selection and the single-pass auto-shrink.

use tracing::debug;

use crate::decode::MAX_IMAGE_SIDE;
use crate::font::{GlyphMetrics, Typeface, char_count};

/// Texts longer than this many characters get a smaller font.
pub const LONG_TEXT_THRESHOLD: usize = 10;

/// Floor for the long-text percent adjustment.
pub const MIN_LONG_TEXT_PERCENT: f64 = 3.0;

/// Text may span at most this fraction of the image width...
pub const MAX_WIDTH_FRACTION: f64 = 0.9;

/// ...and this fraction of the image height.
pub const MAX_HEIGHT_FRACTION: f64 = 0.5;

/// Upper bound for the candidate font size. Anything larger than the
/// largest image side is shrunk by [`fit_text`] anyway.
pub const MAX_FONT_SIZE: u32 = MAX_IMAGE_SIDE;

/// Percent of the shorter image side actually used for the font size.
///
/// Long strings shrink to `max(3, percent * 7 / length)`.
pub fn effective_percent(percent: f64, length: usize) -> f64 {
    if length > LONG_TEXT_THRESHOLD {
        MIN_LONG_TEXT_PERCENT.max(percent * 7.0 / length as f64)
    } else {
        percent
    }
}

/// Candidate pixel font size before measurement, in `1..=MAX_FONT_SIZE`.
pub fn base_font_size(width: u32, height: u32, percent: f64, length: usize) -> u32 {
    let shorter = width.min(height) as f64;
    let adjusted = effective_percent(percent, length);
    let size = (shorter * adjusted / 100.0)
        .floor()
        .clamp(1.0, MAX_FONT_SIZE as f64) as u32;
    debug!(percent, adjusted, size, "computed font size");
    size
}

/// Font size and metrics after fitting the text to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FittedText {
    pub font_size: u32,
    pub metrics: GlyphMetrics,
    pub shrunk: bool,
}

/// Measure, substituting `size * length` for a zero width.
pub fn measure(face: &dyn Typeface, text: &str, font_size: u32) -> GlyphMetrics {
    let mut metrics = face.measure(text, font_size);
    if metrics.width == 0 {
        metrics.width = font_size.saturating_mul(char_count(text));
        debug!(width = metrics.width, "measured zero width, using estimate");
    }
    metrics
}

/// Measure the text and shrink it once if it is too large for the image.
///
/// Too large means wider than 90% of the image or taller than half of it.
/// This is a single correction, not iterated: the remeasured result is
/// accepted even if it is still oversized. The returned size never exceeds
/// `font_size`.
pub fn fit_text(
    face: &dyn Typeface,
    text: &str,
    font_size: u32,
    width: u32,
    height: u32,
) -> FittedText {
    let metrics = measure(face, text, font_size);
    let max_w = width as f64 * MAX_WIDTH_FRACTION;
    let max_h = height as f64 * MAX_HEIGHT_FRACTION;

    if (metrics.width as f64) <= max_w && (metrics.height as f64) <= max_h {
        return FittedText {
            font_size,
            metrics,
            shrunk: false,
        };
    }

    let scale_w = max_w / metrics.width.max(1) as f64;
    let scale_h = max_h / metrics.height.max(1) as f64;
    let scale = scale_w.min(scale_h);
    let new_size = ((font_size as f64 * scale).floor() as u32).clamp(1, font_size);
    debug!(from = font_size, to = new_size, "text too large, shrinking font");

    FittedText {
        font_size: new_size,
        metrics: measure(face, text, new_size),
        shrunk: true,
    }
}
