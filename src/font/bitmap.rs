//! Built-in fallback typeface.
//!
//! Uses the Spleen 12x24 bitmap font, scaled nearest-neighbor to the requested
//! pixel height (cells keep the 1:2 aspect). Characters Spleen lacks are drawn
//! as a box outline.

use image::{Rgba, RgbaImage};
use spleen_font::{FONT_12X24, PSF2Font};
use std::sync::Mutex;

use super::{GlyphMetrics, Typeface, blend_coverage, char_count};
use crate::error::TilemarkError;

const CELL_WIDTH: usize = 12;
const CELL_HEIGHT: usize = 24;

/// The built-in Spleen bitmap typeface.
pub struct BitmapTypeface {
    /// Glyph lookup keeps a small cache, hence `&mut` and the lock.
    font: Mutex<PSF2Font<'static>>,
}

impl BitmapTypeface {
    /// Parse the embedded font data.
    pub fn new() -> Result<Self, TilemarkError> {
        let font = PSF2Font::new(FONT_12X24).map_err(|e| {
            TilemarkError::Font(format!("built-in Spleen font data is invalid: {}", e))
        })?;
        Ok(Self {
            font: Mutex::new(font),
        })
    }

    /// Cell size at a given pixel height.
    fn cell(pixel_size: u32) -> (u32, u32) {
        let height = pixel_size.max(1);
        let width = ((height as f32) * CELL_WIDTH as f32 / CELL_HEIGHT as f32).round() as u32;
        (width.max(1), height)
    }

    /// 12x24 on/off bitmap for one character.
    fn glyph(font: &mut PSF2Font, ch: char) -> Vec<bool> {
        let mut bitmap = vec![false; CELL_WIDTH * CELL_HEIGHT];
        let utf8 = ch.to_string();

        match font.glyph_for_utf8(utf8.as_bytes()) {
            Some(glyph) => {
                for (row_y, row) in glyph.enumerate() {
                    for (col_x, on) in row.enumerate() {
                        if row_y < CELL_HEIGHT && col_x < CELL_WIDTH {
                            bitmap[row_y * CELL_WIDTH + col_x] = on;
                        }
                    }
                }
            }
            None if ch.is_whitespace() => {}
            None => draw_box(&mut bitmap),
        }

        bitmap
    }
}

impl Typeface for BitmapTypeface {
    fn name(&self) -> &str {
        "spleen-12x24"
    }

    fn is_fallback(&self) -> bool {
        true
    }

    fn measure(&self, text: &str, pixel_size: u32) -> GlyphMetrics {
        let (cell_w, cell_h) = Self::cell(pixel_size);
        GlyphMetrics {
            width: cell_w.saturating_mul(char_count(text)),
            height: cell_h,
        }
    }

    fn draw(
        &self,
        layer: &mut RgbaImage,
        text: &str,
        pixel_size: u32,
        origin: (i64, i64),
        ink: Rgba<u8>,
    ) {
        // A panic elsewhere cannot leave the glyph cache inconsistent
        let mut font = self.font.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (cell_w, cell_h) = Self::cell(pixel_size);

        for (i, ch) in text.chars().enumerate() {
            let bitmap = Self::glyph(&mut font, ch);
            let left = origin.0 + i as i64 * cell_w as i64;

            for dy in 0..cell_h as usize {
                let sy = dy * CELL_HEIGHT / cell_h as usize;
                for dx in 0..cell_w as usize {
                    let sx = dx * CELL_WIDTH / cell_w as usize;
                    if bitmap[sy * CELL_WIDTH + sx] {
                        blend_coverage(layer, left + dx as i64, origin.1 + dy as i64, ink, 1.0);
                    }
                }
            }
        }
    }
}

/// Box outline for characters the font does not cover.
fn draw_box(bitmap: &mut [bool]) {
    for x in 1..CELL_WIDTH - 1 {
        bitmap[2 * CELL_WIDTH + x] = true;
        bitmap[(CELL_HEIGHT - 3) * CELL_WIDTH + x] = true;
    }
    for y in 2..CELL_HEIGHT - 2 {
        bitmap[y * CELL_WIDTH + 1] = true;
        bitmap[y * CELL_WIDTH + CELL_WIDTH - 2] = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_scales_with_size() {
        let face = BitmapTypeface::new().unwrap();
        assert_eq!(face.measure("TEST", 24), GlyphMetrics { width: 48, height: 24 });
        assert_eq!(face.measure("TEST", 80), GlyphMetrics { width: 160, height: 80 });
        assert_eq!(face.measure("", 80).width, 0);
    }

    #[test]
    fn test_measure_saturates_at_huge_sizes() {
        let face = BitmapTypeface::new().unwrap();
        let metrics = face.measure("TEST", u32::MAX);
        assert_eq!(metrics.width, u32::MAX);
        assert_eq!(metrics.height, u32::MAX);
    }

    #[test]
    fn test_draw_stays_inside_measured_box() {
        let face = BitmapTypeface::new().unwrap();
        let mut layer = RgbaImage::new(200, 100);
        let metrics = face.measure("Hi", 40);

        face.draw(&mut layer, "Hi", 40, (30, 20), Rgba([0, 0, 255, 255]));

        let mut painted = 0;
        for (x, y, px) in layer.enumerate_pixels() {
            if px[3] > 0 {
                painted += 1;
                assert!(x >= 30 && x < 30 + metrics.width, "x={} outside box", x);
                assert!(y >= 20 && y < 20 + metrics.height, "y={} outside box", y);
            }
        }
        assert!(painted > 0);
    }

    #[test]
    fn test_unknown_char_draws_box() {
        let face = BitmapTypeface::new().unwrap();
        let mut layer = RgbaImage::new(48, 48);
        face.draw(&mut layer, "水", 24, (0, 0), Rgba([0, 0, 0, 255]));
        assert!(layer.pixels().any(|p| p[3] == 255));
    }

    #[test]
    fn test_draw_clips_at_edges() {
        let face = BitmapTypeface::new().unwrap();
        let mut layer = RgbaImage::new(10, 10);
        face.draw(&mut layer, "WWWW", 48, (-20, -20), Rgba([255, 255, 255, 128]));
        assert_eq!(layer.dimensions(), (10, 10));
    }
}
