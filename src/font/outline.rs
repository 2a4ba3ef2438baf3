//! Outline (TTF/OTF/TTC) typeface rendering with ab_glyph.

use ab_glyph::{Font, FontArc, GlyphId, ScaleFont, point};
use image::{Rgba, RgbaImage};

use super::{GlyphMetrics, Typeface, blend_coverage};
use crate::error::TilemarkError;

/// An outline font loaded from disk.
pub struct OutlineTypeface {
    name: String,
    font: FontArc,
}

impl OutlineTypeface {
    /// Parse font bytes. Collections (`.ttc`) use their first face.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self, TilemarkError> {
        let name = name.into();
        let font = FontArc::try_from_vec(data)
            .map_err(|e| TilemarkError::Font(format!("Failed to parse {}: {}", name, e)))?;
        Ok(Self { name, font })
    }

    /// Glyph ids and caret positions for a single line, plus the total advance.
    fn layout(&self, text: &str, pixel_size: f32) -> (Vec<(GlyphId, f32)>, f32) {
        let scaled = self.font.as_scaled(pixel_size);
        let mut glyphs = Vec::with_capacity(text.len());
        let mut caret_x = 0.0f32;
        let mut previous: Option<GlyphId> = None;

        for ch in text.chars() {
            let glyph_id = self.font.glyph_id(ch);
            if let Some(prev) = previous {
                caret_x += scaled.kern(prev, glyph_id);
            }
            glyphs.push((glyph_id, caret_x));
            caret_x += scaled.h_advance(glyph_id);
            previous = Some(glyph_id);
        }

        (glyphs, caret_x)
    }
}

impl Typeface for OutlineTypeface {
    fn name(&self) -> &str {
        &self.name
    }

    fn measure(&self, text: &str, pixel_size: u32) -> GlyphMetrics {
        let px = pixel_size as f32;
        let scaled = self.font.as_scaled(px);
        let (_, advance) = self.layout(text, px);
        GlyphMetrics {
            width: advance.max(0.0).ceil() as u32,
            height: (scaled.ascent() - scaled.descent()).max(0.0).ceil() as u32,
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
        let px = pixel_size as f32;
        let scaled = self.font.as_scaled(px);
        let baseline_y = origin.1 as f32 + scaled.ascent();
        let (glyphs, _) = self.layout(text, px);

        // Overhanging ink (negative bearings, accents above the ascent) is
        // clipped to the measured line box.
        let metrics = self.measure(text, pixel_size);
        let (min_x, min_y) = origin;
        let max_x = min_x + metrics.width as i64;
        let max_y = min_y + metrics.height as i64;

        for (glyph_id, glyph_x) in glyphs {
            let position = point(origin.0 as f32 + glyph_x, baseline_y);
            let glyph = glyph_id.with_scale_and_position(px, position);

            if let Some(outlined) = self.font.outline_glyph(glyph) {
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let x = gx as i64 + bounds.min.x as i64;
                    let y = gy as i64 + bounds.min.y as i64;
                    if x >= min_x && x < max_x && y >= min_y && y < max_y {
                        blend_coverage(layer, x, y, ink, coverage);
                    }
                });
            }
        }
    }
}
