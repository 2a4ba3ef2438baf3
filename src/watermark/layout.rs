//! # Tiling Layout
//!
//! Places watermark instances on a staggered ("brick wall") grid:
//!
//! ```text
//! +-----------------------------------+
//! |  TEXT        TEXT        TEXT     |   row 0
//! |        TEXT        TEXT        .. |   row 1, shifted by h_gap / 2
//! |  TEXT        TEXT        TEXT     |   row 2
//! +-----------------------------------+
//! ```
//!
//! Cells are `W / per_row` by `H / per_col`, with at least two cells per
//! axis. The text is centered in its cell with a 10px minimum margin. Tiles
//! that would overhang the image are skipped; if none survive, a single
//! centered instance is placed instead.

use crate::error::TilemarkError;
use crate::font::GlyphMetrics;

/// Ratio of cell size to text size.
pub const SPACING_FACTOR: f64 = 1.8;

/// Minimum distance of the first tile from the cell origin.
pub const MIN_MARGIN: f64 = 10.0;

/// Top-left corner of one watermark instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
}

impl Placement {
    /// Whole-pixel origin used when painting.
    pub fn origin(&self) -> (i64, i64) {
        (self.x.floor() as i64, self.y.floor() as i64)
    }
}

/// The computed grid and the instances that fit.
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayout {
    pub per_row: u32,
    pub per_col: u32,
    pub h_gap: f64,
    pub v_gap: f64,
    pub h_offset: f64,
    pub v_offset: f64,
    pub placements: Vec<Placement>,
    /// True when no grid tile fit and one centered instance was used.
    pub centered_fallback: bool,
}

/// Compute tile placements for text of size `text` on a `width × height` image.
pub fn plan(width: u32, height: u32, text: GlyphMetrics) -> Result<TileLayout, TilemarkError> {
    if text.width == 0 || text.height == 0 {
        return Err(TilemarkError::Layout(format!(
            "degenerate text size {}x{}",
            text.width, text.height
        )));
    }

    let (w, h) = (width as f64, height as f64);
    let (tw, th) = (text.width as f64, text.height as f64);

    let per_row = ((w / (tw * SPACING_FACTOR)).floor() as u32).max(2);
    let per_col = ((h / (th * SPACING_FACTOR)).floor() as u32).max(2);

    let h_gap = w / per_row as f64;
    let v_gap = h / per_col as f64;

    let h_offset = MIN_MARGIN.max((h_gap - tw) / 2.0);
    let v_offset = MIN_MARGIN.max((v_gap - th) / 2.0);

    let mut placements = Vec::new();
    for row in 0..per_col {
        for col in 0..per_row {
            let mut x = col as f64 * h_gap + h_offset;
            let y = row as f64 * v_gap + v_offset;

            if row % 2 == 1 {
                x += h_gap / 2.0;
            }

            if x >= 0.0 && y >= 0.0 && x + tw <= w && y + th <= h {
                placements.push(Placement { x, y });
            }
        }
    }

    let centered_fallback = placements.is_empty();
    if centered_fallback {
        placements.push(Placement {
            x: (width as i64 - text.width as i64).div_euclid(2) as f64,
            y: (height as i64 - text.height as i64).div_euclid(2) as f64,
        });
    }

    Ok(TileLayout {
        per_row,
        per_col,
        h_gap,
        v_gap,
        h_offset,
        v_offset,
        placements,
        centered_fallback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn metrics(width: u32, height: u32) -> GlyphMetrics {
        GlyphMetrics { width, height }
    }

    #[test]
    fn test_grid_dimensions() {
        let layout = plan(1000, 800, metrics(160, 80)).unwrap();
        // 1000 / 288 = 3.47, 800 / 144 = 5.55
        assert_eq!(layout.per_row, 3);
        assert_eq!(layout.per_col, 5);
        assert_eq!(layout.v_gap, 160.0);
        assert_eq!(layout.v_offset, 40.0);
        assert!((layout.h_gap - 333.333).abs() < 0.01);
        assert!(!layout.centered_fallback);
    }

    #[test]
    fn test_brick_wall_stagger() {
        let layout = plan(1000, 800, metrics(160, 80)).unwrap();
        let row0: Vec<_> = layout.placements.iter().filter(|p| p.y == 40.0).collect();
        let row1: Vec<_> = layout.placements.iter().filter(|p| p.y == 200.0).collect();

        assert_eq!(row0.len(), 3);
        // Third tile of the odd row overhangs the right edge and is dropped
        assert_eq!(row1.len(), 2);
        assert!((row1[0].x - (row0[0].x + layout.h_gap / 2.0)).abs() < 1e-9);
        assert_eq!(layout.placements.len(), 3 * 3 + 2 * 2);
    }

    #[test]
    fn test_all_tiles_inside_image() {
        for &(w, h, tw, th) in &[
            (1000, 800, 160, 80),
            (640, 480, 33, 17),
            (300, 2000, 120, 40),
            (4000, 3000, 900, 300),
            (57, 41, 11, 7),
        ] {
            let layout = plan(w, h, metrics(tw, th)).unwrap();
            if layout.centered_fallback {
                continue;
            }
            for p in &layout.placements {
                assert!(p.x >= 0.0 && p.y >= 0.0);
                assert!(p.x + tw as f64 <= w as f64, "{:?} overhangs {}x{}", p, w, h);
                assert!(p.y + th as f64 <= h as f64, "{:?} overhangs {}x{}", p, w, h);
            }
        }
    }

    #[test]
    fn test_minimum_two_per_axis() {
        let layout = plan(500, 500, metrics(400, 200)).unwrap();
        assert_eq!(layout.per_row, 2);
        assert_eq!(layout.per_col, 2);
        assert_eq!(layout.h_offset, MIN_MARGIN);
    }

    #[test]
    fn test_centered_fallback_for_huge_text() {
        let layout = plan(100, 100, metrics(95, 60)).unwrap();
        assert!(layout.centered_fallback);
        assert_eq!(layout.placements, vec![Placement { x: 2.0, y: 20.0 }]);
    }

    #[test]
    fn test_centered_fallback_can_be_negative() {
        let layout = plan(100, 100, metrics(151, 60)).unwrap();
        assert_eq!(layout.placements.len(), 1);
        // floor((100 - 151) / 2)
        assert_eq!(layout.placements[0].x, -26.0);
        assert_eq!(layout.placements[0].origin(), (-26, 20));
    }

    #[test]
    fn test_degenerate_metrics() {
        assert!(matches!(plan(100, 100, metrics(10, 0)), Err(TilemarkError::Layout(_))));
        assert!(matches!(plan(100, 100, metrics(0, 10)), Err(TilemarkError::Layout(_))));
    }

    #[test]
    fn test_origin_floors() {
        assert_eq!(Placement { x: 86.67, y: 40.0 }.origin(), (86, 40));
    }
}
