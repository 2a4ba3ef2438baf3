//! Alpha-over compositing of the watermark layer onto the source.

use image::{DynamicImage, RgbaImage, imageops};

use crate::error::TilemarkError;

/// Blend `layer` over `source` (converted to RGBA) using per-pixel alpha.
///
/// The layer must match the source dimensions.
pub fn composite(source: &DynamicImage, layer: &RgbaImage) -> Result<RgbaImage, TilemarkError> {
    if (source.width(), source.height()) != layer.dimensions() {
        return Err(TilemarkError::Composite(format!(
            "layer is {}x{} but image is {}x{}",
            layer.width(),
            layer.height(),
            source.width(),
            source.height()
        )));
    }

    let mut base = source.to_rgba8();
    imageops::overlay(&mut base, layer, 0, 0);
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    #[test]
    fn test_rgb_source_gains_alpha() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([10, 20, 30])));
        let layer = RgbaImage::new(8, 6);

        let out = composite(&source, &layer).unwrap();
        assert_eq!(out.dimensions(), (8, 6));
        assert_eq!(*out.get_pixel(3, 3), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_opaque_layer_pixel_wins() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 0, 255])));
        let mut layer = RgbaImage::new(4, 4);
        layer.put_pixel(1, 2, Rgba([255, 0, 0, 255]));

        let out = composite(&source, &layer).unwrap();
        assert_eq!(*out.get_pixel(1, 2), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_half_transparent_layer_blends() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])));
        let layer = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 128]));

        let out = composite(&source, &layer).unwrap();
        let px = out.get_pixel(0, 0);
        assert!((126..=130).contains(&px[0]), "got {:?}", px);
        assert_eq!(px[3], 255);
    }

    #[test]
    fn test_size_mismatch() {
        let source = DynamicImage::ImageRgb8(RgbImage::new(4, 4));
        let layer = RgbaImage::new(5, 4);
        assert!(matches!(composite(&source, &layer), Err(TilemarkError::Composite(_))));
    }
}
