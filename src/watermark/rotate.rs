//! # Layer Rotation
//!
//! The whole watermark layer is rotated at once. Conceptually the layer is
//! pasted into the center of a square transparent canvas whose side is the
//! layer's diagonal, the canvas is rotated about its center with bicubic
//! resampling, and the original-size region is cropped back out of the
//! middle. Only that cropped region is ever computed: each output pixel is
//! inverse-mapped straight into the layer, and taps that land in the padding
//! read as transparent. Corners never clip because the diagonal canvas
//! contains the layer under every angle.
//!
//! Positive angles rotate counter-clockwise on screen.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::decode::MAX_IMAGE_SIDE;
use crate::error::TilemarkError;

/// Keys cubic convolution parameter.
const CUBIC_A: f64 = -0.5;

/// Diagonal of the largest decodable image.
const MAX_CANVAS_SIDE: u32 = 23_171;

/// Rotate `layer` by `angle` degrees (interpreted mod 360).
///
/// Multiples of 360 return an unchanged copy.
pub fn rotate_layer(layer: &RgbaImage, angle: i32) -> Result<RgbaImage, TilemarkError> {
    let normalized = angle.rem_euclid(360);
    if normalized == 0 {
        return Ok(layer.clone());
    }

    let (width, height) = layer.dimensions();
    let side = padded_side(width, height)?;
    let left = (side - width) / 2;
    let top = (side - height) / 2;

    // Canvas center, in layer coordinates
    let cx = side as f64 / 2.0 - left as f64;
    let cy = side as f64 / 2.0 - top as f64;

    Ok(rotate_about(layer, cx, cy, normalized as f64))
}

/// `ceil(sqrt(w² + h²))`, bounded by the largest image we accept.
fn padded_side(width: u32, height: u32) -> Result<u32, TilemarkError> {
    let (w, h) = (width as f64, height as f64);
    let side = (w * w + h * h).sqrt().ceil();
    if side > MAX_CANVAS_SIDE as f64 {
        return Err(TilemarkError::Layout(format!(
            "rotation canvas of {}px per side exceeds {}px (images are limited to {}px per side)",
            side, MAX_CANVAS_SIDE, MAX_IMAGE_SIDE
        )));
    }
    Ok((side as u32).max(width).max(height))
}

/// Rotate `src` about `(cx, cy)` into an image of the same size; uncovered
/// pixels are transparent.
fn rotate_about(src: &RgbaImage, cx: f64, cy: f64, degrees: f64) -> RgbaImage {
    let (width, height) = src.dimensions();
    let (sin_a, cos_a) = degrees.to_radians().sin_cos();

    let mut out = RgbaImage::new(width, height);
    let stride = width as usize * 4;
    let pixels: &mut [u8] = &mut out;

    pixels.par_chunks_mut(stride).enumerate().for_each(|(dy, row)| {
        let y_rel = dy as f64 + 0.5 - cy;
        for dx in 0..width as usize {
            let x_rel = dx as f64 + 0.5 - cx;

            // Inverse mapping: destination pixel center back into the source
            let sx = cos_a * x_rel - sin_a * y_rel + cx - 0.5;
            let sy = sin_a * x_rel + cos_a * y_rel + cy - 0.5;

            let px = sample_bicubic(src, sx, sy);
            row[dx * 4..dx * 4 + 4].copy_from_slice(&px.0);
        }
    });

    out
}

/// Weights for the four taps around a sample at fractional offset `f`.
fn cubic_taps(f: f64) -> [f64; 4] {
    [cubic_weight(f + 1.0), cubic_weight(f), cubic_weight(1.0 - f), cubic_weight(2.0 - f)]
}

/// Keys cubic convolution kernel.
fn cubic_weight(t: f64) -> f64 {
    let t = t.abs();
    if t <= 1.0 {
        (CUBIC_A + 2.0) * t * t * t - (CUBIC_A + 3.0) * t * t + 1.0
    } else if t < 2.0 {
        CUBIC_A * t * t * t - 5.0 * CUBIC_A * t * t + 8.0 * CUBIC_A * t - 4.0 * CUBIC_A
    } else {
        0.0
    }
}

/// Bicubic sample at pixel coordinates `(x, y)` (pixel centers on integers).
///
/// Interpolates premultiplied color; taps outside the image are transparent.
fn sample_bicubic(src: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let (width, height) = src.dimensions();
    if x < -2.0 || y < -2.0 || x > width as f64 + 1.0 || y > height as f64 + 1.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f64;
    let fy = y - y0 as f64;

    let wx = cubic_taps(fx);
    let wy = cubic_taps(fy);

    let mut acc = [0.0f64; 4];
    for (j, wyj) in wy.iter().enumerate() {
        let sy = y0 - 1 + j as i64;
        if sy < 0 || sy >= height as i64 {
            continue;
        }
        for (i, wxi) in wx.iter().enumerate() {
            let sx = x0 - 1 + i as i64;
            if sx < 0 || sx >= width as i64 {
                continue;
            }
            let p = src.get_pixel(sx as u32, sy as u32);
            if p[3] == 0 {
                continue;
            }
            let w = wxi * wyj;
            let a = p[3] as f64 / 255.0;
            acc[0] += w * p[0] as f64 * a;
            acc[1] += w * p[1] as f64 * a;
            acc[2] += w * p[2] as f64 * a;
            acc[3] += w * p[3] as f64;
        }
    }

    let alpha = acc[3].clamp(0.0, 255.0);
    if alpha < 0.5 {
        return Rgba([0, 0, 0, 0]);
    }
    let unpremultiply = 255.0 / alpha;
    Rgba([
        (acc[0] * unpremultiply).round().clamp(0.0, 255.0) as u8,
        (acc[1] * unpremultiply).round().clamp(0.0, 255.0) as u8,
        (acc[2] * unpremultiply).round().clamp(0.0, 255.0) as u8,
        alpha.round() as u8,
    ])
}
