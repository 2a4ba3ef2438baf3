//! # Image Payload Decoding
//!
//! The browser sends the uploaded file as a data URI
//! (`data:image/jpeg;base64,/9j/4AAQ...`). Everything after the first comma
//! is standard base64; a payload with no comma is treated as bare base64.
//! The decoded bytes are sniffed and decoded with the `image` crate, or with
//! libheif for HEIC/HEIF when the `heif` feature is enabled.

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageReader, Limits};
use std::io::Cursor;
use tracing::debug;

use crate::error::TilemarkError;

/// Largest accepted width or height.
pub const MAX_IMAGE_SIDE: u32 = 16_384;

/// Largest accepted pixel count (64 megapixels).
pub const MAX_IMAGE_PIXELS: u64 = 64 * 1024 * 1024;

/// Decoder allocation budget: one RGBA16 frame at the pixel limit.
const MAX_DECODE_ALLOC: u64 = MAX_IMAGE_PIXELS * 8;

/// Decode a data-URI (or bare base64) image payload.
pub fn decode_data_uri(payload: &str) -> Result<DynamicImage, TilemarkError> {
    let encoded = match payload.split_once(',') {
        Some((_header, data)) => data,
        None => payload,
    };
    let cleaned: String = encoded.split_whitespace().collect();
    if cleaned.is_empty() {
        return Err(TilemarkError::Decode("empty image payload".to_string()));
    }

    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| TilemarkError::Decode(format!("Invalid base64: {}", e)))?;

    let image = decode_bytes(&bytes)?;
    debug!(
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "decoded image"
    );
    Ok(image)
}

/// Decode raw image file bytes.
///
/// Images wider or taller than [`MAX_IMAGE_SIDE`], or with more than
/// [`MAX_IMAGE_PIXELS`] pixels, are rejected before any pixel data is
/// allocated.
pub fn decode_bytes(bytes: &[u8]) -> Result<DynamicImage, TilemarkError> {
    if is_heic(bytes) {
        return decode_heic(bytes);
    }

    let reader = || {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| TilemarkError::Decode(format!("Failed to read image: {}", e)))
    };

    let (width, height) = reader()?
        .into_dimensions()
        .map_err(|e| TilemarkError::Decode(format!("Failed to decode image: {}", e)))?;
    check_dimensions(width, height)?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_SIDE);
    limits.max_image_height = Some(MAX_IMAGE_SIDE);
    limits.max_alloc = Some(MAX_DECODE_ALLOC);

    let mut reader = reader()?;
    reader.limits(limits);
    reader
        .decode()
        .map_err(|e| TilemarkError::Decode(format!("Failed to decode image: {}", e)))
}

/// Reject images too large to watermark.
fn check_dimensions(width: u32, height: u32) -> Result<(), TilemarkError> {
    if width > MAX_IMAGE_SIDE || height > MAX_IMAGE_SIDE {
        return Err(TilemarkError::Decode(format!(
            "image is {}x{}, sides are limited to {}px",
            width, height, MAX_IMAGE_SIDE
        )));
    }
    if width as u64 * height as u64 > MAX_IMAGE_PIXELS {
        return Err(TilemarkError::Decode(format!(
            "image is {}x{}, more than {} pixels",
            width, height, MAX_IMAGE_PIXELS
        )));
    }
    Ok(())
}

/// Check if the data looks like a HEIC/HEIF file by examining magic bytes.
/// HEIC files have an "ftyp" box near the start with HEIC-related brand codes.
fn is_heic(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }

    // Box size (4 bytes), then "ftyp", then the major brand
    if &data[4..8] != b"ftyp" {
        return false;
    }

    let brand = &data[8..12];
    matches!(
        brand,
        b"heic"
            | b"heix"
            | b"hevc"
            | b"hevx"
            | b"heim"
            | b"heis"
            | b"hevm"
            | b"hevs"
            | b"mif1"
            | b"msf1"
    )
}

#[cfg(feature = "heif")]
fn decode_heic(data: &[u8]) -> Result<DynamicImage, TilemarkError> {
    use image::RgbaImage;
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(data)
        .map_err(|e| TilemarkError::Decode(format!("Failed to read HEIC: {}", e)))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| TilemarkError::Decode(format!("Failed to get primary image: {}", e)))?;
    check_dimensions(handle.width(), handle.height())?;
    let image = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgba), None)
        .map_err(|e| TilemarkError::Decode(format!("Failed to decode HEIC image: {}", e)))?;

    let planes = image.planes();
    let interleaved = planes
        .interleaved
        .ok_or_else(|| TilemarkError::Decode("No interleaved RGBA data in HEIC".to_string()))?;

    let width = image.width();
    let height = image.height();
    let row_bytes = width as usize * 4;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        let start = y * interleaved.stride;
        let row = interleaved
            .data
            .get(start..start + row_bytes)
            .ok_or_else(|| TilemarkError::Decode("Truncated HEIC pixel data".to_string()))?;
        pixels.extend_from_slice(row);
    }

    RgbaImage::from_raw(width, height, pixels)
        .map(DynamicImage::ImageRgba8)
        .ok_or_else(|| TilemarkError::Decode("HEIC buffer size mismatch".to_string()))
}

#[cfg(not(feature = "heif"))]
fn decode_heic(_data: &[u8]) -> Result<DynamicImage, TilemarkError> {
    Err(TilemarkError::Decode(
        "HEIC/HEIF images need the `heif` feature".to_string(),
    ))
}
