//! Image preprocessing for the gate payload and the classifier input.
//!
//! Every function here borrows the caller's image and returns a derived
//! copy; the input is never mutated.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::types::{EncodedImage, MODEL_INPUT_SIZE, NormalizedTensor};
use crate::{LeafError, Result};

/// Longest side of the display copy and of the gate payload image.
pub const DISPLAY_MAX_DIMENSION: u32 = 300;

/// Upper bound for a configured display size.
pub const DISPLAY_DIMENSION_LIMIT: u32 = 4096;

/// JPEG quality of the gate payload.
pub const PAYLOAD_JPEG_QUALITY: u8 = 100;

/// Scale proportionally so the longer side equals `max_dimension`.
///
/// Scale is `max_dimension / max(width, height)`; small images are scaled
/// up. Each output side is truncated and clamped to at least 1 px.
pub fn resize_for_display(image: &DynamicImage, max_dimension: u32) -> Result<DynamicImage> {
    let (width, height) = checked_dimensions(image)?;
    if max_dimension == 0 {
        return Err(LeafError::InvalidImage(
            "display max dimension must be positive".to_string(),
        ));
    }

    let (target_width, target_height) = display_dimensions(width, height, max_dimension);
    if (target_width, target_height) == (width, height) {
        return Ok(image.clone());
    }

    Ok(image.resize_exact(target_width, target_height, FilterType::Triangle))
}

/// Force-scale to 150×150 (aspect ratio not preserved) and normalize.
///
/// Pixels are read as 8-bit R/G/B regardless of the source colour type
/// (alpha is dropped, grayscale is expanded) and divided by 255.
pub fn resize_for_model(image: &DynamicImage) -> Result<NormalizedTensor> {
    checked_dimensions(image)?;

    let side = MODEL_INPUT_SIZE as u32;
    let rgb = image.resize_exact(side, side, FilterType::Nearest).to_rgb8();
    NormalizedTensor::from_rgb_bytes(rgb.as_raw())
}

/// Display-resize to [`DISPLAY_MAX_DIMENSION`], JPEG-encode at quality 100,
/// and base64-encode without line wrapping.
pub fn encode_payload(image: &DynamicImage) -> Result<EncodedImage> {
    let display = resize_for_display(image, DISPLAY_MAX_DIMENSION)?;
    // JPEG has no alpha channel
    let rgb = display.to_rgb8();

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, PAYLOAD_JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;

    Ok(EncodedImage {
        mime_type: "image/jpeg",
        data: STANDARD.encode(&buffer),
    })
}

fn checked_dimensions(image: &DynamicImage) -> Result<(u32, u32)> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(LeafError::InvalidImage(format!(
            "degenerate image dimensions {width}x{height}"
        )));
    }
    Ok((width, height))
}

fn display_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    // multiply before dividing so the longer side lands exactly on max_dimension
    let longest = f64::from(width.max(height));
    let scaled =
        |side: u32| ((f64::from(side) * f64::from(max_dimension) / longest) as u32).max(1);
    (scaled(width), scaled(height))
}
