//! Image <-> `data:` URI codec
//!
//! Clipboard images are kept in history as `data:image/png;base64,...`
//! strings so the store can treat every payload as opaque text.

use std::io::Cursor;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbaImage};

use super::backend::ClipboardImage;
use crate::shared::error::{AppError, AppResult};

const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Encode raw RGBA pixels as a PNG data URI
pub fn encode_data_uri(image: &ClipboardImage) -> AppResult<String> {
    let width = u32::try_from(image.width)
        .map_err(|_| AppError::Image(format!("Image width {} out of range", image.width)))?;
    let height = u32::try_from(image.height)
        .map_err(|_| AppError::Image(format!("Image height {} out of range", image.height)))?;

    let buffer = RgbaImage::from_raw(width, height, image.bytes.clone()).ok_or_else(|| {
        AppError::Image(format!(
            "Pixel buffer of {} bytes does not match {}x{} RGBA",
            image.bytes.len(),
            width,
            height
        ))
    })?;

    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(buffer).write_to(&mut png, ImageFormat::Png)?;

    Ok(format!("{}{}", PNG_DATA_URI_PREFIX, STANDARD.encode(png.into_inner())))
}

/// Decode a base64 image data URI back into RGBA pixels
pub fn decode_data_uri(uri: &str) -> AppResult<ClipboardImage> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| AppError::Image("Not a data URI".to_string()))?;
    if !header.starts_with("data:image/") || !header.ends_with(";base64") {
        return Err(AppError::Image(format!("Unsupported data URI header '{}'", header)));
    }

    let bytes = STANDARD.decode(payload.trim())?;
    let decoded = image::load_from_memory(&bytes)?.to_rgba8();
    let (width, height) = decoded.dimensions();

    Ok(ClipboardImage {
        width: width as usize,
        height: height as usize,
        bytes: decoded.into_raw(),
    })
}
