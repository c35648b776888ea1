//! Image decode/encode and the data-URL form used by the fetch relay.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageFormat;

use crate::blending::PixelBuffer;
use crate::error::{Error, Result};

/// Decode encoded image bytes (PNG, JPEG, WebP, ...) into an RGBA buffer.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the bytes are not a supported image.
pub fn decode(bytes: &[u8]) -> Result<PixelBuffer> {
    let img = image::load_from_memory(bytes).map_err(Error::Decode)?;
    Ok(img.to_rgba8())
}

/// Encode a buffer as PNG.
///
/// # Errors
///
/// Returns [`Error::Encode`] if encoding fails.
pub fn encode_png(buffer: &PixelBuffer) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    buffer
        .write_to(&mut out, ImageFormat::Png)
        .map_err(Error::Encode)?;
    Ok(out.into_inner())
}

/// Wrap encoded bytes as a `data:<mime>;base64,...` URL.
///
/// The MIME type is sniffed from the bytes and falls back to
/// `application/octet-stream`.
#[must_use]
pub fn to_data_url(bytes: &[u8]) -> String {
    let mime = image::guess_format(bytes).map_or("application/octet-stream", |f| f.to_mime_type());
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Extract the payload of a base64 data URL.
///
/// # Errors
///
/// Returns [`Error::DataUrl`] for anything other than a base64 `data:` URL.
pub fn parse_data_url(url: &str) -> Result<Vec<u8>> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| Error::DataUrl("missing data: scheme".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::DataUrl("missing payload separator".to_string()))?;
    if !meta.ends_with(";base64") {
        return Err(Error::DataUrl(format!("not base64-encoded ({meta})")));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| Error::DataUrl(e.to_string()))
}
