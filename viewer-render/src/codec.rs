//! Data URL codec.
//!
//! Encodes raw RGBA data as `data:image/png;base64,...` and decodes data URLs
//! (base64 or percent-encoded, PNG/JPEG/WebP payloads) back to RGBA.

use base64::Engine;
use image::ImageEncoder;
use viewer_core::{CanvasError, CanvasResult, EncodedImage, ImageData};

/// Prefix of every data URL this codec produces.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Supported payload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Format named by a MIME type such as `image/png`.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        match mime.strip_prefix("image/") {
            Some("png") => Self::Png,
            Some("jpeg" | "jpg" | "pjpeg") => Self::Jpeg,
            Some("webp") => Self::WebP,
            _ => Self::Unknown,
        }
    }

    /// Format recognized from a payload's leading signature bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        match data {
            [0x89, b'P', b'N', b'G', ..] => Self::Png,
            [0xFF, 0xD8, 0xFF, ..] => Self::Jpeg,
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Self::WebP,
            _ => Self::Unknown,
        }
    }

    /// The decoder used for this format.
    fn codec(self) -> Option<image::ImageFormat> {
        match self {
            Self::Png => Some(image::ImageFormat::Png),
            Self::Jpeg => Some(image::ImageFormat::Jpeg),
            Self::WebP => Some(image::ImageFormat::WebP),
            Self::Unknown => None,
        }
    }
}

/// Encode RGBA data as a PNG data URL.
///
/// Empty images encode to [`EncodedImage::empty`].
///
/// # Errors
///
/// Returns [`CanvasError::DimensionMismatch`] if the buffer does not match
/// the dimensions, or [`CanvasError::Encode`] if PNG encoding fails.
pub fn encode_png_data_url(image: &ImageData) -> CanvasResult<EncodedImage> {
    if image.is_empty() {
        return Ok(EncodedImage::empty());
    }
    image.validate()?;

    let mut png = Vec::new();
    image::codecs::png::PngEncoder::new(&mut png)
        .write_image(
            &image.data,
            image.width,
            image.height,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| CanvasError::Encode(format!("PNG encoding failed: {e}")))?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
    tracing::trace!(
        "Encoded {}x{} image to {} byte PNG",
        image.width,
        image.height,
        png.len()
    );
    Ok(EncodedImage::from_data_url(format!(
        "{PNG_DATA_URL_PREFIX}{encoded}"
    )))
}

/// Decode image bytes to RGBA.
///
/// The decoder is chosen from the payload signature; anything other than
/// PNG, JPEG or WebP is rejected without being parsed.
///
/// # Errors
///
/// Returns [`CanvasError::DecodeFailed`] if the bytes are not a supported
/// image.
pub fn decode_bytes(data: &[u8]) -> CanvasResult<ImageData> {
    let format = ImageFormat::from_magic_bytes(data);
    let codec = format.codec().ok_or_else(|| {
        CanvasError::DecodeFailed("Unrecognized image payload (expected PNG, JPEG or WebP)".into())
    })?;
    let img = image::load_from_memory_with_format(data, codec)
        .map_err(|e| CanvasError::DecodeFailed(format!("{format:?} payload: {e}")))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    ImageData::from_raw(width, height, rgba.into_raw())
}

/// Decode a data URL to RGBA.
///
/// Supports formats like: `data:image/png;base64,iVBORw0KGgo...`
///
/// # Errors
///
/// Returns [`CanvasError::DecodeFailed`] if the data URL is malformed or the
/// payload cannot be decoded.
pub fn decode_data_url(uri: &str) -> CanvasResult<ImageData> {
    let uri_data = uri
        .strip_prefix("data:")
        .ok_or_else(|| CanvasError::DecodeFailed("Not a data URI".to_string()))?;

    let comma_pos = uri_data
        .find(',')
        .ok_or_else(|| CanvasError::DecodeFailed("Invalid data URI: missing comma".to_string()))?;

    let metadata = &uri_data[..comma_pos];
    let encoded_data = &uri_data[comma_pos + 1..];

    let declared = ImageFormat::from_mime(metadata.split(';').next().unwrap_or_default());

    let bytes = if metadata.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(encoded_data)
            .map_err(|e| CanvasError::DecodeFailed(format!("Failed to decode base64: {e}")))?
    } else {
        percent_decode(encoded_data)?
    };

    let sniffed = ImageFormat::from_magic_bytes(&bytes);
    if declared != ImageFormat::Unknown && sniffed != ImageFormat::Unknown && declared != sniffed {
        tracing::debug!("Data URI declares {declared:?} but carries {sniffed:?}, using payload");
    }
    decode_bytes(&bytes)
}

/// Percent-decoding for non-base64 data URLs.
fn percent_decode(input: &str) -> CanvasResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = input
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| CanvasError::DecodeFailed("Invalid URL encoding".to_string()))?;
            result.push(byte);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }

    Ok(result)
}
