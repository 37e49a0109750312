//! Image encoding for the vision API.
//!
//! Uploaded images are shipped as-is; rendered PDF pages go out as JPEG.
//! Either way the wire form is a base64 `data:` URI inside a chat message.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat};

use crate::intake;

/// A base64-encoded image ready to embed in a chat-completions request.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub base64: String,
    pub mime_type: &'static str,
}

impl ImagePayload {
    /// `data:` URI form used in OpenAI-style image parts.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Encode raw upload bytes; the MIME type follows the stored extension.
pub fn encode_bytes(bytes: &[u8], extension: &str) -> ImagePayload {
    ImagePayload {
        base64: STANDARD.encode(bytes),
        mime_type: intake::mime_for_extension(extension),
    }
}

/// Encode a rendered page as JPEG.
///
/// Rendered pages carry an alpha channel; JPEG has none, so the image is
/// flattened to RGB first.
pub fn encode_jpeg(image: &DynamicImage) -> Result<ImagePayload, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)?;
    Ok(ImagePayload {
        base64: STANDARD.encode(&buf),
        mime_type: "image/jpeg",
    })
}
