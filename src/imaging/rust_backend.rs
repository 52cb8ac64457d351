//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, GIF, WebP) | `image::load_from_memory` (format sniffed from content) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the requested quality |
//! | Encode → PNG / GIF / WebP | `DynamicImage::write_to` (lossless, quality ignored) |

use super::backend::{BackendError, ImageBackend, ImageDimensions};
use super::params::{Quality, ResizeParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Map a declared MIME type to the format used for re-encoding.
///
/// `image/jpg` is not a registered type but browsers and older upload widgets
/// emit it, so it is treated as JPEG.
pub fn format_for_mime(mime: &str) -> Option<ImageFormat> {
    match mime {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        "image/gif" => Some(ImageFormat::Gif),
        "image/webp" => Some(ImageFormat::WebP),
        _ => None,
    }
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode `img` in `format`. JPEG honours `quality`; the other encoders the
/// `image` crate ships are lossless.
fn encode(img: &DynamicImage, format: ImageFormat, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let result = match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value() as u8);
            rgb.write_with_encoder(encoder)
        }
        ImageFormat::Png => img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png),
        ImageFormat::Gif | ImageFormat::WebP => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_to(&mut Cursor::new(&mut buf), format),
        other => {
            return Err(BackendError::Encode(format!(
                "Unsupported output format: {:?}",
                other
            )));
        }
    };
    result.map_err(|e| BackendError::Encode(e.to_string()))?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn identify(&self, bytes: &[u8]) -> Result<ImageDimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(format!("Failed to sniff format: {}", e)))?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {}", e)))?;
        if width == 0 || height == 0 {
            return Err(BackendError::Decode(format!(
                "Degenerate dimensions {}x{}",
                width, height
            )));
        }
        Ok(ImageDimensions { width, height })
    }

    fn resize(&self, params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
        let source_format = image::guess_format(&params.source)
            .map_err(|e| BackendError::Decode(format!("Failed to sniff format: {}", e)))?;
        let img = image::load_from_memory_with_format(&params.source, source_format)
            .map_err(|e| BackendError::Decode(format!("Failed to decode: {}", e)))?;

        let output_format = format_for_mime(&params.mime_type).unwrap_or(source_format);
        let resized = img.resize_exact(params.width, params.height, FilterType::Lanczos3);
        encode(&resized, output_format, params.quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::sync::Arc;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        gradient(width, height)
            .write_to(&mut Cursor::new(&mut buf), format)
            .unwrap();
        buf
    }

    fn params(source: Vec<u8>, mime: &str, width: u32, height: u32) -> ResizeParams {
        ResizeParams {
            source: Arc::from(source),
            mime_type: mime.to_string(),
            width,
            height,
            quality: Quality::new(85),
        }
    }

    #[test]
    fn format_for_known_mimes() {
        assert_eq!(format_for_mime("image/jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(format_for_mime("image/webp"), Some(ImageFormat::WebP));
        assert_eq!(format_for_mime("image/tiff"), None);
    }

    #[test]
    fn identify_png() {
        let dims = RustBackend::new()
            .identify(&encoded(320, 240, ImageFormat::Png))
            .unwrap();
        assert_eq!(dims, ImageDimensions { width: 320, height: 240 });
    }

    #[test]
    fn identify_gif() {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(gradient(50, 40).to_rgba8())
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif)
            .unwrap();
        let dims = RustBackend::new().identify(&buf).unwrap();
        assert_eq!(dims, ImageDimensions { width: 50, height: 40 });
    }

    #[test]
    fn identify_garbage_is_decode_error() {
        let result = RustBackend::new().identify(b"definitely not an image");
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }

    #[test]
    fn resize_png_keeps_format() {
        let out = RustBackend::new()
            .resize(&params(encoded(300, 100, ImageFormat::Png), "image/png", 150, 50))
            .unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Png);
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (150, 50));
    }

    #[test]
    fn resize_reencodes_as_declared_mime() {
        let source = encoded(400, 200, ImageFormat::Png);
        let out = RustBackend::new()
            .resize(&params(source, "image/jpeg", 200, 100))
            .unwrap();
        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn resize_undecodable_source_is_decode_error() {
        let result = RustBackend::new().resize(&params(
            vec![0xFF, 0xD8, 0xFF, 0x00],
            "image/jpeg",
            10,
            10,
        ));
        assert!(matches!(result, Err(BackendError::Decode(_))));
    }
}
