//! Pure Rust image manager backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, BMP) | `image::load_from_memory` |
//! | EXIF orientation | custom [`exif`](super::exif) segment reader |
//! | Resize | `DynamicImage::resize_exact` / `resize_to_fill` with `Lanczos3` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG / BMP | `PngEncoder`, `BmpEncoder` |
//! | Encode → WebP | `WebPEncoder::new_lossless` (quality ignored) |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |

use super::backend::{BackendError, ImageBackend, ImageData};
use super::calculations::{calculate_displayable_dimensions, calculate_resize_dimensions};
use super::exif;
use super::params::{ImageFormat, ImageInfo, ResizeType};
use crate::types::Uri;
use image::codecs::avif::AvifEncoder;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

/// Largest image handed to a display surface: 100 MiB of RGBA pixels.
pub const MAX_DISPLAY_PIXELS: u64 = 100 * 1024 * 1024 / 4;

/// Extensions with a decoder compiled in. AVIF is encode-only.
const INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "webp", "bmp"];

/// Returns the set of image file extensions that can be decoded.
pub fn supported_input_extensions() -> &'static [&'static str] {
    INPUT_EXTENSIONS
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

fn map_source_format(format: image::ImageFormat) -> ImageFormat {
    match format {
        image::ImageFormat::Png => ImageFormat::Png,
        image::ImageFormat::WebP => ImageFormat::Webp,
        image::ImageFormat::Avif => ImageFormat::Avif,
        image::ImageFormat::Bmp => ImageFormat::Bmp,
        _ => ImageFormat::Jpeg,
    }
}

fn encode_error(format: ImageFormat, e: image::ImageError) -> BackendError {
    BackendError::Encode(format!("{format}: {e}"))
}

/// Encode an image in the requested format, converting the pixel layout to
/// one the encoder accepts (RGB for formats without alpha).
fn encode(image: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, BackendError> {
    let pixels = if format.supports_alpha() {
        DynamicImage::ImageRgba8(image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.to_rgb8())
    };

    let mut buf = Vec::new();
    let result = match format {
        ImageFormat::Jpeg => pixels.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality)),
        ImageFormat::Png => pixels.write_with_encoder(PngEncoder::new(&mut buf)),
        ImageFormat::Webp => pixels.write_with_encoder(WebPEncoder::new_lossless(&mut buf)),
        ImageFormat::Avif => {
            pixels.write_with_encoder(AvifEncoder::new_with_speed_quality(&mut buf, 6, quality))
        }
        ImageFormat::Bmp => pixels.write_with_encoder(BmpEncoder::new(&mut buf)),
    };
    result.map_err(|e| encode_error(format, e))?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn get_image(&self, uri: &Uri) -> Result<ImageData, BackendError> {
        let path = uri
            .to_path()
            .ok_or_else(|| BackendError::UnsupportedUri(uri.clone()))?;
        let bytes = std::fs::read(&path)?;

        let decode_error = |reason: String| BackendError::Decode {
            uri: uri.clone(),
            reason,
        };
        let source_format = image::guess_format(&bytes).map_err(|e| decode_error(e.to_string()))?;
        let decoded = image::load_from_memory_with_format(&bytes, source_format)
            .map_err(|e| decode_error(e.to_string()))?;

        let exif = exif::find_exif_segment(&bytes).map(<[u8]>::to_vec);
        let orientation = exif.as_deref().and_then(exif::read_orientation).unwrap_or(1);
        let image = exif::apply_orientation(decoded, orientation);

        let (width, height) = image.dimensions();
        debug!(%uri, width, height, orientation, "decoded image");

        Ok(ImageData {
            image,
            info: ImageInfo::new(width, height)
                .with_format(map_source_format(source_format))
                .with_uri(uri.clone()),
            exif,
        })
    }

    fn resize(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
        resize_type: ResizeType,
    ) -> Option<DynamicImage> {
        let source = image.dimensions();
        let (w, h) = calculate_resize_dimensions(source, (width, height), resize_type)?;

        if resize_type == ResizeType::CenterCrop {
            return Some(image.resize_to_fill(w, h, FilterType::Lanczos3));
        }
        if (w, h) == source {
            return Some(image.clone());
        }
        Some(image.resize_exact(w, h, FilterType::Lanczos3))
    }

    fn compress(&self, data: &ImageData) -> Result<Vec<u8>, BackendError> {
        let quality = data.info.quality.value() as u8;
        encode(&data.image, data.info.format, quality)
    }

    fn scale_until_can_show(&self, image: DynamicImage) -> DynamicImage {
        let source = image.dimensions();
        let (w, h) = calculate_displayable_dimensions(source, MAX_DISPLAY_PIXELS);
        if (w, h) == source {
            image
        } else {
            debug!(from = ?source, to = ?(w, h), "scaling down for display");
            image.resize_exact(w, h, FilterType::Triangle)
        }
    }
}
