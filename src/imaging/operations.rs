//! High-level image operations.
//!
//! These functions combine calculations, filters and backend execution into
//! the one pipeline every save and share goes through:
//! filters → resize → rotate/flip, then the caller compresses.

use super::backend::{BackendError, ImageBackend, ImageData};
use super::params::ImageInfo;
use crate::filters::{FilterChain, FilterError};
use image::{DynamicImage, GenericImageView};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OperationError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("filter failed: {0}")]
    Filter(#[from] FilterError),
    #[error("no source image given")]
    MissingSource,
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, OperationError>;

/// Clockwise rotation by a multiple of 90°, then an optional horizontal flip.
pub fn apply_rotation(image: DynamicImage, degrees: u32, flipped: bool) -> DynamicImage {
    let rotated = match degrees % 360 {
        90 => image.rotate90(),
        180 => image.rotate180(),
        270 => image.rotate270(),
        _ => image,
    };
    if flipped { rotated.fliph() } else { rotated }
}

/// Produce the output pixels for `target` from decoded `source`.
///
/// Returns `Ok(None)` when the resize policy skips this image (a limits
/// resize of an image that already fits). The returned data carries the
/// target format and quality, the final pixel size, and the source EXIF.
pub fn transform_image(
    backend: &(impl ImageBackend + ?Sized),
    source: ImageData,
    target: &ImageInfo,
    filters: &FilterChain,
) -> Result<Option<ImageData>> {
    let filtered = if filters.is_empty() {
        source.image
    } else {
        filters.apply(&source.image)?
    };

    let Some(resized) = backend.resize(&filtered, target.width, target.height, target.resize_type)
    else {
        return Ok(None);
    };

    let image = apply_rotation(resized, target.rotation_degrees, target.flipped);
    let (width, height) = image.dimensions();
    let info = ImageInfo {
        width,
        height,
        original_uri: source.info.original_uri.or_else(|| target.original_uri.clone()),
        ..target.clone()
    };
    Ok(Some(ImageData {
        image,
        info,
        exif: source.exif,
    }))
}

/// Decode, transform and compress one image.
///
/// `Ok(None)` means skipped, see [`transform_image`].
pub fn process_image(
    backend: &(impl ImageBackend + ?Sized),
    target: &ImageInfo,
    filters: &FilterChain,
) -> Result<Option<(ImageData, Vec<u8>)>> {
    let uri = target
        .original_uri
        .as_ref()
        .ok_or(OperationError::MissingSource)?;
    let source = backend.get_image(uri)?;
    let Some(data) = transform_image(backend, source, target, filters)? else {
        return Ok(None);
    };
    let bytes = backend.compress(&data)?;
    Ok(Some((data, bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Filter;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::imaging::params::{ImageFormat, LimitsPolicy, Quality, ResizeType};
    use crate::types::Uri;

    fn source(w: u32, h: u32) -> ImageData {
        ImageData {
            image: DynamicImage::new_rgba8(w, h),
            info: ImageInfo::new(w, h).with_uri(Uri::new("/src.jpg")),
            exif: Some(vec![0xFF, 0xE1]),
        }
    }

    #[test]
    fn rotation_quarter_turns_swap_dimensions() {
        let img = DynamicImage::new_rgb8(40, 10);
        assert_eq!(apply_rotation(img.clone(), 90, false).dimensions(), (10, 40));
        assert_eq!(apply_rotation(img.clone(), 180, true).dimensions(), (40, 10));
        assert_eq!(apply_rotation(img, 270, false).dimensions(), (10, 40));
    }

    #[test]
    fn flip_mirrors_horizontally() {
        let mut rgba = image::RgbaImage::new(2, 1);
        rgba.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        let out = apply_rotation(DynamicImage::ImageRgba8(rgba), 0, true).to_rgba8();
        assert_eq!(out.get_pixel(1, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn transform_resizes_rotates_and_keeps_exif() {
        let backend = MockBackend::new();
        let target = ImageInfo::new(100, 50)
            .with_format(ImageFormat::Png)
            .with_rotation(90);

        let out = transform_image(&backend, source(400, 200), &target, &FilterChain::default())
            .unwrap()
            .unwrap();

        assert_eq!(out.image.dimensions(), (50, 100));
        assert_eq!(out.info.size(), (50, 100));
        assert_eq!(out.info.format, ImageFormat::Png);
        assert_eq!(out.info.original_uri, Some(Uri::new("/src.jpg")));
        assert_eq!(out.exif, Some(vec![0xFF, 0xE1]));
    }

    #[test]
    fn transform_skips_under_limits_skip() {
        let backend = MockBackend::new();
        let target = ImageInfo::new(1000, 1000).with_resize_type(ResizeType::Limits {
            on_smaller: LimitsPolicy::Skip,
        });
        let out = transform_image(&backend, source(200, 200), &target, &FilterChain::default());
        assert!(out.unwrap().is_none());
    }

    #[test]
    fn transform_propagates_filter_errors() {
        let backend = MockBackend::new();
        let chain = FilterChain::new(vec![Filter::Posterize(0.0)]);
        let result = transform_image(&backend, source(10, 10), &ImageInfo::new(5, 5), &chain);
        assert!(matches!(result, Err(OperationError::Filter(_))));
        // Nothing reached the backend
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn process_decodes_resizes_and_compresses() {
        let backend = MockBackend::with_images(&[("/a.jpg", (800, 600))]);
        let target = ImageInfo::new(400, 300)
            .with_quality(Quality::new(70))
            .with_uri(Uri::new("/a.jpg"));

        let (data, bytes) = process_image(&backend, &target, &FilterChain::default())
            .unwrap()
            .unwrap();
        assert_eq!(data.info.size(), (400, 300));
        assert_eq!(bytes, b"400x300");

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 3);
        assert!(matches!(&ops[0], RecordedOp::GetImage(u) if u == "/a.jpg"));
        assert!(matches!(
            &ops[2],
            RecordedOp::Compress {
                width: 400,
                height: 300,
                quality: 70,
                ..
            }
        ));
    }

    #[test]
    fn process_reports_decode_failure() {
        let backend = MockBackend::new();
        let target = ImageInfo::new(10, 10).with_uri(Uri::new("/broken.jpg"));
        let result = process_image(&backend, &target, &FilterChain::default());
        assert!(matches!(result, Err(OperationError::Backend(BackendError::Decode { .. }))));
    }
}
