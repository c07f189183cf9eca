//! Image manager backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the primitives every backend must
//! support: decode a source, resize by policy, compress to bytes, and scale
//! down for display. Orchestration code (batches, sessions, filters) only
//! talks to this trait.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use the recording mock in this module's test submodule.

use super::params::{ImageInfo, ResizeType};
use crate::types::Uri;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot open {0}: not a local file")]
    UnsupportedUri(Uri),
    #[error("Failed to decode {uri}: {reason}")]
    Decode { uri: Uri, reason: String },
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// A decoded image together with the descriptor it was decoded under.
///
/// `info` describes the pixels in `image` (width, height, source format,
/// original URI). `exif` holds the raw APP1 segment of JPEG sources so it can
/// be carried into the output when metadata is kept.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub image: DynamicImage,
    pub info: ImageInfo,
    pub exif: Option<Vec<u8>>,
}

/// Trait for image manager backends.
pub trait ImageBackend: Sync {
    /// Decode the image behind `uri`, applying its EXIF orientation.
    fn get_image(&self, uri: &Uri) -> Result<ImageData, BackendError>;

    /// Resize according to `resize_type`.
    ///
    /// Returns `None` when there is nothing to produce: a zero-sized target,
    /// or a limits resize that skips images already inside the box.
    fn resize(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
        resize_type: ResizeType,
    ) -> Option<DynamicImage>;

    /// Encode `data.image` using `data.info.format` and `data.info.quality`.
    fn compress(&self, data: &ImageData) -> Result<Vec<u8>, BackendError>;

    /// Shrink an image until it is small enough to display.
    fn scale_until_can_show(&self, image: DynamicImage) -> DynamicImage;
}
