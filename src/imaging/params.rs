//! Parameter types for image operations.
//!
//! These types describe *what* to produce, not *how*. [`ImageInfo`] is the
//! interface between the orchestration layers (sessions, batches, presets),
//! which decide what an output should look like, and the
//! [`backend`](super::backend), which does the pixel work.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`ImageFormat`]: Output container; decides extension, mime type and whether quality applies.
//! - [`ResizeType`]: How the source dimensions map onto the requested width/height.
//! - [`ImageInfo`]: Full target descriptor for one save or preview request.

use crate::types::Uri;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Quality setting for lossy image encoding (1-100).
///
/// Every way in, deserialization included, goes through the clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} {value:?}")]
pub struct ParamParseError {
    pub kind: &'static str,
    pub value: String,
}

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
    Avif,
    Bmp,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 5] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Webp,
        ImageFormat::Avif,
        ImageFormat::Bmp,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
            ImageFormat::Avif => "avif",
            ImageFormat::Bmp => "bmp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
            ImageFormat::Avif => "image/avif",
            ImageFormat::Bmp => "image/bmp",
        }
    }

    /// Whether the encoder honours [`Quality`]. WebP is encoded losslessly.
    pub fn supports_quality(self) -> bool {
        matches!(self, ImageFormat::Jpeg | ImageFormat::Avif)
    }

    pub fn supports_alpha(self) -> bool {
        matches!(self, ImageFormat::Png | ImageFormat::Webp | ImageFormat::Avif)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::Webp),
            "avif" => Some(ImageFormat::Avif),
            "bmp" => Some(ImageFormat::Bmp),
            _ => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = ParamParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| ParamParseError {
            kind: "image format",
            value: s.to_string(),
        })
    }
}

/// What [`ResizeType::Limits`] does with a source that already fits the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitsPolicy {
    /// Leave the image out of the output.
    #[default]
    Skip,
    /// Re-encode at the original size.
    Recode,
    /// Upscale until it touches the box.
    Zoom,
}

/// How source dimensions are mapped onto the requested width and height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ResizeType {
    /// Exactly `width × height`, aspect ratio ignored.
    #[default]
    Explicit,
    /// Largest size that fits inside the box, aspect preserved.
    Fit,
    /// Smallest size that covers the box, aspect preserved. Nothing is cropped.
    Fill,
    /// Cover the box, then center-crop to exactly `width × height`.
    CenterCrop,
    /// Only shrink sources larger than the box; see [`LimitsPolicy`].
    Limits { on_smaller: LimitsPolicy },
}

impl fmt::Display for ResizeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResizeType::Explicit => f.write_str("explicit"),
            ResizeType::Fit => f.write_str("fit"),
            ResizeType::Fill => f.write_str("fill"),
            ResizeType::CenterCrop => f.write_str("crop"),
            ResizeType::Limits { on_smaller } => {
                let policy = match on_smaller {
                    LimitsPolicy::Skip => "skip",
                    LimitsPolicy::Recode => "recode",
                    LimitsPolicy::Zoom => "zoom",
                };
                write!(f, "limits:{policy}")
            }
        }
    }
}

impl FromStr for ResizeType {
    type Err = ParamParseError;

    /// Accepts `explicit`, `fit`, `fill`, `crop`, `limits` and
    /// `limits:{skip|recode|zoom}`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParamParseError {
            kind: "resize type",
            value: s.to_string(),
        };
        let lower = s.to_ascii_lowercase();
        let (head, tail) = match lower.split_once(':') {
            Some((h, t)) => (h, Some(t)),
            None => (lower.as_str(), None),
        };
        match (head, tail) {
            ("explicit", None) => Ok(ResizeType::Explicit),
            ("fit", None) => Ok(ResizeType::Fit),
            ("fill", None) => Ok(ResizeType::Fill),
            ("crop" | "center_crop", None) => Ok(ResizeType::CenterCrop),
            ("limits", policy) => {
                let on_smaller = match policy {
                    None | Some("skip") => LimitsPolicy::Skip,
                    Some("recode") => LimitsPolicy::Recode,
                    Some("zoom") => LimitsPolicy::Zoom,
                    Some(_) => return Err(err()),
                };
                Ok(ResizeType::Limits { on_smaller })
            }
            _ => Err(err()),
        }
    }
}

/// Target descriptor for one image operation.
///
/// Treated as a value: callers derive a new `ImageInfo` with the `with_*`
/// builders instead of mutating a shared one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    pub quality: Quality,
    pub resize_type: ResizeType,
    pub original_uri: Option<Uri>,
    /// Clockwise rotation applied after resizing. Always 0, 90, 180 or 270.
    pub rotation_degrees: u32,
    /// Horizontal mirror applied after rotation.
    pub flipped: bool,
}

impl Default for ImageInfo {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            format: ImageFormat::default(),
            quality: Quality::default(),
            resize_type: ResizeType::default(),
            original_uri: None,
            rotation_degrees: 0,
            flipped: false,
        }
    }
}

impl ImageInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_size(self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    pub fn with_format(self, format: ImageFormat) -> Self {
        Self { format, ..self }
    }

    pub fn with_quality(self, quality: Quality) -> Self {
        Self { quality, ..self }
    }

    pub fn with_resize_type(self, resize_type: ResizeType) -> Self {
        Self {
            resize_type,
            ..self
        }
    }

    pub fn with_uri(self, uri: Uri) -> Self {
        Self {
            original_uri: Some(uri),
            ..self
        }
    }

    /// Rotation is normalized to a multiple of 90 in `0..360`.
    pub fn with_rotation(self, degrees: i32) -> Self {
        let snapped = (degrees as f64 / 90.0).round() as i64 * 90;
        Self {
            rotation_degrees: snapped.rem_euclid(360) as u32,
            ..self
        }
    }

    pub fn with_flip(self, flipped: bool) -> Self {
        Self { flipped, ..self }
    }

    /// Zero-sized targets are never attempted.
    pub fn can_save(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn deserialized_quality_is_clamped() {
        let high: Quality = serde_json::from_str("300").unwrap();
        assert_eq!(high.value(), 100);
        let low: Quality = serde_json::from_str("0").unwrap();
        assert_eq!(low.value(), 1);
        assert_eq!(serde_json::to_string(&Quality::new(75)).unwrap(), "75");
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn format_from_extension_is_case_insensitive() {
        assert_eq!(ImageFormat::from_extension("JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("Png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("gif"), None);
    }

    #[test]
    fn only_lossy_formats_take_quality() {
        assert!(ImageFormat::Jpeg.supports_quality());
        assert!(ImageFormat::Avif.supports_quality());
        assert!(!ImageFormat::Png.supports_quality());
        assert!(!ImageFormat::Webp.supports_quality());
    }

    #[test]
    fn resize_type_parses_all_spellings() {
        assert_eq!("fit".parse::<ResizeType>().unwrap(), ResizeType::Fit);
        assert_eq!("crop".parse::<ResizeType>().unwrap(), ResizeType::CenterCrop);
        assert_eq!(
            "limits".parse::<ResizeType>().unwrap(),
            ResizeType::Limits {
                on_smaller: LimitsPolicy::Skip
            }
        );
        assert_eq!(
            "limits:zoom".parse::<ResizeType>().unwrap(),
            ResizeType::Limits {
                on_smaller: LimitsPolicy::Zoom
            }
        );
        assert!("limits:explode".parse::<ResizeType>().is_err());
        assert!("stretch".parse::<ResizeType>().is_err());
    }

    #[test]
    fn resize_type_display_parses_back() {
        for rt in [
            ResizeType::Explicit,
            ResizeType::Fit,
            ResizeType::Fill,
            ResizeType::CenterCrop,
            ResizeType::Limits {
                on_smaller: LimitsPolicy::Recode,
            },
        ] {
            assert_eq!(rt.to_string().parse::<ResizeType>().unwrap(), rt);
        }
    }

    #[test]
    fn rotation_normalizes() {
        assert_eq!(ImageInfo::default().with_rotation(-90).rotation_degrees, 270);
        assert_eq!(ImageInfo::default().with_rotation(450).rotation_degrees, 90);
        assert_eq!(ImageInfo::default().with_rotation(360).rotation_degrees, 0);
    }

    #[test]
    fn can_save_requires_both_dimensions() {
        assert!(ImageInfo::new(10, 10).can_save());
        assert!(!ImageInfo::new(0, 10).can_save());
        assert!(!ImageInfo::new(10, 0).can_save());
    }
}
