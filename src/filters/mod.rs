//! Filter model: a closed set of parameterised pixel transformations.
//!
//! A [`Filter`] is a value: its kind plus typed parameters. It knows how to
//! run itself through the CPU [`kernels`] and how to derive a stable cache
//! key from its parameters.
//!
//! ## Cache keys
//!
//! `cache_key()` is `"{name}:{sha256}"` where the digest covers the filter
//! name, a tag for the value shape, and the little-endian bytes of every
//! parameter. `-0.0` is normalised to `0.0` first so the two spellings of
//! zero share cached output. Reference images contribute the digest of their
//! pixels, never their path. Two different parameterisations colliding
//! would need a SHA-256 collision; that risk is accepted.
//!
//! ## Submodules
//!
//! - [`kernels`]: the per-pixel and neighbourhood routines
//! - [`transformation`]: size-hinted adapters, chains and preview rendering
//! - [`parse`]: the `name[:v1[:v2]]` text syntax used by the CLI

pub mod kernels;
pub mod parse;
pub mod transformation;

pub use parse::{ParseError, parse_filter};
pub use transformation::{FilterChain, FilterTransformation, SizeHint, Transformation, previews};

use crate::types::Color;
use image::{DynamicImage, RgbaImage};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("reference image is empty")]
    EmptyReference,
    #[error("invalid {filter} parameter: {value}")]
    InvalidParameter { filter: &'static str, value: f32 },
}

/// Pixels used by reference-driven filters, identified by content digest.
///
/// Cloning is cheap (the buffer is shared). Equality compares digests.
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    pixels: Arc<RgbaImage>,
    digest: String,
}

impl ReferenceImage {
    pub fn new(pixels: RgbaImage) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(pixels.width().to_le_bytes());
        hasher.update(pixels.height().to_le_bytes());
        hasher.update(pixels.as_raw());
        Self {
            pixels: Arc::new(pixels),
            digest: format!("{:x}", hasher.finalize()),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.width() == 0 || self.pixels.height() == 0
    }
}

impl PartialEq for ReferenceImage {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

/// Shape of a filter's parameters, borrowed from the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterValue<'a> {
    Unit,
    Scalar(f32),
    Pair(f32, f32),
    ScalarColor(f32, Color),
    ScalarImage(f32, &'a ReferenceImage),
}

impl FilterValue<'_> {
    fn tag(&self) -> u8 {
        match self {
            FilterValue::Unit => 0,
            FilterValue::Scalar(_) => 1,
            FilterValue::Pair(..) => 2,
            FilterValue::ScalarColor(..) => 3,
            FilterValue::ScalarImage(..) => 4,
        }
    }

    fn scalars(&self) -> Vec<f32> {
        match *self {
            FilterValue::Unit => Vec::new(),
            FilterValue::Scalar(a) | FilterValue::ScalarColor(a, _) | FilterValue::ScalarImage(a, _) => {
                vec![a]
            }
            FilterValue::Pair(a, b) => vec![a, b],
        }
    }
}

/// A parameterised filter. See the module docs for the cache-key contract.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Added to every channel, -1..1.
    Brightness(f32),
    /// 0..4, 1 is identity.
    Contrast(f32),
    /// 0..2, 1 is identity.
    Saturation(f32),
    /// Stops, -10..10.
    Exposure(f32),
    Gamma(f32),
    /// Degrees.
    Hue(f32),
    Vibrance(f32),
    Sepia(f32),
    Grayscale,
    Negative,
    /// Gaussian sigma in pixels.
    GaussianBlur(f32),
    Sharpen(f32),
    /// Cell size in pixels.
    Pixelation(f32),
    /// Number of levels per channel, at least 1.
    Posterize(f32),
    /// Luminance threshold, 0..1.
    Solarize(f32),
    Vignette { start: f32, end: f32 },
    WhiteBalance { temperature: f32, tint: f32 },
    HighlightsShadows { highlights: f32, shadows: f32 },
    Monochrome { intensity: f32, color: Color },
    ColorOverlay { intensity: f32, color: Color },
    PaletteTransfer { intensity: f32, reference: ReferenceImage },
}

impl Filter {
    /// Every filter name, in menu order.
    pub const NAMES: [&'static str; 21] = [
        "brightness",
        "contrast",
        "saturation",
        "exposure",
        "gamma",
        "hue",
        "vibrance",
        "sepia",
        "grayscale",
        "negative",
        "gaussian_blur",
        "sharpen",
        "pixelation",
        "posterize",
        "solarize",
        "vignette",
        "white_balance",
        "highlights_shadows",
        "monochrome",
        "color_overlay",
        "palette_transfer",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Filter::Brightness(_) => "brightness",
            Filter::Contrast(_) => "contrast",
            Filter::Saturation(_) => "saturation",
            Filter::Exposure(_) => "exposure",
            Filter::Gamma(_) => "gamma",
            Filter::Hue(_) => "hue",
            Filter::Vibrance(_) => "vibrance",
            Filter::Sepia(_) => "sepia",
            Filter::Grayscale => "grayscale",
            Filter::Negative => "negative",
            Filter::GaussianBlur(_) => "gaussian_blur",
            Filter::Sharpen(_) => "sharpen",
            Filter::Pixelation(_) => "pixelation",
            Filter::Posterize(_) => "posterize",
            Filter::Solarize(_) => "solarize",
            Filter::Vignette { .. } => "vignette",
            Filter::WhiteBalance { .. } => "white_balance",
            Filter::HighlightsShadows { .. } => "highlights_shadows",
            Filter::Monochrome { .. } => "monochrome",
            Filter::ColorOverlay { .. } => "color_overlay",
            Filter::PaletteTransfer { .. } => "palette_transfer",
        }
    }

    pub fn value(&self) -> FilterValue<'_> {
        match self {
            Filter::Brightness(v)
            | Filter::Contrast(v)
            | Filter::Saturation(v)
            | Filter::Exposure(v)
            | Filter::Gamma(v)
            | Filter::Hue(v)
            | Filter::Vibrance(v)
            | Filter::Sepia(v)
            | Filter::GaussianBlur(v)
            | Filter::Sharpen(v)
            | Filter::Pixelation(v)
            | Filter::Posterize(v)
            | Filter::Solarize(v) => FilterValue::Scalar(*v),
            Filter::Grayscale | Filter::Negative => FilterValue::Unit,
            Filter::Vignette { start, end } => FilterValue::Pair(*start, *end),
            Filter::WhiteBalance { temperature, tint } => FilterValue::Pair(*temperature, *tint),
            Filter::HighlightsShadows {
                highlights,
                shadows,
            } => FilterValue::Pair(*highlights, *shadows),
            Filter::Monochrome { intensity, color } | Filter::ColorOverlay { intensity, color } => {
                FilterValue::ScalarColor(*intensity, *color)
            }
            Filter::PaletteTransfer {
                intensity,
                reference,
            } => FilterValue::ScalarImage(*intensity, reference),
        }
    }

    /// The filter called `name` with its default parameters.
    ///
    /// `None` for unknown names and for `palette_transfer`, which has no
    /// meaningful default reference image.
    pub fn with_default(name: &str) -> Option<Filter> {
        let filter = match name {
            "brightness" => Filter::Brightness(0.0),
            "contrast" => Filter::Contrast(1.0),
            "saturation" => Filter::Saturation(1.0),
            "exposure" => Filter::Exposure(0.0),
            "gamma" => Filter::Gamma(1.0),
            "hue" => Filter::Hue(90.0),
            "vibrance" => Filter::Vibrance(0.0),
            "sepia" => Filter::Sepia(1.0),
            "grayscale" => Filter::Grayscale,
            "negative" => Filter::Negative,
            "gaussian_blur" => Filter::GaussianBlur(2.0),
            "sharpen" => Filter::Sharpen(1.0),
            "pixelation" => Filter::Pixelation(16.0),
            "posterize" => Filter::Posterize(10.0),
            "solarize" => Filter::Solarize(0.5),
            "vignette" => Filter::Vignette {
                start: 0.3,
                end: 0.75,
            },
            "white_balance" => Filter::WhiteBalance {
                temperature: 5000.0,
                tint: 0.0,
            },
            "highlights_shadows" => Filter::HighlightsShadows {
                highlights: 1.0,
                shadows: 0.0,
            },
            "monochrome" => Filter::Monochrome {
                intensity: 1.0,
                color: Color::rgb(153, 115, 77),
            },
            "color_overlay" => Filter::ColorOverlay {
                intensity: 0.5,
                color: Color::rgb(255, 0, 0),
            },
            _ => return None,
        };
        Some(filter)
    }

    pub fn cache_key(&self) -> String {
        let value = self.value();
        let mut hasher = Sha256::new();
        hasher.update(self.name().as_bytes());
        hasher.update([0, value.tag()]);
        for v in value.scalars() {
            // -0.0 == 0.0, so both hash as +0.0
            let canonical = if v == 0.0 { 0.0f32 } else { v };
            hasher.update(canonical.to_le_bytes());
        }
        match value {
            FilterValue::ScalarColor(_, c) => hasher.update([c.r, c.g, c.b, c.a]),
            FilterValue::ScalarImage(_, reference) => hasher.update(reference.digest().as_bytes()),
            _ => {}
        }
        format!("{}:{:x}", self.name(), hasher.finalize())
    }

    /// Reject parameters no kernel can run with.
    pub fn validate(&self) -> Result<(), FilterError> {
        let invalid = |value: f32| FilterError::InvalidParameter {
            filter: self.name(),
            value,
        };
        if let Some(bad) = self.value().scalars().into_iter().find(|v| !v.is_finite()) {
            return Err(invalid(bad));
        }
        match self {
            Filter::Posterize(levels) if *levels < 1.0 => Err(invalid(*levels)),
            Filter::GaussianBlur(sigma) if *sigma < 0.0 => Err(invalid(*sigma)),
            Filter::HighlightsShadows { highlights, .. } if *highlights >= 2.0 => {
                Err(invalid(*highlights))
            }
            Filter::PaletteTransfer { reference, .. } if reference.is_empty() => {
                Err(FilterError::EmptyReference)
            }
            _ => Ok(()),
        }
    }

    /// Run the filter over `image` at its current size.
    pub fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, FilterError> {
        self.validate()?;
        let src = image.to_rgba8();
        let unit = |c: Color| {
            let [r, g, b, _] = c.to_unit();
            [r, g, b]
        };

        let out = match self {
            Filter::Brightness(v) => kernels::brightness(&src, *v),
            Filter::Contrast(v) => kernels::contrast(&src, *v),
            Filter::Saturation(v) => kernels::saturation(&src, *v),
            Filter::Exposure(v) => kernels::exposure(&src, *v),
            Filter::Gamma(v) => kernels::gamma(&src, *v),
            Filter::Hue(v) => kernels::hue(&src, *v),
            Filter::Vibrance(v) => kernels::vibrance(&src, *v),
            Filter::Sepia(v) => kernels::sepia(&src, *v),
            Filter::Grayscale => kernels::grayscale(&src),
            Filter::Negative => kernels::negative(&src),
            Filter::GaussianBlur(v) => kernels::gaussian_blur(&src, *v),
            Filter::Sharpen(v) => kernels::sharpen(&src, *v),
            Filter::Pixelation(v) => kernels::pixelate(&src, v.max(1.0).round() as u32),
            Filter::Posterize(v) => kernels::posterize(&src, v.round() as u32),
            Filter::Solarize(v) => kernels::solarize(&src, *v),
            Filter::Vignette { start, end } => kernels::vignette(&src, *start, *end),
            Filter::WhiteBalance { temperature, tint } => {
                kernels::white_balance(&src, *temperature, *tint)
            }
            Filter::HighlightsShadows {
                highlights,
                shadows,
            } => kernels::highlights_shadows(&src, *highlights, *shadows),
            Filter::Monochrome { intensity, color } => {
                kernels::monochrome(&src, *intensity, unit(*color))
            }
            Filter::ColorOverlay { intensity, color } => {
                let alpha = color.to_unit()[3];
                kernels::color_overlay(&src, *intensity * alpha, unit(*color))
            }
            Filter::PaletteTransfer {
                intensity,
                reference,
            } => kernels::palette_transfer(&src, *intensity, reference.pixels()),
        };
        Ok(DynamicImage::ImageRgba8(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};
    use proptest::prelude::*;

    fn reference(px: [u8; 4]) -> ReferenceImage {
        ReferenceImage::new(RgbaImage::from_pixel(4, 4, Rgba(px)))
    }

    // =========================================================================
    // Names and defaults
    // =========================================================================

    #[test]
    fn defaults_exist_for_every_name_but_palette_transfer() {
        for name in Filter::NAMES {
            match Filter::with_default(name) {
                Some(filter) => assert_eq!(filter.name(), name),
                None => assert_eq!(name, "palette_transfer"),
            }
        }
        assert_eq!(Filter::with_default("emboss"), None);
    }

    // =========================================================================
    // Cache keys
    // =========================================================================

    #[test]
    fn cache_key_is_prefixed_with_name() {
        assert!(Filter::Sepia(0.5).cache_key().starts_with("sepia:"));
    }

    #[test]
    fn negative_zero_shares_key_with_zero() {
        assert_eq!(
            Filter::Brightness(0.0).cache_key(),
            Filter::Brightness(-0.0).cache_key()
        );
    }

    #[test]
    fn same_value_different_kind_differs() {
        assert_ne!(
            Filter::Brightness(0.5).cache_key(),
            Filter::Exposure(0.5).cache_key()
        );
        assert_ne!(Filter::Grayscale.cache_key(), Filter::Negative.cache_key());
    }

    #[test]
    fn pair_order_matters() {
        let a = Filter::Vignette {
            start: 0.2,
            end: 0.8,
        };
        let b = Filter::Vignette {
            start: 0.8,
            end: 0.2,
        };
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn color_contributes_to_key() {
        let red = Filter::Monochrome {
            intensity: 1.0,
            color: Color::rgb(255, 0, 0),
        };
        let blue = Filter::Monochrome {
            intensity: 1.0,
            color: Color::rgb(0, 0, 255),
        };
        assert_ne!(red.cache_key(), blue.cache_key());
    }

    #[test]
    fn reference_pixels_not_identity_decide_key() {
        let a = Filter::PaletteTransfer {
            intensity: 1.0,
            reference: reference([1, 2, 3, 255]),
        };
        let same_pixels = Filter::PaletteTransfer {
            intensity: 1.0,
            reference: reference([1, 2, 3, 255]),
        };
        let other = Filter::PaletteTransfer {
            intensity: 1.0,
            reference: reference([9, 2, 3, 255]),
        };
        assert_eq!(a.cache_key(), same_pixels.cache_key());
        assert_ne!(a.cache_key(), other.cache_key());
    }

    proptest! {
        #[test]
        fn equal_parameters_give_equal_keys(a in -1000.0f32..1000.0, b in -1000.0f32..1000.0) {
            let x = Filter::WhiteBalance { temperature: a, tint: b };
            let y = Filter::WhiteBalance { temperature: a, tint: b };
            prop_assert_eq!(x.cache_key(), y.cache_key());
        }

        #[test]
        fn different_parameters_give_different_keys(a in -1000.0f32..1000.0, b in -1000.0f32..1000.0) {
            prop_assume!(a != b);
            prop_assert_ne!(Filter::Contrast(a).cache_key(), Filter::Contrast(b).cache_key());
        }
    }

    // =========================================================================
    // apply
    // =========================================================================

    #[test]
    fn apply_keeps_dimensions() {
        let img = DynamicImage::new_rgb8(13, 7);
        for name in Filter::NAMES {
            if let Some(filter) = Filter::with_default(name) {
                let out = filter.apply(&img).unwrap();
                assert_eq!(out.dimensions(), (13, 7), "{name}");
            }
        }
    }

    #[test]
    fn non_finite_parameter_is_rejected() {
        let img = DynamicImage::new_rgb8(2, 2);
        let err = Filter::Gamma(f32::NAN).apply(&img).unwrap_err();
        assert!(matches!(err, FilterError::InvalidParameter { filter: "gamma", .. }));
    }

    #[test]
    fn posterize_needs_a_level() {
        let img = DynamicImage::new_rgb8(2, 2);
        assert!(Filter::Posterize(0.0).apply(&img).is_err());
    }

    #[test]
    fn empty_reference_is_an_error() {
        let filter = Filter::PaletteTransfer {
            intensity: 1.0,
            reference: ReferenceImage::new(RgbaImage::new(0, 0)),
        };
        assert_eq!(
            filter.apply(&DynamicImage::new_rgb8(2, 2)).unwrap_err(),
            FilterError::EmptyReference
        );
    }

    #[test]
    fn negative_inverts_pixels() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 100, 255, 255])));
        let out = Filter::Negative.apply(&img).unwrap().to_rgba8();
        assert_eq!(out.get_pixel(0, 0).0, [255, 155, 0, 255]);
    }
}
