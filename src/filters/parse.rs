//! Text syntax for filters: `name[:v1[:v2]]`.
//!
//! ```text
//! grayscale                   unit filter
//! brightness:0.2              scalar
//! vignette:0.3:0.75           pair
//! monochrome:0.8:#996633      scalar + color
//! palette_transfer:1:ref.jpg  scalar + reference image path
//! ```
//!
//! Omitting every argument selects the filter's defaults.

use super::{Filter, ReferenceImage};
use crate::types::{Color, ColorParseError};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty filter spec")]
    Empty,
    #[error("unknown filter {0:?}")]
    UnknownFilter(String),
    #[error("{filter} takes {expected}, got {got} argument(s)")]
    Arity {
        filter: String,
        expected: &'static str,
        got: usize,
    },
    #[error("{filter}: {value:?} is not a number")]
    InvalidNumber { filter: String, value: String },
    #[error(transparent)]
    InvalidColor(#[from] ColorParseError),
    #[error("cannot load reference image {path}: {reason}")]
    Reference { path: PathBuf, reason: String },
}

fn number(filter: &str, value: &str) -> Result<f32, ParseError> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber {
            filter: filter.to_string(),
            value: value.to_string(),
        })
}

/// Parse one filter spec. `load_reference` is only called for
/// `palette_transfer`, with the path given after the intensity.
pub fn parse_filter<L>(spec: &str, load_reference: L) -> Result<Filter, ParseError>
where
    L: FnOnce(&Path) -> Result<RgbaImage, String>,
{
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(ParseError::Empty);
    }
    let (name, rest) = match spec.split_once(':') {
        Some((name, rest)) => (name.to_ascii_lowercase(), Some(rest)),
        None => (spec.to_ascii_lowercase(), None),
    };

    if name == "palette_transfer" {
        return parse_palette_transfer(rest, load_reference);
    }

    let default = Filter::with_default(&name).ok_or_else(|| ParseError::UnknownFilter(name.clone()))?;
    let args: Vec<&str> = rest.map(|r| r.split(':').collect()).unwrap_or_default();
    if args.is_empty() {
        return Ok(default);
    }

    let arity = |expected: &'static str| ParseError::Arity {
        filter: name.clone(),
        expected,
        got: args.len(),
    };
    let num = |i: usize| number(&name, args[i]);

    let filter = match default {
        Filter::Grayscale | Filter::Negative => return Err(arity("no arguments")),
        Filter::Brightness(_)
        | Filter::Contrast(_)
        | Filter::Saturation(_)
        | Filter::Exposure(_)
        | Filter::Gamma(_)
        | Filter::Hue(_)
        | Filter::Vibrance(_)
        | Filter::Sepia(_)
        | Filter::GaussianBlur(_)
        | Filter::Sharpen(_)
        | Filter::Pixelation(_)
        | Filter::Posterize(_)
        | Filter::Solarize(_) => {
            if args.len() != 1 {
                return Err(arity("one value"));
            }
            let v = num(0)?;
            match default {
                Filter::Brightness(_) => Filter::Brightness(v),
                Filter::Contrast(_) => Filter::Contrast(v),
                Filter::Saturation(_) => Filter::Saturation(v),
                Filter::Exposure(_) => Filter::Exposure(v),
                Filter::Gamma(_) => Filter::Gamma(v),
                Filter::Hue(_) => Filter::Hue(v),
                Filter::Vibrance(_) => Filter::Vibrance(v),
                Filter::Sepia(_) => Filter::Sepia(v),
                Filter::GaussianBlur(_) => Filter::GaussianBlur(v),
                Filter::Sharpen(_) => Filter::Sharpen(v),
                Filter::Pixelation(_) => Filter::Pixelation(v),
                Filter::Posterize(_) => Filter::Posterize(v),
                _ => Filter::Solarize(v),
            }
        }
        Filter::Vignette { .. } | Filter::WhiteBalance { .. } | Filter::HighlightsShadows { .. } => {
            if args.len() != 2 {
                return Err(arity("two values"));
            }
            let (a, b) = (num(0)?, num(1)?);
            match default {
                Filter::Vignette { .. } => Filter::Vignette { start: a, end: b },
                Filter::WhiteBalance { .. } => Filter::WhiteBalance {
                    temperature: a,
                    tint: b,
                },
                _ => Filter::HighlightsShadows {
                    highlights: a,
                    shadows: b,
                },
            }
        }
        Filter::Monochrome { color, .. } | Filter::ColorOverlay { color, .. } => {
            if args.len() > 2 {
                return Err(arity("an intensity and an optional color"));
            }
            let intensity = num(0)?;
            let color = match args.get(1) {
                Some(raw) => raw.parse::<Color>()?,
                None => color,
            };
            if matches!(default, Filter::Monochrome { .. }) {
                Filter::Monochrome { intensity, color }
            } else {
                Filter::ColorOverlay { intensity, color }
            }
        }
        Filter::PaletteTransfer { .. } => return Err(ParseError::UnknownFilter(name.clone())),
    };
    Ok(filter)
}

fn parse_palette_transfer<L>(rest: Option<&str>, load_reference: L) -> Result<Filter, ParseError>
where
    L: FnOnce(&Path) -> Result<RgbaImage, String>,
{
    const NAME: &str = "palette_transfer";
    // The path is everything after the intensity, colons included
    let (intensity, path) = match rest.and_then(|r| r.split_once(':')) {
        Some((intensity, path)) if !path.is_empty() => (number(NAME, intensity)?, path),
        _ => {
            return Err(ParseError::Arity {
                filter: NAME.to_string(),
                expected: "an intensity and a reference image path",
                got: rest.map_or(0, |_| 1),
            });
        }
    };
    let path = Path::new(path);
    let pixels = load_reference(path).map_err(|reason| ParseError::Reference {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(Filter::PaletteTransfer {
        intensity,
        reference: ReferenceImage::new(pixels),
    })
}
