//! One-tap resize presets.
//!
//! The resize screen offers the user's percentage list (from settings) plus
//! a Telegram sticker preset. Applying a preset derives a new [`ImageInfo`]
//! from the current one and the source size.

use crate::imaging::calculations::scale_by_percent;
use crate::imaging::{ImageFormat, ImageInfo, Quality, ResizeType};
use std::fmt;
use std::str::FromStr;

/// Telegram stickers must fit 512×512.
pub const TELEGRAM_SIZE: u32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Preset {
    #[default]
    None,
    Telegram,
    /// Percent of the source size, also used as the encoder quality.
    Numeric(u32),
}

impl Preset {
    /// The presets offered for a settings list, Telegram first.
    pub fn from_settings(percentages: &[u32]) -> Vec<Preset> {
        std::iter::once(Preset::Telegram)
            .chain(
                percentages
                    .iter()
                    .filter(|p| (1..=100).contains(*p))
                    .map(|p| Preset::Numeric(*p)),
            )
            .collect()
    }

    pub fn apply(self, info: &ImageInfo, source: (u32, u32)) -> ImageInfo {
        match self {
            Preset::None => info.clone(),
            Preset::Telegram => info
                .clone()
                .with_size(TELEGRAM_SIZE, TELEGRAM_SIZE)
                .with_format(ImageFormat::Png)
                .with_resize_type(ResizeType::Fit),
            Preset::Numeric(percent) => {
                let (width, height) = scale_by_percent(source, percent);
                let info = info.clone().with_size(width, height);
                if info.format.supports_quality() {
                    info.with_quality(Quality::new(percent))
                } else {
                    info
                }
            }
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::None => f.write_str("none"),
            Preset::Telegram => f.write_str("telegram"),
            Preset::Numeric(p) => write!(f, "{p}%"),
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    /// `none`, `telegram`, `75` or `75%`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Preset::None),
            "telegram" | "tg" => Ok(Preset::Telegram),
            other => other
                .trim_end_matches('%')
                .parse::<u32>()
                .ok()
                .filter(|p| (1..=100).contains(p))
                .map(Preset::Numeric)
                .ok_or_else(|| format!("invalid preset {s:?}: expected none, telegram or 1-100")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_scales_size_and_quality() {
        let info = ImageInfo::new(10, 10).with_format(ImageFormat::Jpeg);
        let out = Preset::Numeric(50).apply(&info, (801, 400));
        assert_eq!(out.size(), (401, 200));
        assert_eq!(out.quality, Quality::new(50));
    }

    #[test]
    fn numeric_leaves_quality_of_lossless_formats() {
        let info = ImageInfo::new(10, 10).with_format(ImageFormat::Png);
        let out = Preset::Numeric(30).apply(&info, (100, 100));
        assert_eq!(out.quality, info.quality);
    }

    #[test]
    fn telegram_fits_png_box() {
        let out = Preset::Telegram.apply(&ImageInfo::default(), (2000, 1000));
        assert_eq!(out.size(), (512, 512));
        assert_eq!(out.format, ImageFormat::Png);
        assert_eq!(out.resize_type, ResizeType::Fit);
    }

    #[test]
    fn none_is_identity() {
        let info = ImageInfo::new(3, 4).with_rotation(90);
        assert_eq!(Preset::None.apply(&info, (100, 100)), info);
    }

    #[test]
    fn parses_and_displays() {
        assert_eq!("75%".parse::<Preset>(), Ok(Preset::Numeric(75)));
        assert_eq!("Telegram".parse::<Preset>(), Ok(Preset::Telegram));
        assert!("0".parse::<Preset>().is_err());
        assert!("150".parse::<Preset>().is_err());
        assert_eq!(Preset::Numeric(40).to_string(), "40%");
    }

    #[test]
    fn settings_list_drops_out_of_range() {
        assert_eq!(
            Preset::from_settings(&[100, 0, 250, 25]),
            vec![Preset::Telegram, Preset::Numeric(100), Preset::Numeric(25)]
        );
    }
}
