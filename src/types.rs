//! Small value types shared by every layer: image references and colors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Reference to an image source.
///
/// Plain filesystem paths and `file://` URIs resolve to a path. Any other
/// scheme (`content://`, `https://`) is carried verbatim so that navigation
/// payloads survive a round trip, but backends cannot open it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uri(String);

impl Uri {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem path this URI points at, if it has one.
    pub fn to_path(&self) -> Option<PathBuf> {
        if let Some(rest) = self.0.strip_prefix("file://") {
            return Some(PathBuf::from(rest));
        }
        if self.0.contains("://") || self.0.is_empty() {
            return None;
        }
        Some(PathBuf::from(&self.0))
    }

    /// Last path segment without its extension.
    pub fn file_stem(&self) -> Option<String> {
        let last = self.0.rsplit(['/', '\\']).next()?;
        let stem = match last.rfind('.') {
            Some(0) | None => last,
            Some(dot) => &last[..dot],
        };
        if stem.is_empty() {
            None
        } else {
            Some(stem.to_string())
        }
    }

    /// Lowercased extension of the last path segment.
    pub fn extension(&self) -> Option<String> {
        let last = self.0.rsplit(['/', '\\']).next()?;
        match last.rfind('.') {
            Some(dot) if dot > 0 && dot + 1 < last.len() => Some(last[dot + 1..].to_lowercase()),
            _ => None,
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Uri {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&Path> for Uri {
    fn from(value: &Path) -> Self {
        Self::from_path(value)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid color {0:?}: expected #rrggbb or #rrggbbaa")]
pub struct ColorParseError(pub String);

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channels normalized to `0.0..=1.0`.
    pub fn to_unit(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(err)?;
        if !hex.is_ascii() || !(hex.len() == 6 || hex.len() == 8) {
            return Err(err());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_path_resolves() {
        let uri = Uri::new("/photos/001-dawn.jpg");
        assert_eq!(uri.to_path(), Some(PathBuf::from("/photos/001-dawn.jpg")));
    }

    #[test]
    fn file_scheme_resolves() {
        let uri = Uri::new("file:///tmp/a.png");
        assert_eq!(uri.to_path(), Some(PathBuf::from("/tmp/a.png")));
    }

    #[test]
    fn content_scheme_has_no_path() {
        let uri = Uri::new("content://media/external/images/42");
        assert_eq!(uri.to_path(), None);
        assert_eq!(uri.file_stem().as_deref(), Some("42"));
    }

    #[test]
    fn stem_and_extension() {
        let uri = Uri::new("/a/b/holiday.photo.JPG");
        assert_eq!(uri.file_stem().as_deref(), Some("holiday.photo"));
        assert_eq!(uri.extension().as_deref(), Some("jpg"));
    }

    #[test]
    fn hidden_file_has_no_extension() {
        let uri = Uri::new("/a/.profile");
        assert_eq!(uri.extension(), None);
        assert_eq!(uri.file_stem().as_deref(), Some(".profile"));
    }

    #[test]
    fn color_parses_rgb_and_rgba() {
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color::rgb(255, 128, 0));
        assert_eq!(
            "#00000080".parse::<Color>().unwrap(),
            Color::rgba(0, 0, 0, 128)
        );
    }

    #[test]
    fn color_rejects_garbage() {
        assert!("ff8000".parse::<Color>().is_err());
        assert!("#ff80".parse::<Color>().is_err());
        assert!("#gg8000".parse::<Color>().is_err());
    }

    #[test]
    fn color_hex_omits_opaque_alpha() {
        assert_eq!(Color::rgb(1, 2, 3).to_hex(), "#010203");
        assert_eq!(Color::rgba(1, 2, 3, 4).to_hex(), "#01020304");
    }
}
