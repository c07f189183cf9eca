//! Draw overlay model.
//!
//! Describes, independently of any renderer, what a free-hand drawing is
//! composited onto ([`DrawBehavior`]) and what the pen does ([`DrawMode`]).
//! The two path effects that alter the underlying pixels (privacy blur and
//! pixelation) are implemented here on top of the filter kernels; ordinary
//! strokes are the renderer's job.

use crate::filters::kernels;
use crate::types::Color;
use image::{DynamicImage, GenericImageView, GrayImage, Luma, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Unspecified,
    Portrait,
    Landscape,
}

/// What the drawing is laid over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DrawBehavior {
    /// No drawing session.
    None { orientation: Orientation },
    /// The source image is the canvas.
    Image { orientation: Orientation },
    /// A solid canvas of the given size.
    Background {
        orientation: Orientation,
        width: u32,
        height: u32,
        color: Color,
    },
}

impl Default for DrawBehavior {
    fn default() -> Self {
        DrawBehavior::None {
            orientation: Orientation::Unspecified,
        }
    }
}

impl DrawBehavior {
    pub fn orientation(&self) -> Orientation {
        match *self {
            DrawBehavior::None { orientation }
            | DrawBehavior::Image { orientation }
            | DrawBehavior::Background { orientation, .. } => orientation,
        }
    }

    /// Canvas dimensions when drawing over a source of size `source`.
    pub fn canvas_size(&self, source: (u32, u32)) -> (u32, u32) {
        match *self {
            DrawBehavior::None { .. } | DrawBehavior::Image { .. } => source,
            DrawBehavior::Background { width, height, .. } => (width, height),
        }
    }

    /// Blank canvas for [`DrawBehavior::Background`], `None` otherwise.
    pub fn background_canvas(&self) -> Option<RgbaImage> {
        match *self {
            DrawBehavior::Background {
                width,
                height,
                color,
                ..
            } => Some(RgbaImage::from_pixel(
                width,
                height,
                image::Rgba([color.r, color.g, color.b, color.a]),
            )),
            _ => None,
        }
    }
}

/// The active pen.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum DrawMode {
    #[default]
    Pen,
    Neon,
    Highlighter,
    PrivacyBlur { blur_radius: u32 },
    Pixelation { pixel_size: f32 },
}

impl DrawMode {
    pub const DEFAULT_BLUR_RADIUS: u32 = 20;
    pub const DEFAULT_PIXEL_SIZE: f32 = 35.0;

    pub const ALL: [DrawMode; 5] = [
        DrawMode::Pen,
        DrawMode::Neon,
        DrawMode::Highlighter,
        DrawMode::PrivacyBlur {
            blur_radius: Self::DEFAULT_BLUR_RADIUS,
        },
        DrawMode::Pixelation {
            pixel_size: Self::DEFAULT_PIXEL_SIZE,
        },
    ];

    /// Rebuild a mode from its stored ordinal, with default parameters.
    ///
    /// Total: any ordinal outside `0..=4` is [`DrawMode::Pen`].
    pub fn from_ordinal(ordinal: i32) -> Self {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    pub fn ordinal(&self) -> i32 {
        match self {
            DrawMode::Pen => 0,
            DrawMode::Neon => 1,
            DrawMode::Highlighter => 2,
            DrawMode::PrivacyBlur { .. } => 3,
            DrawMode::Pixelation { .. } => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DrawMode::Pen => "pen",
            DrawMode::Neon => "neon",
            DrawMode::Highlighter => "highlighter",
            DrawMode::PrivacyBlur { .. } => "privacy_blur",
            DrawMode::Pixelation { .. } => "pixelation",
        }
    }

    /// Whether the mode rewrites the pixels under the stroke.
    pub fn is_path_effect(&self) -> bool {
        matches!(self, DrawMode::PrivacyBlur { .. } | DrawMode::Pixelation { .. })
    }
}

impl fmt::Display for DrawMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DrawMode {
    type Err = String;

    /// Accepts a mode name or its ordinal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ordinal) = s.trim().parse::<i32>() {
            return Ok(Self::from_ordinal(ordinal));
        }
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.name() == lower)
            .ok_or_else(|| format!("unknown draw mode {s:?}"))
    }
}

/// One free-hand stroke in image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawPath {
    pub points: Vec<(f32, f32)>,
    pub stroke_width: f32,
    pub mode: DrawMode,
}

/// Squared distance from `p` to the segment `a`–`b`.
fn segment_distance_sq(p: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.0 + t * dx, a.1 + t * dy);
    (p.0 - cx).powi(2) + (p.1 - cy).powi(2)
}

/// Rasterise `path` into a coverage mask (255 under the stroke, 0 elsewhere).
pub fn stroke_mask(width: u32, height: u32, path: &DrawPath) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    let radius = (path.stroke_width / 2.0).max(0.5);
    let radius_sq = radius * radius;

    let segments: Vec<((f32, f32), (f32, f32))> = match path.points.as_slice() {
        [] => Vec::new(),
        [only] => vec![(*only, *only)],
        points => points.windows(2).map(|w| (w[0], w[1])).collect(),
    };

    for (a, b) in segments {
        let min_x = (a.0.min(b.0) - radius).floor().max(0.0) as u32;
        let min_y = (a.1.min(b.1) - radius).floor().max(0.0) as u32;
        let max_x = ((a.0.max(b.0) + radius).ceil().max(0.0) as u32).min(width);
        let max_y = ((a.1.max(b.1) + radius).ceil().max(0.0) as u32).min(height);
        for y in min_y..max_y {
            for x in min_x..max_x {
                let centre = (x as f32 + 0.5, y as f32 + 0.5);
                if segment_distance_sq(centre, a, b) <= radius_sq {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
    }
    mask
}

/// Apply the pixel effect of `path` to `image`.
///
/// Blur and pixelation paths replace the pixels under the stroke with the
/// blurred/pixelated image. Other modes leave the image unchanged.
pub fn apply_path_effect(image: &DynamicImage, path: &DrawPath) -> DynamicImage {
    if !path.mode.is_path_effect() {
        return image.clone();
    }
    let mut out = image.to_rgba8();
    let processed = match path.mode {
        DrawMode::PrivacyBlur { blur_radius } => {
            kernels::gaussian_blur(&out, blur_radius as f32 / 2.0)
        }
        DrawMode::Pixelation { pixel_size } => {
            kernels::pixelate(&out, pixel_size.max(1.0).round() as u32)
        }
        _ => return image.clone(),
    };

    let (w, h) = image.dimensions();
    let mask = stroke_mask(w, h, path);
    for (x, y, m) in mask.enumerate_pixels() {
        if m.0[0] > 0 {
            out.put_pixel(x, y, *processed.get_pixel(x, y));
        }
    }
    DynamicImage::ImageRgba8(out)
}
