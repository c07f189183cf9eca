//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{LimitsPolicy, ResizeType};

/// Largest dimensions that fit inside `bounds` while keeping the source
/// aspect ratio. Upscales when the source is smaller than the box.
///
/// Each edge is at least 1px.
pub fn calculate_fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;

    let ratio = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * ratio).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * ratio).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}

/// Calculate dimensions needed to fill a target area.
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        // Source is wider: height will match, width will exceed
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w, h)
    } else {
        // Source is taller: width will match, height will exceed
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h)
    }
}

/// Dimensions for a limits resize, or `None` when the image is skipped.
///
/// Sources larger than `limits` on either edge are shrunk to fit. Sources
/// already inside the box follow `on_smaller`.
pub fn calculate_limits_dimensions(
    source: (u32, u32),
    limits: (u32, u32),
    on_smaller: LimitsPolicy,
) -> Option<(u32, u32)> {
    let exceeds = source.0 > limits.0 || source.1 > limits.1;
    if exceeds {
        return Some(calculate_fit_dimensions(source, limits));
    }
    match on_smaller {
        LimitsPolicy::Skip => None,
        LimitsPolicy::Recode => Some(source),
        LimitsPolicy::Zoom => Some(calculate_fit_dimensions(source, limits)),
    }
}

/// Output dimensions for a resize request.
///
/// Returns `None` when nothing should be produced: a zero-sized source or
/// target, or a [`LimitsPolicy::Skip`] on an image that already fits.
/// For [`ResizeType::CenterCrop`] this is the final, post-crop size.
pub fn calculate_resize_dimensions(
    source: (u32, u32),
    target: (u32, u32),
    resize_type: ResizeType,
) -> Option<(u32, u32)> {
    if source.0 == 0 || source.1 == 0 || target.0 == 0 || target.1 == 0 {
        return None;
    }
    match resize_type {
        ResizeType::Explicit | ResizeType::CenterCrop => Some(target),
        ResizeType::Fit => Some(calculate_fit_dimensions(source, target)),
        ResizeType::Fill => Some(calculate_fill_dimensions(source, target)),
        ResizeType::Limits { on_smaller } => calculate_limits_dimensions(source, target, on_smaller),
    }
}

/// Fit inside a bounding box without ever upscaling.
///
/// Used by preview transformations. `None` for a zero-sized box or source.
pub fn calculate_bounded_dimensions(source: (u32, u32), bounds: (u32, u32)) -> Option<(u32, u32)> {
    if source.0 == 0 || source.1 == 0 || bounds.0 == 0 || bounds.1 == 0 {
        return None;
    }
    if source.0 <= bounds.0 && source.1 <= bounds.1 {
        return Some(source);
    }
    Some(calculate_fit_dimensions(source, bounds))
}

/// Halve the image until its pixel count is at most `max_pixels`.
pub fn calculate_displayable_dimensions(source: (u32, u32), max_pixels: u64) -> (u32, u32) {
    let (mut w, mut h) = source;
    while (w as u64) * (h as u64) > max_pixels && w > 1 && h > 1 {
        w = (w / 2).max(1);
        h = (h / 2).max(1);
    }
    (w, h)
}

/// Scale both edges to `percent` of the source, at least 1px each.
pub fn scale_by_percent(source: (u32, u32), percent: u32) -> (u32, u32) {
    let scale = |v: u32| ((v as f64 * percent as f64 / 100.0).round() as u32).max(1);
    (scale(source.0), scale(source.1))
}

/// Dimensions after a clockwise rotation by a multiple of 90 degrees.
pub fn rotated_dimensions(source: (u32, u32), degrees: u32) -> (u32, u32) {
    if degrees % 180 == 90 {
        (source.1, source.0)
    } else {
        source
    }
}
