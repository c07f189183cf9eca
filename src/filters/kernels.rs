// ============================================================================
// FILTER KERNELS: CPU pixel routines behind every Filter variant
// ============================================================================
//
// Every kernel takes an RGBA buffer and returns a new one. Channels are worked
// on as f32 in 0..1; alpha is never touched. Row loops are parallelized via
// rayon. Parameters are assumed validated by the caller (Filter::apply).
// ============================================================================

use image::{RgbaImage, imageops};
use rayon::prelude::*;

/// Rec. 709 luminance weights.
const LUMA: [f32; 3] = [0.2125, 0.7154, 0.0721];

type Rgb = [f32; 3];

#[inline]
fn luminance(c: Rgb) -> f32 {
    c[0] * LUMA[0] + c[1] * LUMA[1] + c[2] * LUMA[2]
}

#[inline]
fn mix(a: Rgb, b: Rgb, t: f32) -> Rgb {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[inline]
fn to_byte(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

#[inline]
fn read_rgb(px: &[u8]) -> Rgb {
    [
        px[0] as f32 / 255.0,
        px[1] as f32 / 255.0,
        px[2] as f32 / 255.0,
    ]
}

#[inline]
fn write_rgb(px: &mut [u8], c: Rgb) {
    px[0] = to_byte(c[0]);
    px[1] = to_byte(c[1]);
    px[2] = to_byte(c[2]);
}

// ============================================================================
// HELPERS: parallel per-pixel transforms
// ============================================================================

/// Apply `transform(x, y, rgb)` to every pixel, one rayon task per row.
fn map_pixels_at<F>(src: &RgbaImage, transform: F) -> RgbaImage
where
    F: Fn(u32, u32, Rgb) -> Rgb + Sync,
{
    let mut out = src.clone();
    let (w, h) = out.dimensions();
    if w == 0 || h == 0 {
        return out;
    }
    let stride = w as usize * 4;
    let raw: &mut [u8] = &mut out;
    raw.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let c = transform(x as u32, y as u32, read_rgb(px));
            write_rgb(px, c);
        }
    });
    out
}

fn map_pixels<F>(src: &RgbaImage, transform: F) -> RgbaImage
where
    F: Fn(Rgb) -> Rgb + Sync,
{
    map_pixels_at(src, |_, _, c| transform(c))
}

/// Combine two same-sized buffers pixel by pixel into a copy of `a`.
fn zip_pixels<F>(a: &RgbaImage, b: &RgbaImage, combine: F) -> RgbaImage
where
    F: Fn(Rgb, Rgb) -> Rgb + Sync,
{
    let mut out = a.clone();
    let (w, h) = out.dimensions();
    if w == 0 || h == 0 || b.dimensions() != (w, h) {
        return out;
    }
    let stride = w as usize * 4;
    let other = b.as_raw();
    let raw: &mut [u8] = &mut out;
    raw.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        let row_b = &other[y * stride..(y + 1) * stride];
        for (px, px_b) in row.chunks_exact_mut(4).zip(row_b.chunks_exact(4)) {
            let c = combine(read_rgb(px), read_rgb(px_b));
            write_rgb(px, c);
        }
    });
    out
}

// ============================================================================
// COLOR ADJUSTMENTS
// ============================================================================

/// Adds `amount` (-1..1) to every channel.
pub fn brightness(src: &RgbaImage, amount: f32) -> RgbaImage {
    map_pixels(src, |c| c.map(|v| v + amount))
}

/// Scales distance from mid-grey by `amount` (0..4, 1 = identity).
pub fn contrast(src: &RgbaImage, amount: f32) -> RgbaImage {
    map_pixels(src, |c| c.map(|v| (v - 0.5) * amount + 0.5))
}

/// Mixes each pixel with its luminance. 0 = greyscale, 1 = identity.
pub fn saturation(src: &RgbaImage, amount: f32) -> RgbaImage {
    map_pixels(src, |c| {
        let l = luminance(c);
        mix([l, l, l], c, amount)
    })
}

/// Multiplies by `2^ev`.
pub fn exposure(src: &RgbaImage, ev: f32) -> RgbaImage {
    let factor = 2f32.powf(ev);
    map_pixels(src, |c| c.map(|v| v * factor))
}

pub fn gamma(src: &RgbaImage, gamma: f32) -> RgbaImage {
    map_pixels(src, |c| c.map(|v| v.max(0.0).powf(gamma)))
}

/// Rotates hue by `degrees` in YIQ space.
pub fn hue(src: &RgbaImage, degrees: f32) -> RgbaImage {
    let shift = -degrees.to_radians();
    map_pixels(src, |[r, g, b]| {
        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        let i = 0.595_716 * r - 0.274_453 * g - 0.321_263 * b;
        let q = 0.211_456 * r - 0.522_591 * g + 0.311_135 * b;

        let chroma = (i * i + q * q).sqrt();
        let angle = q.atan2(i) + shift;
        let (i, q) = (chroma * angle.cos(), chroma * angle.sin());

        [
            y + 0.9563 * i + 0.6210 * q,
            y - 0.2721 * i - 0.6474 * q,
            y - 1.1070 * i + 1.7046 * q,
        ]
    })
}

/// Boosts muted colors more than saturated ones. Negative values mute.
pub fn vibrance(src: &RgbaImage, amount: f32) -> RgbaImage {
    map_pixels(src, |c| {
        let average = (c[0] + c[1] + c[2]) / 3.0;
        let max = c[0].max(c[1]).max(c[2]);
        let t = (max - average) * (-amount * 3.0);
        mix(c, [max, max, max], t)
    })
}

pub fn sepia(src: &RgbaImage, intensity: f32) -> RgbaImage {
    map_pixels(src, |[r, g, b]| {
        let toned = [
            0.3588 * r + 0.7044 * g + 0.1368 * b,
            0.2990 * r + 0.5870 * g + 0.1140 * b,
            0.2392 * r + 0.4696 * g + 0.0912 * b,
        ];
        mix([r, g, b], toned, intensity)
    })
}

pub fn grayscale(src: &RgbaImage) -> RgbaImage {
    map_pixels(src, |c| {
        let l = luminance(c);
        [l, l, l]
    })
}

pub fn negative(src: &RgbaImage) -> RgbaImage {
    map_pixels(src, |c| c.map(|v| 1.0 - v))
}

/// Quantizes each channel to `levels` steps.
pub fn posterize(src: &RgbaImage, levels: u32) -> RgbaImage {
    let levels = levels.clamp(1, 256) as f32;
    map_pixels(src, |c| c.map(|v| (v * levels + 0.5).floor() / levels))
}

/// Inverts pixels whose luminance is at or above `threshold`.
pub fn solarize(src: &RgbaImage, threshold: f32) -> RgbaImage {
    map_pixels(src, |c| {
        if luminance(c) >= threshold {
            c.map(|v| 1.0 - v)
        } else {
            c
        }
    })
}

/// Darkens toward the edges between normalized radii `start` and `end`.
pub fn vignette(src: &RgbaImage, start: f32, end: f32) -> RgbaImage {
    let (w, h) = src.dimensions();
    map_pixels_at(src, |x, y, c| {
        let u = (x as f32 + 0.5) / w as f32 - 0.5;
        let v = (y as f32 + 0.5) / h as f32 - 0.5;
        let d = (u * u + v * v).sqrt();
        let keep = 1.0 - smoothstep(start, end, d);
        c.map(|ch| ch * keep)
    })
}

/// `temperature` in Kelvin (5000 = neutral), `tint` in -200..200.
pub fn white_balance(src: &RgbaImage, temperature: f32, tint: f32) -> RgbaImage {
    const WARM: Rgb = [0.93, 0.54, 0.0];
    let temp = if temperature < 5000.0 {
        0.0004 * (temperature - 5000.0)
    } else {
        0.00006 * (temperature - 5000.0)
    };
    let tint = tint / 100.0;

    map_pixels(src, |[r, g, b]| {
        let y = 0.299 * r + 0.587 * g + 0.114 * b;
        let i = 0.596 * r - 0.274 * g - 0.322 * b;
        let q = (0.212 * r - 0.523 * g + 0.311 * b + tint * 0.5226 * 0.1).clamp(-0.5226, 0.5226);
        let rgb = [
            y + 0.956 * i + 0.621 * q,
            y - 0.272 * i - 0.647 * q,
            y - 1.105 * i + 1.702 * q,
        ];

        let mut processed = [0.0; 3];
        for ch in 0..3 {
            processed[ch] = if rgb[ch] < 0.5 {
                2.0 * rgb[ch] * WARM[ch]
            } else {
                1.0 - 2.0 * (1.0 - rgb[ch]) * (1.0 - WARM[ch])
            };
        }
        mix(rgb, processed, temp)
    })
}

/// `shadows` 0..1 lifts dark tones, `highlights` 0..1 (1 = identity) pulls bright ones.
pub fn highlights_shadows(src: &RgbaImage, highlights: f32, shadows: f32) -> RgbaImage {
    map_pixels(src, |c| {
        let l = luminance(c);
        if l <= 0.0 {
            return c;
        }
        let shadow = (l.powf(1.0 / (shadows + 1.0)) - 0.76 * l.powf(2.0 / (shadows + 1.0)) - l)
            .clamp(0.0, 1.0);
        let inv = 1.0 - l;
        let highlight = (1.0
            - (inv.powf(1.0 / (2.0 - highlights)) - 0.8 * inv.powf(2.0 / (2.0 - highlights)))
            - l)
            .clamp(-1.0, 0.0);
        let scale = (l + shadow + highlight) / l;
        c.map(|v| v * scale)
    })
}

/// Overlay-blends the luminance with `color`, then mixes by `intensity`.
pub fn monochrome(src: &RgbaImage, intensity: f32, color: Rgb) -> RgbaImage {
    map_pixels(src, |c| {
        let l = luminance(c);
        let mut toned = [0.0; 3];
        for ch in 0..3 {
            toned[ch] = if l < 0.5 {
                2.0 * l * color[ch]
            } else {
                1.0 - 2.0 * (1.0 - l) * (1.0 - color[ch])
            };
        }
        mix(c, toned, intensity)
    })
}

pub fn color_overlay(src: &RgbaImage, intensity: f32, color: Rgb) -> RgbaImage {
    map_pixels(src, |c| mix(c, color, intensity))
}

// ============================================================================
// NEIGHBOURHOOD OPERATIONS
// ============================================================================

pub fn gaussian_blur(src: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 {
        return src.clone();
    }
    imageops::blur(src, sigma)
}

/// Unsharp mask with a fixed 1px blur radius.
pub fn sharpen(src: &RgbaImage, amount: f32) -> RgbaImage {
    if amount == 0.0 {
        return src.clone();
    }
    let blurred = imageops::blur(src, 1.0);
    zip_pixels(src, &blurred, |c, soft| {
        [
            c[0] + amount * (c[0] - soft[0]),
            c[1] + amount * (c[1] - soft[1]),
            c[2] + amount * (c[2] - soft[2]),
        ]
    })
}

/// Replaces every `size × size` block with its average color.
pub fn pixelate(src: &RgbaImage, size: u32) -> RgbaImage {
    let mut out = src.clone();
    let (w, h) = out.dimensions();
    if size <= 1 || w == 0 || h == 0 {
        return out;
    }
    let stride = w as usize * 4;
    let block = size as usize;
    let raw: &mut [u8] = &mut out;

    raw.par_chunks_mut(stride * block).for_each(|band| {
        let rows = band.len() / stride;
        for bx in (0..w as usize).step_by(block) {
            let cols = block.min(w as usize - bx);
            let mut sum = [0u64; 3];
            for row in 0..rows {
                for col in 0..cols {
                    let i = row * stride + (bx + col) * 4;
                    sum[0] += band[i] as u64;
                    sum[1] += band[i + 1] as u64;
                    sum[2] += band[i + 2] as u64;
                }
            }
            let n = (rows * cols) as u64;
            let avg = sum.map(|s| ((s + n / 2) / n) as u8);
            for row in 0..rows {
                for col in 0..cols {
                    let i = row * stride + (bx + col) * 4;
                    band[i..i + 3].copy_from_slice(&avg);
                }
            }
        }
    });
    out
}

// ============================================================================
// REFERENCE-BASED
// ============================================================================

/// Per-channel mean and standard deviation over RGB, 0..1.
fn channel_stats(img: &RgbaImage) -> (Rgb, Rgb) {
    let n = (img.width() as u64 * img.height() as u64).max(1) as f64;
    let mut sum = [0f64; 3];
    let mut sq = [0f64; 3];
    for px in img.pixels() {
        for ch in 0..3 {
            let v = px.0[ch] as f64 / 255.0;
            sum[ch] += v;
            sq[ch] += v * v;
        }
    }
    let mean = sum.map(|s| s / n);
    let mut std = [0f32; 3];
    for ch in 0..3 {
        std[ch] = (sq[ch] / n - mean[ch] * mean[ch]).max(0.0).sqrt() as f32;
    }
    (mean.map(|m| m as f32), std)
}

/// Moves the color statistics of `src` toward those of `reference`.
pub fn palette_transfer(src: &RgbaImage, intensity: f32, reference: &RgbaImage) -> RgbaImage {
    let (src_mean, src_std) = channel_stats(src);
    let (ref_mean, ref_std) = channel_stats(reference);
    let mut gain = [1.0f32; 3];
    for ch in 0..3 {
        if src_std[ch] > 1e-6 {
            gain[ch] = ref_std[ch] / src_std[ch];
        }
    }
    map_pixels(src, |c| {
        let mut moved = [0.0; 3];
        for ch in 0..3 {
            moved[ch] = (c[ch] - src_mean[ch]) * gain[ch] + ref_mean[ch];
        }
        mix(c, moved, intensity)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba(px))
    }

    #[test]
    fn brightness_shifts_and_clamps() {
        let out = brightness(&solid(2, 2, [100, 200, 250, 77]), 0.2);
        assert_eq!(out.get_pixel(0, 0).0, [151, 251, 255, 77]);
    }

    #[test]
    fn contrast_one_is_identity() {
        let src = solid(3, 3, [12, 130, 240, 255]);
        assert_eq!(contrast(&src, 1.0), src);
    }

    #[test]
    fn saturation_zero_is_grey() {
        let out = saturation(&solid(1, 1, [255, 0, 0, 255]), 0.0);
        let [r, g, b, _] = out.get_pixel(0, 0).0;
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn negative_twice_is_identity() {
        let src = RgbaImage::from_fn(4, 4, |x, y| Rgba([(x * 60) as u8, (y * 60) as u8, 7, 200]));
        assert_eq!(negative(&negative(&src)), src);
    }

    #[test]
    fn hue_zero_keeps_colors_close() {
        let src = solid(1, 1, [200, 100, 50, 255]);
        let out = hue(&src, 0.0);
        for (a, b) in src.get_pixel(0, 0).0.iter().zip(out.get_pixel(0, 0).0.iter()) {
            assert!((*a as i32 - *b as i32).abs() <= 2, "{a} vs {b}");
        }
    }

    #[test]
    fn posterize_two_levels() {
        let out = posterize(&solid(1, 1, [10, 128, 250, 255]), 1);
        assert_eq!(out.get_pixel(0, 0).0, [0, 255, 255, 255]);
    }

    #[test]
    fn solarize_inverts_bright_pixels_only() {
        let dark = solarize(&solid(1, 1, [20, 20, 20, 255]), 0.5);
        assert_eq!(dark.get_pixel(0, 0).0, [20, 20, 20, 255]);
        let bright = solarize(&solid(1, 1, [230, 230, 230, 255]), 0.5);
        assert_eq!(bright.get_pixel(0, 0).0, [25, 25, 25, 255]);
    }

    #[test]
    fn vignette_darkens_corners_not_center() {
        let out = vignette(&solid(101, 101, [200, 200, 200, 255]), 0.2, 0.6);
        assert_eq!(out.get_pixel(50, 50).0, [200, 200, 200, 255]);
        assert!(out.get_pixel(0, 0).0[0] < 100);
    }

    #[test]
    fn pixelate_averages_blocks() {
        let mut src = solid(4, 2, [0, 0, 0, 255]);
        src.put_pixel(0, 0, Rgba([100, 100, 100, 255]));
        let out = pixelate(&src, 2);
        // Left block: one 100 and three zeros → 25
        assert_eq!(out.get_pixel(1, 1).0, [25, 25, 25, 255]);
        assert_eq!(out.get_pixel(3, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn pixelate_handles_ragged_edges() {
        let src = solid(5, 3, [40, 50, 60, 255]);
        assert_eq!(pixelate(&src, 2), src);
    }

    #[test]
    fn alpha_is_preserved() {
        let src = solid(2, 2, [10, 20, 30, 42]);
        for out in [grayscale(&src), sepia(&src, 1.0), exposure(&src, 1.0), sharpen(&src, 2.0)] {
            assert_eq!(out.get_pixel(1, 1).0[3], 42);
        }
    }

    #[test]
    fn palette_transfer_matches_reference_mean() {
        let src = RgbaImage::from_fn(8, 8, |x, _| Rgba([(x * 10) as u8, 0, 0, 255]));
        let reference = RgbaImage::from_fn(8, 8, |x, _| Rgba([100 + (x * 10) as u8, 0, 0, 255]));
        let out = palette_transfer(&src, 1.0, &reference);
        let (mean, _) = channel_stats(&out);
        let (ref_mean, _) = channel_stats(&reference);
        assert!((mean[0] - ref_mean[0]).abs() < 0.01);
    }

    #[test]
    fn color_overlay_full_intensity_paints_color() {
        let out = color_overlay(&solid(1, 1, [0, 0, 0, 255]), 1.0, [1.0, 0.0, 0.0]);
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }

    #[test]
    fn empty_image_passes_through() {
        let src = RgbaImage::new(0, 0);
        assert_eq!(brightness(&src, 0.5).dimensions(), (0, 0));
        assert_eq!(pixelate(&src, 8).dimensions(), (0, 0));
    }
}
