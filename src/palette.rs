//! Dominant colour extraction.
//!
//! The image is shrunk to at most [`SAMPLE_EDGE`] pixels on its long edge,
//! quantised with NeuQuant, and the palette entries are ranked by how many
//! sample pixels map to them. Entries no pixel maps to are dropped, so the
//! result can be shorter than requested.

use crate::types::Color;
use image::DynamicImage;
use image::imageops::FilterType;
use serde::Serialize;

pub const MIN_COLORS: usize = 2;
pub const MAX_COLORS: usize = 256;

/// Long edge of the sampling thumbnail.
pub const SAMPLE_EDGE: u32 = 256;

/// NeuQuant sampling factor: 1 is slowest and best, 30 fastest.
const SAMPLE_FACTOR: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Swatch {
    pub color: Color,
    /// Sample pixels closest to this colour.
    pub population: usize,
}

/// Up to `count` dominant colours, most common first. `count` is clamped to
/// `MIN_COLORS..=MAX_COLORS`.
pub fn extract_palette(image: &DynamicImage, count: usize) -> Vec<Swatch> {
    let count = count.clamp(MIN_COLORS, MAX_COLORS);
    if image.width() == 0 || image.height() == 0 {
        return Vec::new();
    }
    let sample = if image.width().max(image.height()) > SAMPLE_EDGE {
        image.resize(SAMPLE_EDGE, SAMPLE_EDGE, FilterType::Triangle)
    } else {
        image.clone()
    }
    .to_rgba8();

    let nq = color_quant::NeuQuant::new(SAMPLE_FACTOR, count, sample.as_raw());
    let mut populations = vec![0usize; count];
    for pixel in sample.pixels() {
        let index = nq.index_of(&pixel.0);
        if let Some(slot) = populations.get_mut(index) {
            *slot += 1;
        }
    }

    let mut swatches: Vec<Swatch> = populations
        .iter()
        .enumerate()
        .filter(|(_, population)| **population > 0)
        .filter_map(|(index, population)| {
            let [r, g, b, a] = nq.lookup(index)?;
            Some(Swatch {
                color: Color::rgba(r, g, b, a),
                population: *population,
            })
        })
        .collect();
    // Stable: equal populations keep palette order
    swatches.sort_by(|a, b| b.population.cmp(&a.population));
    swatches
}
