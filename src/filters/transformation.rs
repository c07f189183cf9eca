//! Size-hinted filter adapters.
//!
//! A [`Transformation`] is what the preview strip, the filter screen and the
//! batch pipeline actually run: "given this image and this bounding box,
//! give me the filtered result, and tell me how to cache it".

use super::{Filter, FilterError};
use crate::imaging::calculations::calculate_bounded_dimensions;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

/// Requested output size for a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SizeHint {
    /// Work on the input as-is.
    #[default]
    Original,
    /// Fit inside the box, aspect preserved. Never upscales.
    Bounded { width: u32, height: u32 },
}

pub trait Transformation: Send + Sync {
    fn cache_key(&self) -> String;

    fn transform(&self, input: &DynamicImage, size: SizeHint) -> Result<DynamicImage, FilterError>;
}

/// A single [`Filter`] behind the [`Transformation`] contract.
///
/// The input is first fitted to the size hint. When that fails (zero-sized
/// box or source) the input is returned unchanged and the filter is not run.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterTransformation {
    filter: Filter,
}

impl FilterTransformation {
    pub fn new(filter: Filter) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }
}

impl From<Filter> for FilterTransformation {
    fn from(filter: Filter) -> Self {
        Self::new(filter)
    }
}

/// Fit `input` into `size`. `None` when there is no non-empty fit.
fn fit_to_hint(input: &DynamicImage, size: SizeHint) -> Option<DynamicImage> {
    match size {
        SizeHint::Original => Some(input.clone()),
        SizeHint::Bounded { width, height } => {
            let source = input.dimensions();
            let (w, h) = calculate_bounded_dimensions(source, (width, height))?;
            if (w, h) == source {
                Some(input.clone())
            } else {
                Some(input.resize_exact(w, h, FilterType::Triangle))
            }
        }
    }
}

impl Transformation for FilterTransformation {
    fn cache_key(&self) -> String {
        self.filter.cache_key()
    }

    #[instrument(level = "debug", skip(self, input), fields(filter = self.filter.name()))]
    fn transform(&self, input: &DynamicImage, size: SizeHint) -> Result<DynamicImage, FilterError> {
        match fit_to_hint(input, size) {
            Some(fitted) => self.filter.apply(&fitted),
            None => {
                debug!(?size, source = ?input.dimensions(), "resize failed, returning input unfiltered");
                Ok(input.clone())
            }
        }
    }
}

/// Ordered list of filters applied one after another.
///
/// The size hint is honoured once, before the first filter. An empty chain
/// is the identity (still fitted to the hint).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChain {
    steps: Vec<FilterTransformation>,
}

impl FilterChain {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self {
            steps: filters.into_iter().map(FilterTransformation::new).collect(),
        }
    }

    pub fn push(&mut self, filter: Filter) {
        self.steps.push(FilterTransformation::new(filter));
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn filters(&self) -> impl Iterator<Item = &Filter> {
        self.steps.iter().map(FilterTransformation::filter)
    }

    /// Apply every filter at the image's own size.
    pub fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, FilterError> {
        self.transform(image, SizeHint::Original)
    }
}

impl FromIterator<Filter> for FilterChain {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Transformation for FilterChain {
    fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"chain\0");
        for step in &self.steps {
            hasher.update(step.cache_key().as_bytes());
            hasher.update(b"\0");
        }
        format!("chain:{:x}", hasher.finalize())
    }

    fn transform(&self, input: &DynamicImage, size: SizeHint) -> Result<DynamicImage, FilterError> {
        let Some(fitted) = fit_to_hint(input, size) else {
            debug!(?size, "resize failed, returning input unfiltered");
            return Ok(input.clone());
        };
        self.steps.iter().try_fold(fitted, |image, step| {
            step.transform(&image, SizeHint::Original)
        })
    }
}

/// Render one preview per filter, in parallel, in the order given.
pub fn previews(
    image: &DynamicImage,
    filters: &[Filter],
    size: SizeHint,
) -> Vec<Result<DynamicImage, FilterError>> {
    // Fit once so each worker filters the small image
    let base = fit_to_hint(image, size).unwrap_or_else(|| image.clone());
    filters
        .par_iter()
        .map(|filter| filter.apply(&base))
        .collect()
}
