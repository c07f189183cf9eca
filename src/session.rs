//! Per-screen orchestration.
//!
//! A session owns the state a screen renders from and at most one
//! background batch. Methods are called from the UI thread; batch events
//! arrive over a channel and are folded into the state by [`poll`] (non
//! blocking) or [`wait`] (blocking). Nothing else mutates the state.
//!
//! Starting a new save while one is running cancels the old one; its
//! remaining events are discarded.
//!
//! [`poll`]: ResizeSession::poll
//! [`wait`]: ResizeSession::wait

use crate::batch::{BatchEvent, BatchHandle, BatchOutcome, BatchRequest, ItemStatus, share_images, spawn_batch};
use crate::cache::{PreviewCache, hash_image};
use crate::file::FileController;
use crate::filters::{Filter, FilterChain, FilterError, SizeHint, Transformation, previews};
use crate::imaging::{BackendError, ImageBackend, ImageFormat, ImageInfo, LimitsPolicy, Quality, ResizeType};
use crate::presets::Preset;
use crate::types::Uri;
use image::{DynamicImage, GenericImageView};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use tracing::{debug, warn};

/// Progress of the current or last batch, as the UI shows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchProgress {
    pub running: bool,
    pub done: usize,
    pub total: usize,
    pub failures: Vec<(Uri, String)>,
    pub last_outcome: Option<BatchOutcome>,
}

impl BatchProgress {
    /// Fold one event in. Returns the outcome when the batch finished.
    fn apply(&mut self, event: BatchEvent) -> Option<BatchOutcome> {
        match event {
            BatchEvent::Started { total } => {
                self.running = true;
                self.done = 0;
                self.total = total;
                self.failures.clear();
            }
            BatchEvent::Item {
                uri,
                status: ItemStatus::Failed(reason),
                ..
            } => self.failures.push((uri, reason)),
            BatchEvent::Item { .. } => {}
            BatchEvent::Progress { done, total } => {
                self.done = done;
                self.total = total;
            }
            BatchEvent::Finished(outcome) => {
                self.running = false;
                self.last_outcome = Some(outcome.clone());
                return Some(outcome);
            }
        }
        None
    }
}

struct Job {
    handle: BatchHandle,
    events: Receiver<BatchEvent>,
}

/// The single background job a session may own.
#[derive(Default)]
struct JobSlot(Option<Job>);

impl JobSlot {
    fn start<B, F>(
        &mut self,
        backend: &Arc<B>,
        controller: &Arc<F>,
        request: BatchRequest,
        progress: &mut BatchProgress,
    ) -> io::Result<()>
    where
        B: ImageBackend + Send + ?Sized + 'static,
        F: FileController + ?Sized + 'static,
    {
        if let Some(previous) = self.0.take() {
            debug!("cancelling previous batch");
            previous.handle.cancel();
        }
        let (tx, rx) = mpsc::channel();
        let total = request.uris.len();
        let handle = spawn_batch(Arc::clone(backend), Arc::clone(controller), request, tx)?;
        *progress = BatchProgress {
            running: true,
            total,
            last_outcome: progress.last_outcome.take(),
            ..BatchProgress::default()
        };
        self.0 = Some(Job { handle, events: rx });
        Ok(())
    }

    fn cancel(&self) {
        if let Some(job) = &self.0 {
            job.handle.cancel();
        }
    }

    fn poll(&mut self, progress: &mut BatchProgress) -> Option<BatchOutcome> {
        let job = self.0.as_ref()?;
        loop {
            match job.events.try_recv() {
                Ok(event) => {
                    if let Some(outcome) = progress.apply(event) {
                        self.0 = None;
                        return Some(outcome);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => {
                    warn!("batch thread ended without an outcome");
                    progress.running = false;
                    self.0 = None;
                    return None;
                }
            }
        }
    }

    fn wait(&mut self, progress: &mut BatchProgress) -> Option<BatchOutcome> {
        let job = self.0.take()?;
        for event in job.events.iter() {
            if let Some(outcome) = progress.apply(event) {
                return Some(outcome);
            }
        }
        progress.running = false;
        job.handle.join().ok()
    }
}

/// Decode `uri` and shrink it for display.
fn load_preview<B: ImageBackend + ?Sized>(
    backend: &B,
    uri: &Uri,
) -> Result<(DynamicImage, (u32, u32)), BackendError> {
    let data = backend.get_image(uri)?;
    let size = data.image.dimensions();
    Ok((backend.scale_until_can_show(data.image), size))
}

// ============================================================================
// Resize and convert
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ResizeState {
    pub uris: Vec<Uri>,
    pub selected: Option<Uri>,
    /// Size of the selected source before display scaling.
    pub source_size: Option<(u32, u32)>,
    pub preview: Option<DynamicImage>,
    pub info: ImageInfo,
    pub preset: Preset,
    pub keep_metadata: bool,
    pub progress: BatchProgress,
}

/// Resize/convert screen: pick sources, tune the target, save or share.
pub struct ResizeSession<B: ?Sized, F: ?Sized> {
    backend: Arc<B>,
    controller: Arc<F>,
    state: ResizeState,
    job: JobSlot,
}

impl<B, F> ResizeSession<B, F>
where
    B: ImageBackend + Send + ?Sized + 'static,
    F: FileController + ?Sized + 'static,
{
    pub fn new(backend: Arc<B>, controller: Arc<F>, keep_metadata: bool) -> Self {
        Self {
            backend,
            controller,
            state: ResizeState {
                keep_metadata,
                ..ResizeState::default()
            },
            job: JobSlot::default(),
        }
    }

    pub fn state(&self) -> &ResizeState {
        &self.state
    }

    /// Replace the source list and select the first entry that decodes.
    ///
    /// The whole list is kept either way; the batch accounts for sources that
    /// fail. Errors only when no entry could be previewed.
    pub fn update_uris(&mut self, uris: Vec<Uri>) -> Result<(), BackendError> {
        self.state.uris = uris;
        self.state.selected = None;
        self.state.preview = None;
        self.state.source_size = None;
        let mut last_error = None;
        for uri in self.state.uris.clone() {
            match self.select_uri(uri.clone()) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(uri = %uri, error = %e, "no preview for source");
                    last_error = Some(e);
                }
            }
        }
        last_error.map_or(Ok(()), Err)
    }

    /// Load `uri` as the preview. An unset target size takes the source size.
    pub fn select_uri(&mut self, uri: Uri) -> Result<(), BackendError> {
        let (preview, size) = load_preview(self.backend.as_ref(), &uri)?;
        self.state.preview = Some(preview);
        self.state.source_size = Some(size);
        self.state.selected = Some(uri);
        if !self.state.info.can_save() {
            self.state.info = self.state.info.clone().with_size(size.0, size.1);
        }
        Ok(())
    }

    pub fn set_width(&mut self, width: u32) {
        self.state.info = self.state.info.clone().with_size(width, self.state.info.height);
        self.state.preset = Preset::None;
    }

    pub fn set_height(&mut self, height: u32) {
        self.state.info = self.state.info.clone().with_size(self.state.info.width, height);
        self.state.preset = Preset::None;
    }

    pub fn set_format(&mut self, format: ImageFormat) {
        self.state.info = self.state.info.clone().with_format(format);
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.state.info = self.state.info.clone().with_quality(quality);
    }

    pub fn set_resize_type(&mut self, resize_type: ResizeType) {
        self.state.info = self.state.info.clone().with_resize_type(resize_type);
    }

    pub fn rotate_left(&mut self) {
        let degrees = self.state.info.rotation_degrees as i32 - 90;
        self.state.info = self.state.info.clone().with_rotation(degrees);
    }

    pub fn rotate_right(&mut self) {
        let degrees = self.state.info.rotation_degrees as i32 + 90;
        self.state.info = self.state.info.clone().with_rotation(degrees);
    }

    pub fn flip(&mut self) {
        let flipped = !self.state.info.flipped;
        self.state.info = self.state.info.clone().with_flip(flipped);
    }

    pub fn set_keep_metadata(&mut self, keep: bool) {
        self.state.keep_metadata = keep;
    }

    /// Apply a preset against the selected source's size.
    pub fn set_preset(&mut self, preset: Preset) {
        let source = self.state.source_size.unwrap_or(self.state.info.size());
        self.state.info = preset.apply(&self.state.info, source);
        self.state.preset = preset;
    }

    pub fn can_save(&self) -> bool {
        !self.state.uris.is_empty() && self.state.info.can_save()
    }

    /// The batch [`save`](Self::save) would run.
    pub fn request(&self) -> BatchRequest {
        BatchRequest {
            uris: self.state.uris.clone(),
            info: self.state.info.clone(),
            filters: FilterChain::default(),
            keep_metadata: self.state.keep_metadata,
        }
    }

    /// Start saving every source in the background.
    pub fn save(&mut self) -> io::Result<()> {
        let request = self.request();
        self.job
            .start(&self.backend, &self.controller, request, &mut self.state.progress)
    }

    /// Write share copies through `controller`, blocking until done.
    pub fn share(&mut self, controller: &(impl FileController + ?Sized)) -> Vec<PathBuf> {
        let request = self.request();
        let progress = &mut self.state.progress;
        progress.running = true;
        let paths = share_images(self.backend.as_ref(), controller, &request, |done, total| {
            progress.done = done;
            progress.total = total;
        });
        progress.running = false;
        paths
    }

    pub fn cancel(&self) {
        self.job.cancel();
    }

    pub fn is_saving(&self) -> bool {
        self.state.progress.running
    }

    /// Apply pending batch events. `Some` once the batch has finished.
    pub fn poll(&mut self) -> Option<BatchOutcome> {
        self.job.poll(&mut self.state.progress)
    }

    /// Block until the running batch finishes.
    pub fn wait(&mut self) -> Option<BatchOutcome> {
        self.job.wait(&mut self.state.progress)
    }
}

// ============================================================================
// Filters
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FilterState {
    pub uris: Vec<Uri>,
    pub selected: Option<Uri>,
    /// Selected source, scaled for display.
    pub source: Option<DynamicImage>,
    source_hash: Option<String>,
    pub filters: FilterChain,
    pub preview: Option<DynamicImage>,
    pub preview_size: SizeHint,
    pub info: ImageInfo,
    pub keep_metadata: bool,
    pub progress: BatchProgress,
}

/// Filter screen: build a chain, preview it on one source, save all.
pub struct FilterSession<B: ?Sized, F: ?Sized> {
    backend: Arc<B>,
    controller: Arc<F>,
    cache: Option<PreviewCache>,
    state: FilterState,
    job: JobSlot,
}

impl<B, F> FilterSession<B, F>
where
    B: ImageBackend + Send + ?Sized + 'static,
    F: FileController + ?Sized + 'static,
{
    pub fn new(backend: Arc<B>, controller: Arc<F>, preview_size: SizeHint) -> Self {
        Self {
            backend,
            controller,
            cache: None,
            state: FilterState {
                preview_size,
                ..FilterState::default()
            },
            job: JobSlot::default(),
        }
    }

    /// Serve previews from (and store them in) `cache`.
    pub fn with_cache(mut self, cache: PreviewCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&PreviewCache> {
        self.cache.as_ref()
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Same selection rule as [`ResizeSession::update_uris`].
    pub fn update_uris(&mut self, uris: Vec<Uri>) -> Result<(), BackendError> {
        self.state.uris = uris;
        self.state.selected = None;
        self.state.source = None;
        self.state.source_hash = None;
        self.state.preview = None;
        let mut last_error = None;
        for uri in self.state.uris.clone() {
            match self.select_uri(uri.clone()) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(uri = %uri, error = %e, "no preview for source");
                    last_error = Some(e);
                }
            }
        }
        last_error.map_or(Ok(()), Err)
    }

    pub fn select_uri(&mut self, uri: Uri) -> Result<(), BackendError> {
        let (source, (width, height)) = load_preview(self.backend.as_ref(), &uri)?;
        if !self.state.info.can_save() {
            self.state.info = self.state.info.clone().with_size(width, height);
        }
        self.state.source_hash = Some(hash_image(&source));
        self.state.source = Some(source);
        self.state.selected = Some(uri);
        if let Err(e) = self.render_preview() {
            warn!(error = %e, "preview failed");
        }
        Ok(())
    }

    /// Append `filter`. A filter that fails to render leaves the chain as it was.
    pub fn add_filter(&mut self, filter: Filter) -> Result<(), FilterError> {
        let mut filters: Vec<Filter> = self.state.filters.filters().cloned().collect();
        filters.push(filter);
        self.replace_chain(filters)
    }

    /// Replace the filter at `index`. Out-of-range indexes are ignored.
    pub fn update_filter(&mut self, index: usize, filter: Filter) -> Result<(), FilterError> {
        let mut filters: Vec<Filter> = self.state.filters.filters().cloned().collect();
        let Some(slot) = filters.get_mut(index) else {
            return Ok(());
        };
        *slot = filter;
        self.replace_chain(filters)
    }

    pub fn remove_filter(&mut self, index: usize) -> Result<(), FilterError> {
        let filters: Vec<Filter> = self
            .state
            .filters
            .filters()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, f)| f.clone())
            .collect();
        self.replace_chain(filters)
    }

    /// Commit `filters` only once every one validates and the preview renders.
    fn replace_chain(&mut self, filters: Vec<Filter>) -> Result<(), FilterError> {
        for filter in &filters {
            filter.validate()?;
        }
        let chain = FilterChain::new(filters);
        let rendered = self.render(&chain)?;
        self.state.filters = chain;
        if rendered.is_some() {
            self.state.preview = rendered;
        }
        Ok(())
    }

    pub fn set_format(&mut self, format: ImageFormat) {
        self.state.info = self.state.info.clone().with_format(format);
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.state.info = self.state.info.clone().with_quality(quality);
    }

    pub fn set_keep_metadata(&mut self, keep: bool) {
        self.state.keep_metadata = keep;
    }

    /// Re-render the preview of the selected source through the chain.
    pub fn render_preview(&mut self) -> Result<(), FilterError> {
        let chain = self.state.filters.clone();
        if let Some(rendered) = self.render(&chain)? {
            self.state.preview = Some(rendered);
        }
        Ok(())
    }

    /// `chain` over the selected source, or `None` when nothing is selected.
    fn render(&mut self, chain: &FilterChain) -> Result<Option<DynamicImage>, FilterError> {
        let Some(source) = self.state.source.as_ref() else {
            return Ok(None);
        };
        let size = self.state.preview_size;
        let rendered = match (self.cache.as_mut(), self.state.source_hash.as_deref()) {
            (Some(cache), Some(hash)) => cache.get_or_render(hash, chain, source, size)?,
            _ => chain.transform(source, size)?,
        };
        Ok(Some(rendered))
    }

    /// One preview per candidate filter over the selected source.
    pub fn preview_strip(&self, candidates: &[Filter]) -> Vec<Result<DynamicImage, FilterError>> {
        match self.state.source.as_ref() {
            Some(source) => previews(source, candidates, self.state.preview_size),
            None => Vec::new(),
        }
    }

    pub fn can_save(&self) -> bool {
        !self.state.uris.is_empty() && self.state.info.can_save()
    }

    /// The batch [`save`](Self::save) would run.
    pub fn request(&self) -> BatchRequest {
        BatchRequest {
            uris: self.state.uris.clone(),
            // Filtered output keeps each source's dimensions
            info: self
                .state
                .info
                .clone()
                .with_resize_type(ResizeType::Limits {
                    on_smaller: LimitsPolicy::Recode,
                })
                .with_size(u32::MAX, u32::MAX),
            filters: self.state.filters.clone(),
            keep_metadata: self.state.keep_metadata,
        }
    }

    /// Save every source through the chain at its own size.
    pub fn save(&mut self) -> io::Result<()> {
        let request = self.request();
        self.job
            .start(&self.backend, &self.controller, request, &mut self.state.progress)
    }

    pub fn cancel(&self) {
        self.job.cancel();
    }

    pub fn is_saving(&self) -> bool {
        self.state.progress.running
    }

    pub fn poll(&mut self) -> Option<BatchOutcome> {
        self.job.poll(&mut self.state.progress)
    }

    pub fn wait(&mut self) -> Option<BatchOutcome> {
        self.job.wait(&mut self.state.progress)
    }
}
