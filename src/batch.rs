//! Batch save and share.
//!
//! Every source goes through the same sequence, one item at a time and in
//! input order:
//!
//! ```text
//! decode → filters → resize → rotate/flip → compress → FileController::save
//! ```
//!
//! Per-item failures (decode, filter, encode, write) are counted and the loop
//! moves on. A permission failure from the controller aborts the batch: no
//! later item can succeed either. Cancellation is checked before each item
//! and never rolls back what was already written.
//!
//! [`run_batch`] is the synchronous loop and reports through a callback.
//! [`spawn_batch`] runs it on a named background thread and streams
//! [`BatchEvent`]s over a channel.

use crate::file::{FileController, SaveError, SaveResult, SaveTarget};
use crate::filters::FilterChain;
use crate::imaging::{ImageBackend, ImageInfo, process_image};
use crate::types::Uri;
use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, instrument, warn};

/// What to do with each source.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub uris: Vec<Uri>,
    /// Target descriptor; its `original_uri` is replaced per item.
    pub info: ImageInfo,
    pub filters: FilterChain,
    pub keep_metadata: bool,
}

impl BatchRequest {
    pub fn new(uris: Vec<Uri>, info: ImageInfo) -> Self {
        Self {
            uris,
            info,
            filters: FilterChain::default(),
            keep_metadata: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    Saved(PathBuf),
    /// The resize policy left nothing to write.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    Completed {
        failed: usize,
        skipped: usize,
        saving_path: String,
    },
    MissingPermissions,
    Cancelled {
        done: usize,
    },
    /// The target size cannot be saved; nothing was attempted.
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Started { total: usize },
    Item { index: usize, uri: Uri, status: ItemStatus },
    Progress { done: usize, total: usize },
    Finished(BatchOutcome),
}

/// Shared flag checked between items.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Zero width or height can never be written.
pub fn can_save(info: &ImageInfo) -> bool {
    info.can_save()
}

/// Run the whole batch on the calling thread.
///
/// `emit` sees `Started`, then per item `Item` followed by `Progress`, and
/// finally `Finished` with the same outcome this function returns.
#[instrument(skip_all, fields(total = request.uris.len()))]
pub fn run_batch(
    backend: &(impl ImageBackend + ?Sized),
    controller: &(impl FileController + ?Sized),
    request: &BatchRequest,
    cancel: &CancelToken,
    mut emit: impl FnMut(BatchEvent),
) -> BatchOutcome {
    let total = request.uris.len();
    if !can_save(&request.info) {
        warn!(size = ?request.info.size(), "refusing batch with an empty target size");
        let outcome = BatchOutcome::Rejected;
        emit(BatchEvent::Finished(outcome.clone()));
        return outcome;
    }

    emit(BatchEvent::Started { total });
    let mut done = 0;
    let mut failed = 0;
    let mut skipped = 0;

    for (index, uri) in request.uris.iter().enumerate() {
        if cancel.is_cancelled() {
            info!(done, total, "batch cancelled");
            let outcome = BatchOutcome::Cancelled { done };
            emit(BatchEvent::Finished(outcome.clone()));
            return outcome;
        }

        let target = request.info.clone().with_uri(uri.clone());
        let status = match process_image(backend, &target, &request.filters) {
            Ok(None) => {
                debug!(%uri, "skipped by resize policy");
                skipped += 1;
                ItemStatus::Skipped
            }
            Ok(Some((data, bytes))) => {
                let save = SaveTarget {
                    original_uri: Some(uri.clone()),
                    info: data.info,
                    data: bytes,
                    exif: data.exif,
                    sequence_number: Some(index + 1),
                };
                match controller.save(&save, request.keep_metadata) {
                    SaveResult::Success { path } => ItemStatus::Saved(path),
                    SaveResult::Error(SaveError::MissingPermissions(path)) => {
                        warn!(%path, "missing permissions, aborting batch");
                        emit(BatchEvent::Item {
                            index,
                            uri: uri.clone(),
                            status: ItemStatus::Failed(format!("missing permission to write {path}")),
                        });
                        let outcome = BatchOutcome::MissingPermissions;
                        emit(BatchEvent::Finished(outcome.clone()));
                        return outcome;
                    }
                    SaveResult::Error(SaveError::Other(reason)) => {
                        warn!(%uri, %reason, "save failed");
                        failed += 1;
                        ItemStatus::Failed(reason)
                    }
                }
            }
            Err(e) => {
                warn!(%uri, error = %e, "processing failed");
                failed += 1;
                ItemStatus::Failed(e.to_string())
            }
        };

        done += 1;
        emit(BatchEvent::Item {
            index,
            uri: uri.clone(),
            status,
        });
        emit(BatchEvent::Progress { done, total });
    }

    info!(done, failed, skipped, "batch finished");
    let outcome = BatchOutcome::Completed {
        failed,
        skipped,
        saving_path: controller.saving_path(),
    };
    emit(BatchEvent::Finished(outcome.clone()));
    outcome
}

/// A batch running on its own thread.
#[derive(Debug)]
pub struct BatchHandle {
    cancel: CancelToken,
    join: JoinHandle<BatchOutcome>,
}

impl BatchHandle {
    /// Stop before the next item. Already written files stay.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub fn join(self) -> thread::Result<BatchOutcome> {
        self.join.join()
    }
}

/// Run [`run_batch`] on a background thread, streaming events to `events`.
///
/// A dropped receiver does not stop the batch; use the handle to cancel.
pub fn spawn_batch<B, F>(
    backend: Arc<B>,
    controller: Arc<F>,
    request: BatchRequest,
    events: Sender<BatchEvent>,
) -> io::Result<BatchHandle>
where
    B: ImageBackend + Send + ?Sized + 'static,
    F: FileController + ?Sized + 'static,
{
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let join = thread::Builder::new()
        .name("image-batch".to_string())
        .spawn(move || {
            run_batch(backend.as_ref(), controller.as_ref(), &request, &token, |event| {
                let _ = events.send(event);
            })
        })?;
    Ok(BatchHandle { cancel, join })
}

/// Process `request` into share copies and return their paths.
///
/// Failed and skipped items are left out. `on_progress(done, total)` is
/// called after every item.
pub fn share_images(
    backend: &(impl ImageBackend + ?Sized),
    controller: &(impl FileController + ?Sized),
    request: &BatchRequest,
    mut on_progress: impl FnMut(usize, usize),
) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    run_batch(backend, controller, request, &CancelToken::new(), |event| match event {
        BatchEvent::Item {
            status: ItemStatus::Saved(path),
            ..
        } => paths.push(path),
        BatchEvent::Progress { done, total } => on_progress(done, total),
        _ => {}
    });
    paths
}
