//! # Image Toolbox
//!
//! The headless core of an image toolbox app: everything its screens need
//! except pixels on a display. Sources are decoded, filtered, resized and
//! re-encoded in background batches; user preferences live in a typed
//! settings repository; naming and output location follow those preferences.
//!
//! # Architecture
//!
//! ```text
//! Session (per screen)  ──owns──▶  State snapshot  ◀──folds── BatchEvent channel
//!     │                                                        ▲
//!     └──spawns──▶ batch thread: ImageBackend ─▶ FilterChain ─▶ FileController
//! ```
//!
//! A session owns at most one batch. The batch runs on its own thread, checks
//! a cancel token between items and reports through an mpsc channel. Nothing
//! but the session mutates its state, so the UI reads a consistent snapshot.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | `Uri` and `Color`, shared by every layer |
//! | [`imaging`] | `ImageInfo`, resize math, the `ImageBackend` trait and the pure-Rust backend |
//! | [`filters`] | The filter set, its pixel kernels, chains, and the `name:v1:v2` syntax |
//! | [`draw`] | Draw modes, path effects and background canvases |
//! | [`settings`] | Preference keys, stores, and the `SettingsRepository` snapshot |
//! | [`naming`] | Output filenames from the user's naming preferences |
//! | [`file`] | `FileController`: where encoded bytes end up, EXIF splicing |
//! | [`batch`] | The save loop: progress events, cancellation, failure accounting |
//! | [`session`] | Resize and filter screen orchestration |
//! | [`cache`] | Content-addressed disk cache of rendered previews |
//! | [`presets`] | Percentage and Telegram sticker presets |
//! | [`palette`] | Dominant color extraction |
//! | [`screen`] | Navigation destinations, tool order, share targets |
//! | [`config`] | `config.toml` loading, validation and merging |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and encoding all go through the `image` crate, with
//! `rav1e` behind its AVIF encoder. No system libraries are needed, and the
//! [`imaging::ImageBackend`] trait keeps the rest of the crate testable
//! against a recording mock.
//!
//! ## Snapshots Over Shared Mutable State
//!
//! Preferences are read into an immutable [`settings::SettingsState`] behind
//! an `Arc`. Every write goes to the store first and is followed by a reload,
//! so the snapshot always matches what is persisted. Subscribers receive the
//! new snapshot over a channel.
//!
//! ## Typed Failures
//!
//! A batch never aborts on a single bad image. Decode and encode errors are
//! counted and reported per item. The one exception is a permission error on
//! the output location: later items would fail the same way, so the batch
//! stops and says so with [`batch::BatchOutcome::MissingPermissions`].

pub mod batch;
pub mod cache;
pub mod config;
pub mod draw;
pub mod file;
pub mod filters;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod palette;
pub mod presets;
pub mod screen;
pub mod session;
pub mod settings;
pub mod types;
