//! End-to-end batches through the real backend and the filesystem.
//!
//! Sources are small generated PNGs in a temp directory; outputs are decoded
//! again and checked for size and content.

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use image_toolbox::batch::{BatchEvent, BatchOutcome, BatchRequest, CancelToken, run_batch};
use image_toolbox::file::FsFileController;
use image_toolbox::filters::Filter;
use image_toolbox::imaging::{ImageFormat, ImageInfo, LimitsPolicy, ResizeType, RustBackend};
use image_toolbox::naming::FilenamePolicy;
use image_toolbox::session::FilterSession;
use image_toolbox::filters::SizeHint;
use image_toolbox::settings::SettingsRepository;
use image_toolbox::settings::store::TomlFileStore;
use image_toolbox::types::Uri;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn write_png(dir: &Path, name: &str, width: u32, height: u32, color: [u8; 4]) -> Uri {
    let path = dir.join(name);
    RgbaImage::from_pixel(width, height, Rgba(color))
        .save(&path)
        .unwrap();
    Uri::from_path(&path)
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| entries.map(|e| e.unwrap().path()).collect())
        .unwrap_or_default();
    files.sort();
    files
}

#[test]
fn resize_batch_writes_numbered_outputs_and_counts_failures() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let wide = write_png(src.path(), "wide.png", 200, 100, [200, 40, 40, 255]);
    let broken_path = src.path().join("broken.png");
    std::fs::write(&broken_path, b"not a png").unwrap();
    let square = write_png(src.path(), "square.png", 60, 60, [40, 40, 200, 255]);

    let request = BatchRequest::new(
        vec![wide, Uri::from_path(&broken_path), square],
        ImageInfo::new(100, 100)
            .with_format(ImageFormat::Png)
            .with_resize_type(ResizeType::Fit),
    );
    let controller = FsFileController::new(out.path(), FilenamePolicy::default());
    let mut events = Vec::new();
    let outcome = run_batch(
        &RustBackend::new(),
        &controller,
        &request,
        &CancelToken::new(),
        |e| events.push(e),
    );

    assert_eq!(
        outcome,
        BatchOutcome::Completed {
            failed: 1,
            skipped: 0,
            saving_path: out.path().display().to_string(),
        }
    );
    let progress: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            BatchEvent::Progress { done, .. } => Some(*done),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![1, 2, 3]);

    let written = files_in(out.path());
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["ResizedImage_1.png", "ResizedImage_3.png"]);

    let first = image::open(&written[0]).unwrap();
    assert_eq!(first.dimensions(), (100, 50));
    let third = image::open(&written[1]).unwrap();
    assert_eq!(third.dimensions(), (100, 100));
}

#[test]
fn limits_skip_leaves_small_sources_alone() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let small = write_png(src.path(), "small.png", 40, 30, [0, 255, 0, 255]);
    let large = write_png(src.path(), "large.png", 400, 300, [0, 255, 0, 255]);

    let request = BatchRequest::new(
        vec![small, large],
        ImageInfo::new(100, 100)
            .with_format(ImageFormat::Png)
            .with_resize_type(ResizeType::Limits {
                on_smaller: LimitsPolicy::Skip,
            }),
    );
    let controller = FsFileController::new(out.path(), FilenamePolicy::default());
    let outcome = run_batch(
        &RustBackend::new(),
        &controller,
        &request,
        &CancelToken::new(),
        |_| {},
    );

    assert!(matches!(
        outcome,
        BatchOutcome::Completed {
            failed: 0,
            skipped: 1,
            ..
        }
    ));
    let written = files_in(out.path());
    assert_eq!(written.len(), 1);
    assert_eq!(image::open(&written[0]).unwrap().dimensions(), (100, 75));
}

#[test]
fn filter_session_saves_every_source_at_its_own_size() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let a = write_png(src.path(), "a.png", 64, 32, [220, 30, 30, 255]);
    let b = write_png(src.path(), "b.png", 20, 40, [30, 220, 30, 255]);

    let backend = Arc::new(RustBackend::new());
    let controller = Arc::new(FsFileController::new(out.path(), FilenamePolicy::default()));
    let mut session = FilterSession::new(
        backend,
        controller,
        SizeHint::Bounded {
            width: 16,
            height: 16,
        },
    );
    session.update_uris(vec![a, b]).unwrap();
    session.add_filter(Filter::Grayscale).unwrap();
    session.set_format(ImageFormat::Png);

    let preview = session.state().preview.clone().unwrap();
    assert!(preview.width() <= 16 && preview.height() <= 16);

    session.save().unwrap();
    let outcome = session.wait();
    assert!(matches!(
        outcome,
        Some(BatchOutcome::Completed { failed: 0, .. })
    ));
    assert_eq!(session.state().progress.done, 2);

    let written = files_in(out.path());
    assert_eq!(written.len(), 2);
    let sizes: Vec<(u32, u32)> = written
        .iter()
        .map(|p| image::open(p).unwrap().dimensions())
        .collect();
    assert_eq!(sizes, vec![(64, 32), (20, 40)]);

    let gray = image::open(&written[0]).unwrap().to_rgba8();
    let px = gray.get_pixel(10, 10);
    assert_eq!(px[0], px[1]);
    assert_eq!(px[1], px[2]);
}

#[test]
fn naming_preferences_flow_from_the_preference_file() {
    let root = TempDir::new().unwrap();
    let prefs = root.path().join("preferences.toml");
    let out = root.path().join("out");
    let src = write_png(root.path(), "holiday.png", 30, 20, [9, 9, 9, 255]);

    {
        let mut repo = SettingsRepository::open(TomlFileStore::open(&prefs).unwrap()).unwrap();
        repo.set_filename_prefix("Trip").unwrap();
        repo.toggle_add_original_filename().unwrap();
        repo.toggle_add_size_in_filename().unwrap();
        repo.set_save_folder(Some(out.to_str().unwrap())).unwrap();
    }

    let repo = SettingsRepository::open(TomlFileStore::open(&prefs).unwrap()).unwrap();
    let state = repo.state();
    let controller = FsFileController::from_settings(&state, Path::new("/unused"));
    let request = BatchRequest::new(
        vec![src],
        ImageInfo::new(15, 10).with_format(ImageFormat::Png),
    );
    let outcome = run_batch(
        &RustBackend::new(),
        &controller,
        &request,
        &CancelToken::new(),
        |_| {},
    );

    assert!(matches!(outcome, BatchOutcome::Completed { failed: 0, .. }));
    let names: Vec<String> = files_in(&out)
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["Trip_holiday(15x10)_1.png"]);
}

#[test]
fn cancelled_before_start_writes_nothing() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let uri = write_png(src.path(), "x.png", 10, 10, [1, 2, 3, 255]);
    let cancel = CancelToken::new();
    cancel.cancel();

    let request = BatchRequest::new(vec![uri], ImageInfo::new(5, 5).with_format(ImageFormat::Png));
    let controller = FsFileController::new(out.path(), FilenamePolicy::default());
    let outcome = run_batch(&RustBackend::new(), &controller, &request, &cancel, |_| {});

    assert_eq!(outcome, BatchOutcome::Cancelled { done: 0 });
    assert!(files_in(out.path()).is_empty());
}

#[test]
fn transparent_png_survives_a_png_round_trip() {
    let src = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let uri = write_png(src.path(), "ghost.png", 8, 8, [255, 255, 255, 0]);

    let request = BatchRequest::new(vec![uri], ImageInfo::new(8, 8).with_format(ImageFormat::Png));
    let controller = FsFileController::new(out.path(), FilenamePolicy::default());
    run_batch(&RustBackend::new(), &controller, &request, &CancelToken::new(), |_| {});

    let written = files_in(out.path());
    let img: DynamicImage = image::open(&written[0]).unwrap();
    assert_eq!(img.to_rgba8().get_pixel(3, 3)[3], 0);
}
