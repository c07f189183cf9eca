//! Persisting encoded images.
//!
//! A [`FileController`] takes one encoded image and writes it somewhere,
//! reporting a tri-state [`SaveResult`]. Permission failures are kept apart
//! from every other failure because they abort a whole batch, while other
//! errors only count against the single item.
//!
//! - [`FsFileController`]: the user's save folder, named by the
//!   [`FilenamePolicy`](crate::naming::FilenamePolicy).
//! - [`CacheFileController`]: a scratch directory for share targets.

use crate::imaging::exif::{insert_exif_segment, with_orientation_reset};
use crate::imaging::{ImageFormat, ImageInfo};
use crate::naming::{FilenamePolicy, FilenameRequest, build_filename, unique_path};
use crate::settings::SettingsState;
use crate::types::Uri;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    #[error("missing permission to write {0}")]
    MissingPermissions(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveResult {
    Success { path: PathBuf },
    Error(SaveError),
}

impl SaveResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SaveResult::Success { .. })
    }
}

/// One encoded image ready to be written.
#[derive(Debug, Clone)]
pub struct SaveTarget {
    pub original_uri: Option<Uri>,
    /// Final descriptor: actual pixel size and output format.
    pub info: ImageInfo,
    pub data: Vec<u8>,
    /// APP1 segment of the source, if it had one.
    pub exif: Option<Vec<u8>>,
    /// 1-based position within a batch.
    pub sequence_number: Option<usize>,
}

pub trait FileController: Send + Sync {
    fn save(&self, target: &SaveTarget, keep_metadata: bool) -> SaveResult;

    /// Human-readable location results are written to.
    fn saving_path(&self) -> String;
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn classify(err: io::Error, path: &Path) -> SaveError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => SaveError::MissingPermissions(path.display().to_string()),
        _ => SaveError::Other(format!("{}: {err}", path.display())),
    }
}

/// Output bytes with the source EXIF spliced in, when kept and possible.
///
/// Pixels are already upright, so the copied orientation tag is reset.
fn output_bytes(target: &SaveTarget, keep_metadata: bool) -> Vec<u8> {
    if keep_metadata
        && target.info.format == ImageFormat::Jpeg
        && let Some(segment) = target.exif.as_deref()
    {
        if let Some(with_exif) = insert_exif_segment(&target.data, &with_orientation_reset(segment)) {
            return with_exif;
        }
        warn!("could not splice EXIF into output, writing without metadata");
    }
    target.data.clone()
}

/// Writes into a directory, naming files from the filename policy.
#[derive(Debug, Clone)]
pub struct FsFileController {
    root: PathBuf,
    policy: FilenamePolicy,
}

impl FsFileController {
    pub fn new(root: impl Into<PathBuf>, policy: FilenamePolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    /// Save folder and naming from the settings, falling back to
    /// `default_root` when no folder is chosen.
    pub fn from_settings(settings: &SettingsState, default_root: &Path) -> Self {
        let root = settings
            .save_folder
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| default_root.to_path_buf());
        Self::new(root, settings.filename_policy())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn target_path(&self, target: &SaveTarget) -> PathBuf {
        let request = FilenameRequest {
            original: target.original_uri.as_ref().and_then(Uri::file_stem),
            width: target.info.width,
            height: target.info.height,
            extension: target.info.format.extension().to_string(),
            sequence: target.sequence_number,
            timestamp_millis: now_millis(),
        };
        let name = build_filename(&self.policy, &request);
        if self.policy.overwrite {
            self.root.join(name)
        } else {
            unique_path(&self.root, &name)
        }
    }
}

impl FileController for FsFileController {
    fn save(&self, target: &SaveTarget, keep_metadata: bool) -> SaveResult {
        if let Err(e) = std::fs::create_dir_all(&self.root) {
            return SaveResult::Error(classify(e, &self.root));
        }
        let path = self.target_path(target);
        let bytes = output_bytes(target, keep_metadata);
        match std::fs::write(&path, bytes) {
            Ok(()) => {
                debug!(path = %path.display(), "saved");
                SaveResult::Success { path }
            }
            Err(e) => SaveResult::Error(classify(e, &path)),
        }
    }

    fn saving_path(&self) -> String {
        self.root.display().to_string()
    }
}

/// Writes share copies into a scratch directory.
///
/// Names keep the source stem and the batch position; reruns overwrite.
#[derive(Debug, Clone)]
pub struct CacheFileController {
    inner: FsFileController,
}

impl CacheFileController {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let policy = FilenamePolicy {
            prefix: "Shared".to_string(),
            add_sequence_number: true,
            add_original_filename: true,
            add_size_in_filename: false,
            randomize: false,
            overwrite: true,
        };
        Self {
            inner: FsFileController::new(dir, policy),
        }
    }

    pub fn dir(&self) -> &Path {
        self.inner.root()
    }

    /// Delete every file in the scratch directory. Returns how many went.
    pub fn clear(&self) -> io::Result<usize> {
        let entries = match std::fs::read_dir(self.dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut removed = 0;
        for entry in entries {
            let path = entry?.path();
            if path.is_file() {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl FileController for CacheFileController {
    fn save(&self, target: &SaveTarget, keep_metadata: bool) -> SaveResult {
        self.inner.save(target, keep_metadata)
    }

    fn saving_path(&self) -> String {
        self.inner.saving_path()
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Records saves in memory. Individual saves can be made to fail.
    #[derive(Default)]
    pub struct MockFileController {
        saved: Mutex<Vec<SaveTarget>>,
        failures: HashMap<usize, SaveError>,
    }

    impl MockFileController {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the `n`th save call (0-based) fail with `error`.
        pub fn failing_at(mut self, n: usize, error: SaveError) -> Self {
            self.failures.insert(n, error);
            self
        }

        pub fn saved(&self) -> Vec<SaveTarget> {
            self.saved.lock().unwrap().clone()
        }
    }

    impl FileController for MockFileController {
        fn save(&self, target: &SaveTarget, _keep_metadata: bool) -> SaveResult {
            let mut saved = self.saved.lock().unwrap();
            let call = saved.len();
            saved.push(target.clone());
            match self.failures.get(&call) {
                Some(err) => SaveResult::Error(err.clone()),
                None => SaveResult::Success {
                    path: PathBuf::from(format!("/mock/{call}")),
                },
            }
        }

        fn saving_path(&self) -> String {
            "/mock".to_string()
        }
    }

    fn jpeg_target(exif: Option<Vec<u8>>) -> SaveTarget {
        let img = image::RgbImage::from_pixel(8, 6, image::Rgb([10, 20, 30]));
        let mut data = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut io::Cursor::new(&mut data), image::ImageFormat::Jpeg)
            .unwrap();
        SaveTarget {
            original_uri: Some(Uri::new("/photos/beach.jpg")),
            info: ImageInfo::new(8, 6).with_format(ImageFormat::Jpeg),
            data,
            exif,
            sequence_number: Some(1),
        }
    }

    #[test]
    fn fs_controller_writes_with_policy_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        let controller = FsFileController::new(tmp.path().join("out"), FilenamePolicy::default());

        let result = controller.save(&jpeg_target(None), false);
        let SaveResult::Success { path } = result else {
            panic!("expected success, got {result:?}");
        };
        assert_eq!(path, tmp.path().join("out").join("ResizedImage_1.jpg"));
        assert!(path.exists());
    }

    #[test]
    fn existing_names_get_counter_unless_overwriting() {
        let tmp = tempfile::TempDir::new().unwrap();
        let keep = FsFileController::new(tmp.path(), FilenamePolicy::default());
        keep.save(&jpeg_target(None), false);
        let SaveResult::Success { path } = keep.save(&jpeg_target(None), false) else {
            panic!("second save failed");
        };
        assert_eq!(path.file_name().unwrap(), "ResizedImage_1 (1).jpg");

        let overwrite = FsFileController::new(
            tmp.path(),
            FilenamePolicy {
                overwrite: true,
                ..FilenamePolicy::default()
            },
        );
        let SaveResult::Success { path } = overwrite.save(&jpeg_target(None), false) else {
            panic!("overwrite save failed");
        };
        assert_eq!(path.file_name().unwrap(), "ResizedImage_1.jpg");
    }

    #[test]
    fn keep_metadata_splices_exif_with_orientation_reset() {
        let tmp = tempfile::TempDir::new().unwrap();
        let controller = FsFileController::new(tmp.path(), FilenamePolicy::default());
        let segment = crate::imaging::exif::tests::exif_segment(6, false);

        let SaveResult::Success { path } = controller.save(&jpeg_target(Some(segment)), true) else {
            panic!("save failed");
        };
        let written = std::fs::read(path).unwrap();
        let found = crate::imaging::exif::find_exif_segment(&written).unwrap();
        assert_eq!(crate::imaging::exif::read_orientation(found), Some(1));
    }

    #[test]
    fn metadata_dropped_when_not_kept() {
        let tmp = tempfile::TempDir::new().unwrap();
        let controller = FsFileController::new(tmp.path(), FilenamePolicy::default());
        let segment = crate::imaging::exif::tests::exif_segment(1, true);

        let SaveResult::Success { path } = controller.save(&jpeg_target(Some(segment)), false) else {
            panic!("save failed");
        };
        let written = std::fs::read(path).unwrap();
        assert!(crate::imaging::exif::find_exif_segment(&written).is_none());
    }

    #[test]
    fn unwritable_root_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        // A regular file where the directory should be
        let controller = FsFileController::new(blocker.join("sub"), FilenamePolicy::default());
        assert!(matches!(
            controller.save(&jpeg_target(None), false),
            SaveResult::Error(_)
        ));
    }

    #[test]
    fn permission_denied_maps_to_missing_permissions() {
        let err = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(
            classify(err, Path::new("/x")),
            SaveError::MissingPermissions(_)
        ));
        let err = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(classify(err, Path::new("/x")), SaveError::Other(_)));
    }

    #[test]
    fn from_settings_uses_save_folder() {
        let settings = SettingsState {
            save_folder: Some("/chosen".to_string()),
            ..SettingsState::default()
        };
        let controller = FsFileController::from_settings(&settings, Path::new("/fallback"));
        assert_eq!(controller.saving_path(), "/chosen");

        let controller = FsFileController::from_settings(&SettingsState::default(), Path::new("/fallback"));
        assert_eq!(controller.saving_path(), "/fallback");
    }

    #[test]
    fn cache_controller_names_by_source_and_clears() {
        let tmp = tempfile::TempDir::new().unwrap();
        let controller = CacheFileController::new(tmp.path().join("share"));
        assert_eq!(controller.clear().unwrap(), 0);

        let SaveResult::Success { path } = controller.save(&jpeg_target(None), false) else {
            panic!("save failed");
        };
        assert_eq!(path.file_name().unwrap(), "Shared_beach_1.jpg");
        assert_eq!(controller.clear().unwrap(), 1);
        assert!(!path.exists());
    }
}
