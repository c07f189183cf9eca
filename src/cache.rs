//! Disk cache of filtered previews.
//!
//! Rendering a filter at preview size is cheap compared to decoding, but the
//! filter screen re-renders the same (source, filter, size) combinations
//! over and over as the user scrubs back and forth. This module stores those
//! renders as PNG files so they are only computed once.
//!
//! ## Cache keys
//!
//! The cache is **content-addressed**: lookups go by
//! `"{source_hash}:{transform_key}"`, never by file name.
//!
//! - **`source_hash`**: SHA-256 of the source pixels (or file bytes).
//!   Renaming or moving a source does not invalidate its renders.
//! - **`transform_key`**: the [`Transformation::cache_key`] plus the size
//!   hint. Two filters with equal parameters share renders; any parameter
//!   change gives a new key.
//!
//! A hit requires both a manifest entry and the PNG still on disk.
//!
//! ## Storage
//!
//! `<cache_dir>/manifest.json` maps stored file names to their keys; the
//! PNGs sit next to it, named from the content key digest. A manifest that
//! is missing, corrupt, or from another format version loads as empty.

use crate::filters::{FilterError, SizeHint, Transformation};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const MANIFEST_FILENAME: &str = "manifest.json";

/// Bump to invalidate every existing cache when the key scheme changes.
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub transform_key: String,
}

/// File name → cache entry, with a runtime reverse index by content key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
    /// `"{source_hash}:{transform_key}"` → file name. Never serialized.
    #[serde(skip)]
    content_index: HashMap<String, String>,
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
            content_index: HashMap::new(),
        }
    }

    /// Load from `dir`, or an empty manifest if there is nothing usable.
    pub fn load(dir: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(dir.join(MANIFEST_FILENAME)) else {
            return Self::empty();
        };
        let mut manifest: Self = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                debug!(error = %e, "discarding unreadable cache manifest");
                return Self::empty();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            return Self::empty();
        }
        manifest.content_index = build_content_index(&manifest.entries);
        manifest
    }

    pub fn save(&self, dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(MANIFEST_FILENAME), json)
    }

    /// Stored file name for the given keys, if the file is still in `dir`.
    pub fn find_cached(&self, source_hash: &str, transform_key: &str, dir: &Path) -> Option<String> {
        let file = self.content_index.get(&content_key(source_hash, transform_key))?;
        dir.join(file).exists().then(|| file.clone())
    }

    pub fn insert(&mut self, file: String, source_hash: String, transform_key: String) {
        let key = content_key(&source_hash, &transform_key);
        // Same content under an older name
        if let Some(old) = self.content_index.get(&key)
            && *old != file
        {
            self.entries.remove(old.as_str());
        }
        self.content_index.insert(key, file.clone());
        self.entries.insert(
            file,
            CacheEntry {
                source_hash,
                transform_key,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn build_content_index(entries: &HashMap<String, CacheEntry>) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(file, entry)| (content_key(&entry.source_hash, &entry.transform_key), file.clone()))
        .collect()
}

pub fn content_key(source_hash: &str, transform_key: &str) -> String {
    format!("{source_hash}:{transform_key}")
}

/// SHA-256 of a file's contents, as hex.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// SHA-256 of decoded pixels and their layout, as hex.
pub fn hash_image(image: &DynamicImage) -> String {
    let rgba = image.to_rgba8();
    let mut hasher = Sha256::new();
    hasher.update(rgba.width().to_le_bytes());
    hasher.update(rgba.height().to_le_bytes());
    hasher.update(rgba.as_raw());
    format!("{:x}", hasher.finalize())
}

/// Transformation key qualified by the size it was rendered at.
pub fn transform_key(transformation: &dyn Transformation, size: SizeHint) -> String {
    match size {
        SizeHint::Original => format!("{}@original", transformation.cache_key()),
        SizeHint::Bounded { width, height } => {
            format!("{}@{width}x{height}", transformation.cache_key())
        }
    }
}

/// Hit/miss counters for one cache session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} rendered ({} total)",
                self.hits,
                self.misses,
                self.total()
            )
        } else {
            write!(f, "{} rendered", self.misses)
        }
    }
}

/// Preview renders on disk, looked up by content.
#[derive(Debug)]
pub struct PreviewCache {
    dir: PathBuf,
    manifest: CacheManifest,
    stats: CacheStats,
}

impl PreviewCache {
    /// Open (creating if needed) the cache in `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let manifest = CacheManifest::load(&dir);
        debug!(dir = %dir.display(), entries = manifest.len(), "preview cache opened");
        Ok(Self {
            dir,
            manifest,
            stats: CacheStats::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.manifest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.is_empty()
    }

    /// The cached render, if present and still decodable.
    pub fn get(&self, source_hash: &str, transform_key: &str) -> Option<DynamicImage> {
        let file = self.manifest.find_cached(source_hash, transform_key, &self.dir)?;
        image::open(self.dir.join(file)).ok()
    }

    /// Store a render and persist the manifest.
    pub fn put(&mut self, source_hash: &str, transform_key: &str, image: &DynamicImage) -> io::Result<()> {
        let digest = Sha256::digest(content_key(source_hash, transform_key).as_bytes());
        let file = format!("{:x}", digest)[..32].to_string() + ".png";
        image
            .save_with_format(self.dir.join(&file), image::ImageFormat::Png)
            .map_err(io::Error::other)?;
        self.manifest
            .insert(file, source_hash.to_string(), transform_key.to_string());
        self.manifest.save(&self.dir)
    }

    /// Cached render of `transformation` over `image`, computing it on a miss.
    ///
    /// Cache write failures are logged and do not fail the render.
    pub fn get_or_render(
        &mut self,
        source_hash: &str,
        transformation: &dyn Transformation,
        image: &DynamicImage,
        size: SizeHint,
    ) -> Result<DynamicImage, FilterError> {
        let key = transform_key(transformation, size);
        if let Some(cached) = self.get(source_hash, &key) {
            self.stats.hits += 1;
            return Ok(cached);
        }
        self.stats.misses += 1;
        let rendered = transformation.transform(image, size)?;
        if let Err(e) = self.put(source_hash, &key, &rendered) {
            warn!(error = %e, "failed to store preview in cache");
        }
        Ok(rendered)
    }

    /// Delete every stored render and the manifest. Returns files removed.
    pub fn clear(&mut self) -> io::Result<usize> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        self.manifest = CacheManifest::empty();
        Ok(removed)
    }
}
