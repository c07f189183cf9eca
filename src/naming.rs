//! Output filename policy.
//!
//! Saved files are named from the user's filename preferences:
//!
//! ```text
//! {prefix}[_{original}][({w}x{h})]_{sequence | timestamp}.{ext}
//! ```
//!
//! - `ResizedImage_3.jpg`: batch save, sequence numbers on
//! - `ResizedImage_holiday(800x600)_1700000000000.png`: original name and size on
//! - `3fa4c0...e1.webp`: randomized, 24 hex chars and nothing else
//!
//! With overwriting off, a name that already exists gets a ` (n)` suffix
//! before the extension.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Filename preferences, taken from the settings snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenamePolicy {
    pub prefix: String,
    pub add_sequence_number: bool,
    pub add_original_filename: bool,
    pub add_size_in_filename: bool,
    pub randomize: bool,
    pub overwrite: bool,
}

impl Default for FilenamePolicy {
    fn default() -> Self {
        Self {
            prefix: "ResizedImage".to_string(),
            add_sequence_number: true,
            add_original_filename: false,
            add_size_in_filename: false,
            randomize: false,
            overwrite: false,
        }
    }
}

/// Everything a filename can be built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameRequest {
    /// Stem of the source file, if known.
    pub original: Option<String>,
    pub width: u32,
    pub height: u32,
    pub extension: String,
    /// 1-based position in a batch. `None` for single saves.
    pub sequence: Option<usize>,
    /// Milliseconds since the Unix epoch.
    pub timestamp_millis: u64,
}

/// Replace characters that are invalid in filenames on common filesystems.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

pub fn build_filename(policy: &FilenamePolicy, request: &FilenameRequest) -> String {
    let ext = &request.extension;
    if policy.randomize {
        let mut hasher = Sha256::new();
        hasher.update(request.original.as_deref().unwrap_or("").as_bytes());
        hasher.update(request.width.to_le_bytes());
        hasher.update(request.height.to_le_bytes());
        hasher.update(request.sequence.unwrap_or(0).to_le_bytes());
        hasher.update(request.timestamp_millis.to_le_bytes());
        let hex = format!("{:x}", hasher.finalize());
        return format!("{}.{ext}", &hex[..24]);
    }

    let mut name = sanitize(&policy.prefix);
    if policy.add_original_filename
        && let Some(original) = request.original.as_deref().filter(|o| !o.is_empty())
    {
        name.push('_');
        name.push_str(&sanitize(original));
    }
    if policy.add_size_in_filename {
        name.push_str(&format!("({}x{})", request.width, request.height));
    }
    match request.sequence {
        Some(seq) if policy.add_sequence_number => name.push_str(&format!("_{seq}")),
        _ => name.push_str(&format!("_{}", request.timestamp_millis)),
    }
    format!("{name}.{ext}")
}

/// `dir/name`, or `dir/stem (n).ext` with the smallest free `n`.
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
            None => dir.join(format!("{stem} ({n})")),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FilenameRequest {
        FilenameRequest {
            original: Some("holiday".to_string()),
            width: 800,
            height: 600,
            extension: "jpg".to_string(),
            sequence: Some(3),
            timestamp_millis: 1_700_000_000_000,
        }
    }

    #[test]
    fn default_policy_uses_prefix_and_sequence() {
        assert_eq!(
            build_filename(&FilenamePolicy::default(), &request()),
            "ResizedImage_3.jpg"
        );
    }

    #[test]
    fn single_save_uses_timestamp() {
        let req = FilenameRequest {
            sequence: None,
            ..request()
        };
        assert_eq!(
            build_filename(&FilenamePolicy::default(), &req),
            "ResizedImage_1700000000000.jpg"
        );
    }

    #[test]
    fn sequence_off_uses_timestamp() {
        let policy = FilenamePolicy {
            add_sequence_number: false,
            ..FilenamePolicy::default()
        };
        assert_eq!(
            build_filename(&policy, &request()),
            "ResizedImage_1700000000000.jpg"
        );
    }

    #[test]
    fn original_name_and_size() {
        let policy = FilenamePolicy {
            prefix: "Out".to_string(),
            add_original_filename: true,
            add_size_in_filename: true,
            ..FilenamePolicy::default()
        };
        assert_eq!(build_filename(&policy, &request()), "Out_holiday(800x600)_3.jpg");
    }

    #[test]
    fn randomized_name_is_hex_only() {
        let policy = FilenamePolicy {
            randomize: true,
            add_original_filename: true,
            ..FilenamePolicy::default()
        };
        let name = build_filename(&policy, &request());
        let (stem, ext) = name.split_once('.').unwrap();
        assert_eq!(ext, "jpg");
        assert_eq!(stem.len(), 24);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));

        let other = FilenameRequest {
            sequence: Some(4),
            ..request()
        };
        assert_ne!(build_filename(&policy, &other), name);
    }

    #[test]
    fn sanitize_replaces_separators() {
        assert_eq!(sanitize("a/b:c*?.jpg"), "a_b_c__.jpg");
        assert_eq!(sanitize("plain name"), "plain name");
    }

    #[test]
    fn unique_path_appends_counter() {
        let tmp = tempfile::TempDir::new().unwrap();
        assert_eq!(unique_path(tmp.path(), "a.jpg"), tmp.path().join("a.jpg"));

        std::fs::write(tmp.path().join("a.jpg"), "x").unwrap();
        assert_eq!(unique_path(tmp.path(), "a.jpg"), tmp.path().join("a (1).jpg"));

        std::fs::write(tmp.path().join("a (1).jpg"), "x").unwrap();
        assert_eq!(unique_path(tmp.path(), "a.jpg"), tmp.path().join("a (2).jpg"));
    }
}
