//! Tool configuration.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user file only overrides the keys it names.
//!
//! ## Config File Location
//!
//! `config.toml` is read from the directory given with `--root` (the current
//! directory by default). A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! preferences = "preferences.toml"   # User preferences (settings command)
//! cache_dir = ".image-toolbox-cache" # Preview renders and share copies
//!
//! [output]
//! directory = "resized"     # Where results go unless a save folder is set
//! format = "jpeg"           # jpeg, png, webp, avif, bmp
//! quality = 90              # Lossy encoder quality (1-100)
//!
//! [preview]
//! max_width = 512           # Bounding box for filter previews
//! max_height = 512
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::filters::SizeHint;
use crate::imaging::{ImageFormat, ImageInfo, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolboxConfig {
    pub storage: StorageConfig,
    pub output: OutputConfig,
    pub preview: PreviewConfig,
    pub processing: ProcessingConfig,
}

impl ToolboxConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.output.quality) {
            return Err(ConfigError::Validation(
                "output.quality must be 1-100".into(),
            ));
        }
        if self.preview.max_width == 0 || self.preview.max_height == 0 {
            return Err(ConfigError::Validation(
                "preview.max_width and preview.max_height must be non-zero".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if self.storage.preferences.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.preferences must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Size hint for preview renders.
    pub fn preview_size(&self) -> SizeHint {
        SizeHint::Bounded {
            width: self.preview.max_width,
            height: self.preview.max_height,
        }
    }

    /// Starting target descriptor: output format and quality, no size yet.
    pub fn output_info(&self) -> ImageInfo {
        ImageInfo::default()
            .with_format(self.output.format)
            .with_quality(Quality::new(self.output.quality))
    }

    /// Paths in the config are relative to `root`.
    pub fn resolve(&self, root: &Path, path: &str) -> PathBuf {
        root.join(path)
    }
}

/// Where persistent state lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Preference file used by the `settings` command.
    pub preferences: String,
    /// Preview cache and share copies.
    pub cache_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            preferences: "preferences.toml".to_string(),
            cache_dir: ".image-toolbox-cache".to_string(),
        }
    }
}

/// Defaults for written images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Output directory when no save folder is set in preferences.
    pub directory: String,
    pub format: ImageFormat,
    /// Lossy encoder quality (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "resized".to_string(),
            format: ImageFormat::Jpeg,
            quality: 90,
        }
    }
}

/// Preview rendering settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_width: 512,
            max_height: 512,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers for previews and filter kernels.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock default config as a `toml::Value::Table`, the base layer for
/// merging user overrides.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ToolboxConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// `config.toml` in `dir` as a raw TOML value, or `None` if there is none.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ToolboxConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ToolboxConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `config.toml` from `dir` on top of stock defaults.
pub fn load_config(dir: &Path) -> Result<ToolboxConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(dir)?)
}

/// A fully-commented stock `config.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Toolbox Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Relative paths are resolved against the directory holding this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Preference file read and written by the `settings` command.
preferences = "preferences.toml"

# Preview renders and share copies.
cache_dir = ".image-toolbox-cache"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Where results are written unless a save folder is set in preferences.
directory = "resized"

# Output encoding: jpeg, png, webp, avif, bmp.
format = "jpeg"

# Lossy encoder quality (1 = worst, 100 = best). Ignored by png, webp, bmp.
quality = 90

# ---------------------------------------------------------------------------
# Previews
# ---------------------------------------------------------------------------
[preview]
# Bounding box for filter previews. Sources are never upscaled.
max_width = 512
max_height = 512

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for previews and filter kernels.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = ToolboxConfig::default();
        assert_eq!(config.storage.preferences, "preferences.toml");
        assert_eq!(config.output.format, ImageFormat::Jpeg);
        assert_eq!(config.output.quality, 90);
        assert_eq!(
            config.preview_size(),
            SizeHint::Bounded {
                width: 512,
                height: 512
            }
        );
    }

    #[test]
    fn parse_partial_config() {
        let config: ToolboxConfig = toml::from_str(
            r#"
[output]
format = "webp"
"#,
        )
        .unwrap();
        assert_eq!(config.output.format, ImageFormat::Webp);
        assert_eq!(config.output.directory, "resized");
        assert_eq!(config.preview.max_width, 512);
    }

    #[test]
    fn output_info_carries_format_and_quality() {
        let mut config = ToolboxConfig::default();
        config.output.format = ImageFormat::Avif;
        config.output.quality = 55;
        let info = config.output_info();
        assert_eq!(info.format, ImageFormat::Avif);
        assert_eq!(info.quality, Quality::new(55));
        assert!(!info.can_save());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_config(tmp.path()).unwrap(), ToolboxConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[output]
quality = 70

[processing]
max_processes = 2
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.output.quality, 70);
        assert_eq!(config.processing.max_processes, Some(2));
        assert_eq!(config.output.format, ImageFormat::Jpeg);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "[output]\nquality = 0\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[output]\nformat = \"png\"\nquality = 90\n").unwrap();
        let overlay: toml::Value = toml::from_str("[output]\nquality = 70\n").unwrap();
        let merged = merge_toml(base, overlay);
        let output = merged.get("output").unwrap();
        assert_eq!(output.get("quality").unwrap().as_integer(), Some(70));
        assert_eq!(output.get("format").unwrap().as_str(), Some("png"));
    }

    #[test]
    fn merge_toml_scalar_replaces_table() {
        let base: toml::Value = toml::from_str("[a]\nb = 1\n").unwrap();
        let overlay: toml::Value = toml::from_str("a = 3\n").unwrap();
        assert_eq!(merge_toml(base, overlay).get("a").unwrap().as_integer(), Some(3));
    }

    // =========================================================================
    // Unknown keys and validation
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<ToolboxConfig, _> = toml::from_str("[output]\nqualty = 90\n");
        assert!(result.unwrap_err().to_string().contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result: Result<ToolboxConfig, _> = toml::from_str("[outptu]\nquality = 90\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_format_rejected() {
        let result: Result<ToolboxConfig, _> = toml::from_str("[output]\nformat = \"gif\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_zero_values() {
        let mut config = ToolboxConfig::default();
        config.preview.max_height = 0;
        assert!(config.validate().is_err());

        let mut config = ToolboxConfig::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());

        assert!(ToolboxConfig::default().validate().is_ok());
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let cores = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig::default()), cores);
        let config = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
        let config = ProcessingConfig {
            max_processes: Some(cores + 10),
        };
        assert_eq!(effective_threads(&config), cores);
    }

    // =========================================================================
    // Stock config
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: ToolboxConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, ToolboxConfig::default());
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        for section in ["storage", "output", "preview", "processing"] {
            assert!(val.get(section).is_some(), "missing [{section}]");
        }
    }
}
