//! Key-value preference stores.
//!
//! A [`PreferenceStore`] is a flat map from key name to a [`PrefValue`].
//! Typed access goes through [`Key`](super::keys::Key); the store itself
//! only knows the four primitive shapes.
//!
//! - [`MemoryStore`]: a `HashMap`, for tests and throwaway sessions.
//! - [`TomlFileStore`]: a flat TOML table on disk. Every write rewrites the
//!   whole file through a temp file + rename so readers never see half a file.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid preferences file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to serialize preferences: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// A primitive preference value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl PrefValue {
    fn from_toml(value: &toml::Value) -> Option<Self> {
        match value {
            toml::Value::Boolean(b) => Some(PrefValue::Bool(*b)),
            toml::Value::Integer(i) => Some(PrefValue::Int(*i)),
            toml::Value::Float(f) => Some(PrefValue::Float(*f)),
            toml::Value::String(s) => Some(PrefValue::String(s.clone())),
            _ => None,
        }
    }

    fn to_toml(&self) -> toml::Value {
        match self {
            PrefValue::Bool(b) => toml::Value::Boolean(*b),
            PrefValue::Int(i) => toml::Value::Integer(*i),
            PrefValue::Float(f) => toml::Value::Float(*f),
            PrefValue::String(s) => toml::Value::String(s.clone()),
        }
    }
}

pub trait PreferenceStore: Send {
    fn get(&self, key: &str) -> Option<PrefValue>;

    fn set(&mut self, key: &str, value: PrefValue) -> Result<(), StoreError>;

    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Every key with a persisted value, sorted.
    fn keys(&self) -> Vec<String>;

    /// Re-read the backing storage. No-op for in-memory stores.
    fn refresh(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, PrefValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<PrefValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: PrefValue) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Preferences persisted as a flat TOML table.
#[derive(Debug)]
pub struct TomlFileStore {
    path: PathBuf,
    values: BTreeMap<String, PrefValue>,
}

impl TomlFileStore {
    /// Open `path`, reading it if it exists. A missing file is an empty store;
    /// it is created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = read_table(&path)?;
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        let table: toml::Table = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_toml()))
            .collect();
        let content = toml::to_string(&table)?;

        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, content).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;
        debug!(path = %self.path.display(), keys = self.values.len(), "preferences written");
        Ok(())
    }
}

fn read_table(path: &Path) -> Result<BTreeMap<String, PrefValue>, StoreError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let table: toml::Table = toml::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    // Nested tables and arrays are not preferences; they are ignored
    Ok(table
        .iter()
        .filter_map(|(k, v)| PrefValue::from_toml(v).map(|pv| (k.clone(), pv)))
        .collect())
}

impl PreferenceStore for TomlFileStore {
    fn get(&self, key: &str) -> Option<PrefValue> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: PrefValue) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.values.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    fn refresh(&mut self) -> Result<(), StoreError> {
        self.values = read_table(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_set_get_remove() {
        let mut store = MemoryStore::new();
        store.set("b", PrefValue::Bool(true)).unwrap();
        store.set("a", PrefValue::Int(3)).unwrap();
        assert_eq!(store.get("a"), Some(PrefValue::Int(3)));
        assert_eq!(store.keys(), vec!["a".to_string(), "b".to_string()]);

        store.remove("a").unwrap();
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let tmp = TempDir::new().unwrap();
        let store = TomlFileStore::open(tmp.path().join("prefs.toml")).unwrap();
        assert!(store.keys().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn file_store_persists_every_shape() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("prefs.toml");

        let mut store = TomlFileStore::open(&path).unwrap();
        store.set("flag", PrefValue::Bool(false)).unwrap();
        store.set("count", PrefValue::Int(-1)).unwrap();
        store.set("scale", PrefValue::Float(1.5)).unwrap();
        store.set("prefix", PrefValue::String("Img".into())).unwrap();

        let reopened = TomlFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("flag"), Some(PrefValue::Bool(false)));
        assert_eq!(reopened.get("count"), Some(PrefValue::Int(-1)));
        assert_eq!(reopened.get("scale"), Some(PrefValue::Float(1.5)));
        assert_eq!(reopened.get("prefix"), Some(PrefValue::String("Img".into())));
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn refresh_picks_up_external_writes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("prefs.toml");
        let mut store = TomlFileStore::open(&path).unwrap();

        std::fs::write(&path, "font = 3\n").unwrap();
        assert_eq!(store.get("font"), None);
        store.refresh().unwrap();
        assert_eq!(store.get("font"), Some(PrefValue::Int(3)));
    }

    #[test]
    fn unparsable_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("prefs.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();
        assert!(matches!(
            TomlFileStore::open(&path),
            Err(StoreError::Parse { .. })
        ));
    }

    #[test]
    fn non_scalar_entries_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("prefs.toml");
        std::fs::write(&path, "list = [1, 2]\nkeep = true\n[section]\nx = 1\n").unwrap();
        let store = TomlFileStore::open(&path).unwrap();
        assert_eq!(store.keys(), vec!["keep".to_string()]);
    }
}
