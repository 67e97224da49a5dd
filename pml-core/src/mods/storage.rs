//! Durable per-user storage for the mod reference list.
//!
//! Storage is a flat string key/value store. The reference list is written
//! as a JSON array under a single key, so the same document can be shared
//! with other tools that read the host's storage.

use crate::error::PmlResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Version sentinel meaning "resolve the newest version on every load".
pub const LATEST: &str = "latest";

/// Persisted pointer to a mod: where it lives, which version, and whether
/// the user wants it active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModReference {
    pub base: String,
    pub version: String,
    pub loaded: bool,
}

impl ModReference {
    pub fn new(base: &str, version: &str, loaded: bool) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            version: version.to_string(),
            loaded,
        }
    }

    pub fn is_latest(&self) -> bool {
        self.version == LATEST
    }
}

/// String key/value store.
pub trait Storage: Send {
    fn get_item(&self, key: &str) -> PmlResult<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> PmlResult<()>;
}

/// Storage backed by a JSON object on disk. Every write is flushed.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: BTreeMap<String, String>,
}

impl FileStorage {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: &Path) -> PmlResult<Self> {
        let items = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            BTreeMap::new()
        };
        log::debug!("Opened storage at {:?} ({} keys)", path, items.len());
        Ok(Self {
            path: path.to_path_buf(),
            items,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> PmlResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.items)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> PmlResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> PmlResult<()> {
        self.items.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

/// In-process storage, lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> PmlResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> PmlResult<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Read the reference list stored under `key`, if any.
pub fn load_references(storage: &dyn Storage, key: &str) -> PmlResult<Option<Vec<ModReference>>> {
    match storage.get_item(key)? {
        Some(text) if !text.is_empty() => Ok(Some(serde_json::from_str(&text)?)),
        _ => Ok(None),
    }
}

/// Write the reference list under `key`.
pub fn save_references(storage: &mut dyn Storage, key: &str, references: &[ModReference]) -> PmlResult<()> {
    let text = serde_json::to_string(references)?;
    storage.set_item(key, &text)
}
