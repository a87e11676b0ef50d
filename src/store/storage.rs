//! Durable storage backends for saved lists
//!
//! The whole collection is one JSON array under a fixed key, read once at
//! startup and rewritten after every mutation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::StoreError;
use crate::model::SavedList;

/// Fixed namespace under which the list collection is stored
pub const STORAGE_KEY: &str = "trackmatch.saved_lists";

pub trait ListStorage: Send {
    fn load(&self) -> Result<Vec<SavedList>, StoreError>;
    fn save(&mut self, lists: &[SavedList]) -> Result<(), StoreError>;
}

/// `<data_dir>/trackmatch.saved_lists.json`
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{}.json", STORAGE_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ListStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<SavedList>, StoreError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No saved lists yet");
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)?;
        let lists: Vec<SavedList> = serde_json::from_str(&content)?;
        tracing::info!(count = lists.len(), path = %self.path.display(), "Loaded saved lists");
        Ok(lists)
    }

    fn save(&mut self, lists: &[SavedList]) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        // Write-then-rename so a crash never leaves a truncated file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(lists)?)?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(count = lists.len(), "Saved lists persisted");
        Ok(())
    }
}

/// In-process storage holding the serialized form, shared between clones
#[derive(Clone, Default)]
pub struct MemoryStorage {
    serialized: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw stored JSON, if anything was saved
    pub fn contents(&self) -> Option<String> {
        self.serialized.lock().ok().and_then(|guard| guard.clone())
    }
}

impl ListStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<SavedList>, StoreError> {
        match self.contents() {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&mut self, lists: &[SavedList]) -> Result<(), StoreError> {
        let json = serde_json::to_string(lists)?;
        if let Ok(mut guard) = self.serialized.lock() {
            *guard = Some(json);
        }
        Ok(())
    }
}
