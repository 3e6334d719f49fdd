//! Durable storage behind the record store.

use super::record::StoreDocument;
use super::StoreError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

pub trait StorageBackend: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<StoreDocument>, StoreError>;

    /// Replaces the stored document. Must be all-or-nothing.
    fn save(&self, document: &StoreDocument) -> Result<(), StoreError>;
}

/// Pretty-printed JSON document on disk, replaced atomically via rename.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for JsonFileBackend {
    fn load(&self) -> Result<Option<StoreDocument>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        if contents.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                source: e,
            })
    }

    fn save(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let io_err = |e| StoreError::Io {
            path: self.path.clone(),
            source: e,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }

        let serialized = serde_json::to_string_pretty(document).map_err(StoreError::Serialize)?;

        // Write next to the target and rename over it so a crash never
        // leaves a half-written history behind.
        let partial = self.path.with_extension("json.partial");
        std::fs::write(&partial, serialized).map_err(io_err)?;
        std::fs::rename(&partial, &self.path).map_err(io_err)?;
        Ok(())
    }
}

/// In-process backend for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryBackend {
    document: Mutex<Option<StoreDocument>>,
    fail_saves: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: StoreDocument) -> Self {
        Self {
            document: Mutex::new(Some(document)),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Makes every following `save` fail, to exercise rollback paths.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Option<StoreDocument> {
        self.document.lock().ok().and_then(|guard| guard.clone())
    }
}

impl StorageBackend for MemoryBackend {
    fn load(&self) -> Result<Option<StoreDocument>, StoreError> {
        let guard = self.document.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(guard.clone())
    }

    fn save(&self, document: &StoreDocument) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory backend set to fail".into()));
        }
        let mut guard = self.document.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = Some(document.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::ScanRecord;

    #[test]
    fn json_file_round_trips_and_leaves_no_partial() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(dir.path().join("nested").join("store.json"));
        assert!(backend.load().unwrap().is_none());

        let mut doc = StoreDocument::default();
        doc.scan_records.push(ScanRecord::new("hello", "hello"));
        backend.save(&doc).unwrap();

        assert_eq!(backend.load().unwrap(), Some(doc));
        assert!(!backend.path().with_extension("json.partial").exists());
    }

    #[test]
    fn garbage_on_disk_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();
        let result = JsonFileBackend::new(path).load();
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }
}
