//! Scan history and settings persistence.
//!
//! The in-memory document is the source of truth while the process runs.
//! Every mutation is applied to a copy, saved, and only then swapped in, so a
//! failed save leaves both memory and disk at the previous state.

pub mod backend;
pub mod record;

pub use backend::{JsonFileBackend, MemoryBackend, StorageBackend};
pub use record::{ScanRecord, StoreDocument};

use crate::settings::Settings;
use crate::title::{local_title, TitleResolver};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

pub struct RecordStore {
    backend: Box<dyn StorageBackend>,
    resolver: Arc<TitleResolver>,
    state: Mutex<StoreDocument>,
}

impl RecordStore {
    /// Loads the persisted document (or starts empty) and backfills titles
    /// on records saved before titles existed.
    pub fn open(
        backend: Box<dyn StorageBackend>,
        resolver: Arc<TitleResolver>,
    ) -> Result<Self, StoreError> {
        let mut document = backend.load()?.unwrap_or_default();

        let mut backfilled = 0usize;
        for record in document.scan_records.iter_mut() {
            if record.title.trim().is_empty() {
                record.title = local_title(&record.payload);
                backfilled += 1;
            }
        }
        if backfilled > 0 {
            log::info!("[STORE] Backfilled titles on {} legacy records", backfilled);
            backend.save(&document)?;
        }

        log::info!("[STORE] Opened with {} records", document.scan_records.len());
        Ok(Self {
            backend,
            resolver,
            state: Mutex::new(document),
        })
    }

    /// Resolves a title for `payload` and inserts a new record at the head of
    /// the history. Title resolution happens before the lock is taken, so a
    /// slow fetch never blocks readers.
    pub async fn append(
        &self,
        payload: &str,
        image_path: Option<PathBuf>,
    ) -> Result<ScanRecord, StoreError> {
        if payload.is_empty() {
            return Err(StoreError::EmptyPayload);
        }

        let title = self.resolver.resolve(payload).await;
        let mut record = ScanRecord::new(payload, title);
        record.image_path = image_path;

        let inserted = record.clone();
        self.mutate(|doc| {
            doc.scan_records.insert(0, record);
            Ok(())
        })?;

        log::info!("[STORE] Added record {} ({:?})", inserted.id, inserted.title);
        Ok(inserted)
    }

    /// All records, most recent first.
    pub fn list(&self) -> Result<Vec<ScanRecord>, StoreError> {
        Ok(self.lock()?.scan_records.clone())
    }

    pub fn get(&self, id: Uuid) -> Result<Option<ScanRecord>, StoreError> {
        Ok(self.lock()?.scan_records.iter().find(|r| r.id == id).cloned())
    }

    /// Removes the record with `id`. Returns `Ok(false)` without touching
    /// storage when no such record exists.
    pub fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        let Some(index) = state.scan_records.iter().position(|r| r.id == id) else {
            log::debug!("[STORE] Delete of unknown record {}", id);
            return Ok(false);
        };

        let mut next = state.clone();
        next.scan_records.remove(index);
        self.backend.save(&next)?;
        *state = next;

        log::info!("[STORE] Deleted record {}", id);
        Ok(true)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.mutate(|doc| {
            doc.scan_records.clear();
            Ok(())
        })?;
        log::info!("[STORE] Cleared history");
        Ok(())
    }

    /// Filters the history by text and capture time.
    ///
    /// A blank `query` matches everything; otherwise the match is a
    /// case-insensitive substring test of the untrimmed query on payload or
    /// title. Bounds are inclusive. Order is preserved.
    pub fn search(
        &self,
        query: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<ScanRecord>, StoreError> {
        let needle = (!query.trim().is_empty()).then(|| query.to_lowercase());
        let state = self.lock()?;
        Ok(state
            .scan_records
            .iter()
            .filter(|r| needle.as_deref().map_or(true, |n| r.matches_text(n)))
            .filter(|r| r.within(start, end))
            .cloned()
            .collect())
    }

    pub fn settings(&self) -> Result<Settings, StoreError> {
        Ok(self.lock()?.settings.clone())
    }

    /// Applies `update` to the settings and persists the result.
    pub fn update_settings<F>(&self, update: F) -> Result<Settings, StoreError>
    where
        F: FnOnce(&mut Settings),
    {
        let mut updated = None;
        self.mutate(|doc| {
            update(&mut doc.settings);
            if !crate::settings::validate_shortcut(&doc.settings.shortcut) {
                return Err(StoreError::InvalidSettings(format!(
                    "unrecognised shortcut {:?}",
                    doc.settings.shortcut
                )));
            }
            updated = Some(doc.settings.clone());
            Ok(())
        })?;
        log::info!("[STORE] Settings updated");
        Ok(updated.unwrap_or_default())
    }

    fn mutate<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut StoreDocument) -> Result<(), StoreError>,
    {
        let mut state = self.lock()?;
        let mut next = state.clone();
        change(&mut next)?;
        if let Err(e) = self.backend.save(&next) {
            log::error!("[STORE] Save failed, keeping previous state: {}", e);
            return Err(e);
        }
        *state = next;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreDocument>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored document at {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize store: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Refusing to store an empty payload")]
    EmptyPayload,

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;

    fn resolver() -> Arc<TitleResolver> {
        Arc::new(
            TitleResolver::new(&ResolverConfig {
                use_system_proxy: false,
                ..ResolverConfig::default()
            })
            .unwrap(),
        )
    }

    fn memory_store() -> RecordStore {
        RecordStore::open(Box::new(MemoryBackend::new()), resolver()).unwrap()
    }

    #[tokio::test]
    async fn append_puts_newest_first() {
        let store = memory_store();
        store.append("first", None).await.unwrap();
        store.append("second", None).await.unwrap();
        let payloads: Vec<_> = store.list().unwrap().into_iter().map(|r| r.payload).collect();
        assert_eq!(payloads, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn empty_payload_is_rejected() {
        let store = memory_store();
        assert!(matches!(store.append("", None).await, Err(StoreError::EmptyPayload)));
        assert!(store.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_empties_history_but_keeps_settings() {
        let store = memory_store();
        store.update_settings(|s| s.auto_launch = true).unwrap();
        store.append("x", None).await.unwrap();
        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());
        assert!(store.settings().unwrap().auto_launch);
    }

    #[test]
    fn invalid_shortcut_is_not_saved() {
        let store = memory_store();
        let result = store.update_settings(|s| s.shortcut = "Q".into());
        assert!(matches!(result, Err(StoreError::InvalidSettings(_))));
        assert_eq!(store.settings().unwrap().shortcut, "Alt+Shift+S");
    }
}
