//! QR Snap: screen-snip QR scanning core.
//!
//! This crate wires together:
//! - Screen capture and cropping (capture/)
//! - Two-pass QR decoding (decode.rs)
//! - Title resolution, local and over HTTP (title/)
//! - Scan history and settings persistence (store/)
//! - The scan pipeline and its event stream (pipeline.rs)
//!
//! The desktop shell (tray, overlays, windows) lives outside and talks to
//! `QrSnap`.

pub mod capture;
pub mod config;
pub mod decode;
pub mod notify;
pub mod pipeline;
pub mod settings;
pub mod store;
pub mod title;

pub use capture::{CaptureRegion, DisplaySource, SelectionCoordinator, XcapDisplaySource};
pub use config::AppConfig;
pub use decode::{decode_image, decode_rgba, DecodeFailure, DecodeResult};
pub use notify::{LogNotifier, Notification, NotificationSink};
pub use pipeline::{ScanError, ScanEvent, ScanPipeline};
pub use settings::Settings;
pub use store::{JsonFileBackend, MemoryBackend, RecordStore, ScanRecord, StorageBackend, StoreError};
pub use title::TitleResolver;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Initialise `env_logger`, defaulting to `info`. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// Application context handed to the shell.
pub struct QrSnap {
    store: Arc<RecordStore>,
    resolver: Arc<TitleResolver>,
    pipeline: ScanPipeline,
    selection: SelectionCoordinator,
}

impl QrSnap {
    /// Production wiring: JSON store under `config.data_dir`, real screen
    /// capture, log-only notifications.
    pub fn new(config: AppConfig) -> Result<Self, InitError> {
        log::info!("[QRSNAP] Starting with data dir {}", config.data_dir.display());
        let backend = JsonFileBackend::new(config.store_path());
        Self::with_parts(
            config,
            Box::new(backend),
            Arc::new(XcapDisplaySource),
            Arc::new(LogNotifier),
        )
    }

    pub fn with_parts(
        config: AppConfig,
        backend: Box<dyn StorageBackend>,
        source: Arc<dyn DisplaySource>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self, InitError> {
        let resolver = Arc::new(TitleResolver::new(&config.resolver)?);
        let store = Arc::new(RecordStore::open(backend, Arc::clone(&resolver))?);
        let pipeline = ScanPipeline::new(
            config.capture.clone(),
            source,
            Arc::clone(&store),
            notifier,
        );

        Ok(Self {
            store,
            resolver,
            pipeline,
            selection: SelectionCoordinator::new(),
        })
    }

    pub async fn scan_region(&self, region: CaptureRegion) -> Result<ScanRecord, ScanError> {
        self.pipeline.scan_region(region).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.pipeline.subscribe()
    }

    pub fn selection(&self) -> &SelectionCoordinator {
        &self.selection
    }

    pub fn resolver(&self) -> &TitleResolver {
        &self.resolver
    }

    pub fn records(&self) -> Result<Vec<ScanRecord>, StoreError> {
        self.store.list()
    }

    pub fn search(
        &self,
        query: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<ScanRecord>, StoreError> {
        self.store.search(query, start, end)
    }

    pub fn delete_record(&self, id: Uuid) -> Result<bool, StoreError> {
        let removed = self.store.delete(id)?;
        if removed {
            self.pipeline.publish(ScanEvent::RecordsChanged);
        }
        Ok(removed)
    }

    pub fn clear_records(&self) -> Result<(), StoreError> {
        self.store.clear()?;
        self.pipeline.publish(ScanEvent::RecordsChanged);
        Ok(())
    }

    pub fn settings(&self) -> Result<Settings, StoreError> {
        self.store.settings()
    }

    pub fn update_settings<F>(&self, update: F) -> Result<Settings, StoreError>
    where
        F: FnOnce(&mut Settings),
    {
        self.store.update_settings(update)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Resolver(#[from] title::ResolverError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
