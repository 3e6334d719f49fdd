//! One scan, end to end: capture -> crop -> decode -> store -> notify.
//!
//! A decode failure short-circuits before the store is touched. Every outcome
//! is published as a `ScanEvent` so any number of views can follow along.

use crate::capture::{self, CaptureError, CaptureRegion, CropError, DisplaySource};
use crate::config::CaptureConfig;
use crate::decode::{self, DecodeFailure};
use crate::notify::{Notification, NotificationSink};
use crate::store::{RecordStore, ScanRecord, StoreError};
use std::sync::Arc;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 32;

#[derive(Clone, Debug)]
pub enum ScanEvent {
    RecordAdded(ScanRecord),
    /// Neither the full capture nor the primary-display fallback worked, or
    /// the selection could not be cut out of what was captured.
    CaptureFailed(String),
    DecodeFailed(DecodeFailure),
    StoreFailed(String),
    /// History changed outside of a scan (delete, clear).
    RecordsChanged,
}

pub struct ScanPipeline {
    config: CaptureConfig,
    source: Arc<dyn DisplaySource>,
    store: Arc<RecordStore>,
    notifier: Arc<dyn NotificationSink>,
    events: broadcast::Sender<ScanEvent>,
}

impl ScanPipeline {
    pub fn new(
        config: CaptureConfig,
        source: Arc<dyn DisplaySource>,
        store: Arc<RecordStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            source,
            store,
            notifier,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    /// Publishes an event. Having no subscribers is not an error.
    pub fn publish(&self, event: ScanEvent) {
        let _ = self.events.send(event);
    }

    /// Captures the screen, crops `region` (logical desktop coordinates),
    /// decodes it and stores the result.
    pub async fn scan_region(&self, region: CaptureRegion) -> Result<ScanRecord, ScanError> {
        let min = self.config.min_region_size;
        if !(region.width >= min && region.height >= min) {
            log::info!(
                "[PIPELINE] Selection {}x{} below minimum {}, ignoring",
                region.width,
                region.height,
                min
            );
            return Err(ScanError::RegionTooSmall {
                width: region.width,
                height: region.height,
            });
        }

        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }

        let start = std::time::Instant::now();
        let source = Arc::clone(&self.source);
        let decoded = tokio::task::spawn_blocking(move || -> Result<_, ScanError> {
            let frames = capture::capture_frames(source.as_ref())?;
            let cropped = capture::crop_frames(&frames, &region)?;
            log::debug!(
                "[PIPELINE] Cropped {}x{} px from selection",
                cropped.width(),
                cropped.height()
            );
            Ok(decode::decode_image(&cropped))
        })
        .await?;

        let decoded = match decoded {
            Ok(result) => result,
            Err(e) => {
                log::error!("[PIPELINE] Capture failed: {}", e);
                self.notifier.notify(&Notification::capture_failed(&e.to_string()));
                self.publish(ScanEvent::CaptureFailed(e.to_string()));
                return Err(e);
            }
        };

        let payload = match decoded {
            Ok(payload) => payload,
            Err(failure) => {
                log::info!(
                    "[PIPELINE] Decode failed after {}ms: {}",
                    start.elapsed().as_millis(),
                    failure
                );
                self.notifier.notify(&Notification::not_found(&failure.to_string()));
                self.publish(ScanEvent::DecodeFailed(failure.clone()));
                return Err(ScanError::Decode(failure));
            }
        };

        let record = match self.store.append(&payload, None).await {
            Ok(record) => record,
            Err(e) => {
                log::error!("[PIPELINE] Decoded but could not store: {}", e);
                self.notifier.notify(&Notification::store_failed(&e.to_string()));
                self.publish(ScanEvent::StoreFailed(e.to_string()));
                return Err(ScanError::Store(e));
            }
        };

        log::info!(
            "[PIPELINE] Scan complete in {}ms: {:?}",
            start.elapsed().as_millis(),
            record.title
        );
        self.notifier.notify(&Notification::decoded(&record.payload));
        self.publish(ScanEvent::RecordAdded(record.clone()));
        Ok(record)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Selection {width}x{height} is too small to scan")]
    RegionTooSmall { width: f64, height: f64 },

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Crop(#[from] CropError),

    #[error(transparent)]
    Decode(DecodeFailure),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Capture task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}
