use crate::settings::Settings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// One successful decode, as kept in the history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: Uuid,
    #[serde(alias = "data")]
    pub payload: String,
    /// Empty only in documents written before titles existed; backfilled on load.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image_path: Option<PathBuf>,
    #[serde(alias = "timestamp")]
    pub captured_at: DateTime<Utc>,
}

impl ScanRecord {
    pub fn new(payload: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload: payload.into(),
            title: title.into(),
            image_path: None,
            captured_at: Utc::now(),
        }
    }

    /// Case-insensitive substring match on payload or title.
    /// `needle` must already be lowercased.
    pub fn matches_text(&self, needle: &str) -> bool {
        self.payload.to_lowercase().contains(needle) || self.title.to_lowercase().contains(needle)
    }

    pub fn within(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> bool {
        start.map_or(true, |s| self.captured_at >= s) && end.map_or(true, |e| self.captured_at <= e)
    }
}

/// Everything persisted: history (most recent first) and user settings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    #[serde(default)]
    pub scan_records: Vec<ScanRecord>,
    #[serde(default)]
    pub settings: Settings,
}
