//! Runtime configuration.
//!
//! Defaults suit a desktop install. `AppConfig::from_env()` loads `.env`
//! (if present) and lets `QRSNAP_*` variables override individual knobs.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Name of the JSON document holding records and settings.
pub const STORE_FILE_NAME: &str = "store.json";

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    /// Budget for each network call (redirect check or document fetch).
    pub request_timeout: Duration,
    pub max_redirects: usize,
    /// Body bytes read before the fetch stops and parses what it has.
    pub max_content_length: usize,
    pub user_agent: String,
    pub accept_language: String,
    /// Honour `HTTP(S)_PROXY` from the environment.
    pub use_system_proxy: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_redirects: 5,
            max_content_length: 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            use_system_proxy: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Selections smaller than this (logical px, either edge) are rejected.
    pub min_region_size: f64,
    /// Pause before capturing so the selection overlays are off screen.
    pub settle_delay: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            min_region_size: 10.0,
            settle_delay: Duration::from_millis(200),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub capture: CaptureConfig,
    pub resolver: ResolverConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            capture: CaptureConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }
}

/// Platform config directory:
///   macOS:   ~/Library/Application Support/qr-snap/
///   Linux:   ~/.config/qr-snap/
///   Windows: %APPDATA%/qr-snap/
pub fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qr-snap")
}

impl AppConfig {
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE_NAME)
    }

    /// Defaults overridden by `QRSNAP_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("[CONFIG] Loaded {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("[CONFIG] Ignoring unreadable .env: {}", e),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(dir) = lookup("QRSNAP_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "QRSNAP_FETCH_TIMEOUT_MS")? {
            config.resolver.request_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var::<usize>(&lookup, "QRSNAP_MAX_REDIRECTS")? {
            config.resolver.max_redirects = n;
        }
        if let Some(n) = parse_var::<usize>(&lookup, "QRSNAP_MAX_CONTENT_BYTES")? {
            config.resolver.max_content_length = n;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "QRSNAP_SETTLE_DELAY_MS")? {
            config.capture.settle_delay = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
}
