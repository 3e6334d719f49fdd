//! Title resolution: maps decoded text to a short human-readable label.
//!
//! Non-URL payloads are classified locally (`classify`). URLs go through the
//! network: redirects are expanded, the page is fetched with size and time
//! bounds, and the title is scraped out (`extract`). Every failure degrades to
//! the hostname, so `resolve` always returns something displayable.

pub mod classify;
pub mod clean;
pub mod extract;
pub mod fetch;

pub use classify::{content_kind, local_title, ContentKind};

use crate::config::ResolverConfig;
use fetch::{FetchError, PageFetcher};
use url::Url;

pub struct TitleResolver {
    fetcher: PageFetcher,
}

impl TitleResolver {
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolverError> {
        Ok(Self {
            fetcher: PageFetcher::new(config).map_err(ResolverError::Client)?,
        })
    }

    /// Returns a title for `text`: never empty, at most 100 characters.
    pub async fn resolve(&self, text: &str) -> String {
        let title = match content_kind(text) {
            ContentKind::Url => match Url::parse(text) {
                Ok(url) if url.host_str().is_some_and(|h| !h.is_empty()) => {
                    match self.fetch_title(&url).await {
                        Some(title) => title,
                        None => url.host_str().unwrap_or_default().to_string(),
                    }
                }
                _ => classify::plain_text_title(text),
            },
            _ => local_title(text),
        };
        classify::finalize_title(title, text)
    }

    /// Network title lookup for a URL. `None` on any error, timeout or when
    /// the page offers nothing usable.
    pub async fn fetch_title(&self, url: &Url) -> Option<String> {
        let start = std::time::Instant::now();
        let target = self.fetcher.resolve_redirects(url).await;
        if &target != url {
            log::info!("[TITLE] Expanded {} -> {}", url, target);
        }

        let document = match self.fetcher.fetch_document(&target).await {
            Ok(doc) => doc,
            Err(FetchError::Status(code)) => {
                log::info!("[TITLE] {} answered HTTP {}, falling back", target, code);
                return None;
            }
            Err(e) => {
                log::info!("[TITLE] Fetch of {} failed: {}, falling back", target, e);
                return None;
            }
        };

        let title = extract::extract_title(&document.html, &target, url);
        match &title {
            Some(t) => log::info!(
                "[TITLE] Resolved {:?} in {}ms{}",
                t,
                start.elapsed().as_millis(),
                if document.truncated { " from partial body" } else { "" }
            ),
            None => log::info!("[TITLE] No usable title on {}", target),
        }
        title
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("Failed to build HTTP client: {0}")]
    Client(FetchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_resolver() -> TitleResolver {
        TitleResolver::new(&ResolverConfig {
            use_system_proxy: false,
            ..ResolverConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn non_url_payloads_never_touch_the_network() {
        let resolver = offline_resolver();
        assert_eq!(resolver.resolve("WIFI:S:MyNet;T:WPA;P:pass;;").await, "WiFi: MyNet");
        assert_eq!(resolver.resolve("tel:+1-555-123-4567").await, classify::PHONE_LABEL);
    }

    #[tokio::test]
    async fn unparseable_url_uses_plain_text_rule() {
        let resolver = offline_resolver();
        assert_eq!(resolver.resolve("http://").await, "http://");
    }
}
