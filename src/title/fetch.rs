//! HTTP side of title resolution: manual redirect following and a
//! size-bounded document fetch.
//!
//! The client never follows redirects on its own; `resolve_redirects` walks
//! `Location` headers itself so short links can be expanded and inspected.

use crate::config::ResolverConfig;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, CACHE_CONTROL, LOCATION};
use reqwest::{redirect, StatusCode};
use url::Url;

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

pub struct PageFetcher {
    client: reqwest::Client,
    max_redirects: usize,
    max_content_length: usize,
    accept_language: String,
}

/// A fetched document body, possibly cut short.
#[derive(Debug)]
pub struct Document {
    pub html: String,
    /// The body hit the size cap before the server finished sending it.
    pub truncated: bool,
}

impl PageFetcher {
    pub fn new(config: &ResolverConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .user_agent(config.user_agent.clone());
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        Ok(Self {
            client: builder.build()?,
            max_redirects: config.max_redirects,
            max_content_length: config.max_content_length,
            accept_language: config.accept_language.clone(),
        })
    }

    /// Follows 3xx `Location` headers with HEAD requests, at most
    /// `max_redirects` hops. Stops on a self-redirect, a non-redirect
    /// response or any request error, and returns the last URL reached.
    pub async fn resolve_redirects(&self, url: &Url) -> Url {
        let mut current = url.clone();

        for hop in 0..self.max_redirects {
            let response = match self
                .client
                .head(current.clone())
                .header(ACCEPT, "*/*")
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    log::debug!("[TITLE] HEAD {} failed: {}", current, e);
                    break;
                }
            };

            if !response.status().is_redirection() {
                break;
            }
            let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
            else {
                break;
            };
            let next = match current.join(location) {
                Ok(next) => next,
                Err(e) => {
                    log::debug!("[TITLE] Bad Location {:?}: {}", location, e);
                    break;
                }
            };
            if next == current {
                log::debug!("[TITLE] {} redirects to itself", current);
                break;
            }

            log::debug!("[TITLE] Redirect {}: {} -> {}", hop + 1, current, next);
            current = next;
        }

        current
    }

    /// GETs `url` and reads at most `max_content_length` bytes of the body.
    ///
    /// Anything but a 200 is an error. Reading stops early once both
    /// `</title>` and `</head>` have arrived.
    pub async fn fetch_document(&self, url: &Url) -> Result<Document, FetchError> {
        let start = std::time::Instant::now();

        let mut response = self
            .client
            .get(url.clone())
            .header(ACCEPT, HTML_ACCEPT)
            .header(ACCEPT_LANGUAGE, &self.accept_language)
            .header(ACCEPT_ENCODING, "identity")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }
        if let Some(len) = response.content_length() {
            if len as usize > self.max_content_length {
                log::debug!(
                    "[TITLE] {} declares {} bytes, reading the first {}",
                    url,
                    len,
                    self.max_content_length
                );
            }
        }

        let mut body: Vec<u8> = Vec::new();
        let mut truncated = false;
        let mut seen_title_end = false;

        while let Some(chunk) = response.chunk().await? {
            let room = self.max_content_length - body.len();
            // Re-scan a few bytes before the seam so split markers still match.
            let scan_from = body.len().saturating_sub(8);

            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                truncated = chunk.len() > room;
                break;
            }
            body.extend_from_slice(&chunk);

            let fresh = &body[scan_from..];
            seen_title_end = seen_title_end || contains_ignore_case(fresh, b"</title>");
            if seen_title_end && contains_ignore_case(fresh, b"</head>") {
                log::debug!("[TITLE] Head complete after {} bytes, stopping early", body.len());
                break;
            }
        }

        log::info!(
            "[TITLE] Fetched {} bytes from {} in {}ms{}",
            body.len(),
            url,
            start.elapsed().as_millis(),
            if truncated { " (truncated)" } else { "" }
        );

        Ok(Document {
            html: String::from_utf8_lossy(&body).into_owned(),
            truncated,
        })
    }
}

fn contains_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server answered {0}, expected 200")]
    Status(u16),
}
