//! User-facing notifications about scan outcomes.
//!
//! The crate only builds the message; presenting it is up to the shell, which
//! plugs in its own `NotificationSink`.

const MAX_BODY_CHARS: usize = 100;

pub const DECODED_TITLE: &str = "QR code decoded";
pub const NOT_FOUND_TITLE: &str = "No QR code found";
pub const STORE_FAILED_TITLE: &str = "Could not save scan";
pub const CAPTURE_FAILED_TITLE: &str = "Screen capture failed";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Opened when the user clicks the notification.
    pub click_url: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: &str, click_url: Option<&str>) -> Self {
        Self {
            title: title.into(),
            body: truncate_body(body),
            click_url: click_url.and_then(clickable_url),
        }
    }

    pub fn decoded(payload: &str) -> Self {
        Self::new(DECODED_TITLE, payload, Some(payload))
    }

    pub fn not_found(detail: &str) -> Self {
        Self::new(NOT_FOUND_TITLE, detail, None)
    }

    pub fn store_failed(detail: &str) -> Self {
        Self::new(STORE_FAILED_TITLE, detail, None)
    }

    pub fn capture_failed(detail: &str) -> Self {
        Self::new(CAPTURE_FAILED_TITLE, detail, None)
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Writes notifications to the log. Used when no shell is attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, notification: &Notification) {
        match &notification.click_url {
            Some(url) => log::info!(
                "[NOTIFY] {}: {} ({})",
                notification.title,
                notification.body,
                url
            ),
            None => log::info!("[NOTIFY] {}: {}", notification.title, notification.body),
        }
    }
}

fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_BODY_CHARS {
        let head: String = body.chars().take(MAX_BODY_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}

/// http(s) links pass through; bare `www.` hosts get an https scheme.
fn clickable_url(candidate: &str) -> Option<String> {
    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        Some(candidate.to_string())
    } else if candidate.starts_with("www.") {
        Some(format!("https://{}", candidate))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_bodies_are_cut_to_one_hundred_chars() {
        let n = Notification::decoded(&"a".repeat(150));
        assert_eq!(n.body.chars().count(), 100);
        assert!(n.body.ends_with("..."));

        let exact = Notification::decoded(&"b".repeat(100));
        assert_eq!(exact.body, "b".repeat(100));
    }

    #[test]
    fn click_url_only_for_links() {
        assert_eq!(
            Notification::decoded("www.example.com").click_url.as_deref(),
            Some("https://www.example.com")
        );
        assert_eq!(
            Notification::decoded("http://a.b/c").click_url.as_deref(),
            Some("http://a.b/c")
        );
        assert_eq!(Notification::decoded("hello").click_url, None);
    }

    #[test]
    fn failures_are_distinct() {
        assert_ne!(
            Notification::not_found("x").title,
            Notification::store_failed("x").title
        );
    }
}
