//! Local, network-free classification of decoded payloads.
//!
//! Shared by record creation and the title backfill migration. Rules are
//! evaluated top to bottom and the first match wins.

use regex::Regex;
use std::sync::LazyLock;

pub const WIFI_LABEL: &str = "WiFi Network";
pub const CONTACT_LABEL: &str = "Contact";
pub const PHONE_LABEL: &str = "Phone Number";
pub const EMAIL_LABEL: &str = "Email";
pub const LOCATION_LABEL: &str = "Location";

/// Hard cap on every title we hand out.
pub const MAX_TITLE_CHARS: usize = 100;
/// Plain-text payloads longer than this are cut and get an ellipsis.
pub const PLAIN_TEXT_CHARS: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Wifi,
    Contact,
    Phone,
    Email,
    Geo,
    Url,
    Text,
}

struct Rule {
    kind: ContentKind,
    matches: fn(&str) -> bool,
    title: fn(&str) -> String,
}

static RULES: &[Rule] = &[
    Rule {
        kind: ContentKind::Wifi,
        matches: |text| text.starts_with("WIFI:"),
        title: wifi_title,
    },
    Rule {
        kind: ContentKind::Contact,
        matches: |text| text.starts_with("BEGIN:VCARD") || text.starts_with("MECARD:"),
        title: contact_title,
    },
    Rule {
        kind: ContentKind::Phone,
        matches: is_phone,
        title: |_| PHONE_LABEL.to_string(),
    },
    Rule {
        kind: ContentKind::Email,
        matches: |text| text.contains('@') && text.contains('.') && !text.starts_with("http"),
        title: |_| EMAIL_LABEL.to_string(),
    },
    Rule {
        kind: ContentKind::Geo,
        matches: |text| text.starts_with("geo:"),
        title: |_| LOCATION_LABEL.to_string(),
    },
];

static PHONE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d\-()\s]{10,}$").unwrap());

fn is_phone(text: &str) -> bool {
    text.starts_with("tel:")
        || (PHONE_SHAPE.is_match(text) && text.chars().filter(|c| c.is_ascii_digit()).count() >= 10)
}

pub fn is_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}

/// Classifies a payload. URLs are only recognised after rules 1–5 miss.
pub fn content_kind(text: &str) -> ContentKind {
    if let Some(rule) = RULES.iter().find(|rule| (rule.matches)(text)) {
        return rule.kind;
    }
    if is_url(text) {
        ContentKind::Url
    } else {
        ContentKind::Text
    }
}

/// Title without any network access: the WiFi/contact/phone/email/geo rules,
/// else the plain-text rule. URLs fall through to the plain-text rule here.
pub fn local_title(text: &str) -> String {
    let title = RULES
        .iter()
        .find(|rule| (rule.matches)(text))
        .map(|rule| (rule.title)(text))
        .unwrap_or_else(|| plain_text_title(text));
    finalize_title(title, text)
}

/// Short payloads verbatim, long ones cut to 50 characters plus `...`.
pub fn plain_text_title(text: &str) -> String {
    if text.chars().count() <= PLAIN_TEXT_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(PLAIN_TEXT_CHARS).collect();
        format!("{}...", head)
    }
}

/// Enforces the title invariants: never blank, never over the cap.
pub fn finalize_title(title: String, payload: &str) -> String {
    let title = if title.trim().is_empty() {
        plain_text_title(payload)
    } else {
        title
    };
    truncate_chars(&title, MAX_TITLE_CHARS)
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn wifi_title(text: &str) -> String {
    let ssid = text["WIFI:".len()..]
        .split(';')
        .find_map(|field| field.strip_prefix("S:"))
        .filter(|ssid| !ssid.is_empty());
    match ssid {
        Some(ssid) => format!("WiFi: {}", ssid),
        None => WIFI_LABEL.to_string(),
    }
}

fn contact_title(text: &str) -> String {
    // MECARD packs fields into one line separated by `;`; vCard uses one
    // field per line and `;` between name components.
    let (fields, component_sep): (Vec<&str>, char) = match text.strip_prefix("MECARD:") {
        Some(body) => (body.split(';').collect(), ','),
        None => (text.lines().collect(), ';'),
    };
    let fields: Vec<&str> = fields
        .into_iter()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    let name = fields
        .iter()
        .find_map(|f| f.strip_prefix("FN:"))
        .or_else(|| fields.iter().find_map(|f| f.strip_prefix("N:")))
        .map(|name| {
            name.split(component_sep)
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|name| !name.is_empty());

    name.unwrap_or_else(|| CONTACT_LABEL.to_string())
}
