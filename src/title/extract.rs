//! Pattern-based title extraction from fetched HTML.
//!
//! Map, video and social hosts get their own locator lists and a glyph prefix.
//! Everything else goes through the generic locator list, and finally the URL's
//! own query data is tried.

use super::clean::{clean_title, is_meaningful, usable_title};
use super::classify::{truncate_chars, MAX_TITLE_CHARS};
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// One way of pulling a raw title candidate out of a document.
pub enum Locator {
    /// `<meta property|name="key" content="...">`, in either attribute order.
    Meta(&'static str),
    /// First capture group of a regex.
    Pattern(&'static LazyLock<Regex>),
}

impl Locator {
    fn find(&self, html: &str) -> Option<String> {
        match self {
            Locator::Meta(key) => meta_content(html, key),
            Locator::Pattern(re) => re
                .captures(html)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string()),
        }
    }
}

static META_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").unwrap());
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static TITLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").unwrap());
static JSON_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""name"\s*:\s*"((?:[^"\\]|\\.)+)""#).unwrap());
static JSON_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""title"\s*:\s*"((?:[^"\\]|\\.)+)""#).unwrap());

static H1_DATA_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<h1[^>]*data-value="([^"]+)""#).unwrap());
static ARIA_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)aria-label="([^"]+)""#).unwrap());
static DATA_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)data-value="([^"]+)""#).unwrap());
static PLACE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)place_name['"]\s*:\s*['"]([^'"]+)['"]"#).unwrap());

static VIDEO_DETAILS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"videoDetails":\{"videoId":"[^"]*","title":"((?:[^"\\]|\\.)+)""#).unwrap()
});
static TITLE_RUNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"title":\{"runs":\[\{"text":"((?:[^"\\]|\\.)+)""#).unwrap()
});

static GENERIC_LOCATORS: &[Locator] = &[
    Locator::Meta("og:title"),
    Locator::Meta("twitter:title"),
    Locator::Pattern(&JSON_NAME),
    Locator::Pattern(&JSON_TITLE),
    Locator::Pattern(&TITLE_TAG),
    Locator::Pattern(&HEADING),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostKind {
    Map,
    Video,
    Social,
}

impl HostKind {
    pub fn glyph(self) -> &'static str {
        match self {
            HostKind::Map => "📍",
            HostKind::Video => "🎥",
            HostKind::Social => "👥",
        }
    }
}

struct HostRule {
    kind: HostKind,
    matches: fn(&Url) -> bool,
    locators: &'static [Locator],
    reject: fn(&str) -> bool,
    /// Fall back to place names carried in the URL itself.
    url_fallback: bool,
}

static HOST_RULES: &[HostRule] = &[
    HostRule {
        kind: HostKind::Map,
        matches: is_map_url,
        locators: &[
            Locator::Pattern(&JSON_NAME),
            Locator::Pattern(&H1_DATA_VALUE),
            Locator::Pattern(&HEADING),
            Locator::Meta("og:title"),
            Locator::Meta("twitter:title"),
            Locator::Pattern(&ARIA_LABEL),
            Locator::Pattern(&DATA_VALUE),
            Locator::Pattern(&TITLE_TAG),
            Locator::Pattern(&JSON_TITLE),
            Locator::Pattern(&PLACE_NAME),
        ],
        reject: |title| {
            let lower = title.to_lowercase();
            title.chars().count() < 2
                || (lower.contains("google") && title.chars().count() < 15)
                || (lower.contains("maps") && title.chars().count() < 10)
        },
        url_fallback: true,
    },
    HostRule {
        kind: HostKind::Video,
        matches: |url| host_contains(url, &["youtube.com", "youtu.be"]),
        locators: &[
            Locator::Pattern(&VIDEO_DETAILS),
            Locator::Meta("og:title"),
            Locator::Meta("twitter:title"),
            Locator::Pattern(&TITLE_TAG),
            Locator::Pattern(&TITLE_RUNS),
            Locator::Pattern(&JSON_TITLE),
        ],
        reject: |title| title.chars().count() < 3,
        url_fallback: false,
    },
    HostRule {
        kind: HostKind::Social,
        matches: |url| host_contains(url, &["facebook.com", "fb.me", "fb.com"]),
        locators: &[Locator::Meta("og:title"), Locator::Pattern(&TITLE_TAG)],
        reject: |_| false,
        url_fallback: false,
    },
];

fn host(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_lowercase()
}

fn host_contains(url: &Url, needles: &[&str]) -> bool {
    let host = host(url);
    needles.iter().any(|n| host.contains(n))
}

fn is_map_url(url: &Url) -> bool {
    let host = host(url);
    host.contains("maps.google")
        || host.contains("goo.gl")
        || (host.contains("google.") && url.path().starts_with("/maps"))
}

/// Which special-cased family `url` belongs to, if any.
pub fn host_kind(url: &Url) -> Option<HostKind> {
    HOST_RULES.iter().find(|r| (r.matches)(url)).map(|r| r.kind)
}

/// Extracts the best title from `html`, fetched from `final_url` after
/// redirects starting at `original_url`. `None` when nothing usable is found.
pub fn extract_title(html: &str, final_url: &Url, original_url: &Url) -> Option<String> {
    let rule = HOST_RULES
        .iter()
        .find(|r| (r.matches)(final_url))
        .or_else(|| HOST_RULES.iter().find(|r| (r.matches)(original_url)));

    if let Some(rule) = rule {
        if let Some(title) = extract_for_host(rule, html, final_url) {
            return Some(title);
        }
        log::debug!("[TITLE] {:?} rules found nothing, trying generic locators", rule.kind);
    }

    if let Some(title) = GENERIC_LOCATORS
        .iter()
        .filter_map(|locator| locator.find(html))
        .find_map(|raw| usable_title(&raw))
    {
        return Some(title);
    }

    title_from_url(final_url)
}

fn extract_for_host(rule: &HostRule, html: &str, url: &Url) -> Option<String> {
    let found = rule
        .locators
        .iter()
        .filter_map(|locator| locator.find(html))
        .map(|raw| clean_title(&raw))
        .find(|title| !(rule.reject)(title) && is_meaningful(title))
        .or_else(|| {
            if rule.url_fallback {
                title_from_url(url)
            } else {
                None
            }
        })?;

    Some(truncate_chars(
        &format!("{} {}", rule.kind.glyph(), found),
        MAX_TITLE_CHARS,
    ))
}

/// Last resort: a place or query name carried in the URL itself.
pub fn title_from_url(url: &Url) -> Option<String> {
    if let Some(mut segments) = url.path_segments() {
        if segments.any(|s| s == "place") {
            if let Some(slug) = segments.next().filter(|s| !s.is_empty()) {
                let name = percent_decode_str(&slug.replace('+', " "))
                    .decode_utf8_lossy()
                    .trim_end_matches([',', ' '])
                    .to_string();
                if let Some(title) = usable_title(&name) {
                    return Some(title);
                }
            }
        }
    }

    for key in ["q", "title"] {
        if let Some((_, value)) = url.query_pairs().find(|(k, _)| k == key) {
            if let Some(title) = usable_title(value.trim_end_matches([',', ' '])) {
                return Some(title);
            }
        }
    }
    None
}

/// Returns the `content` of the first `<meta>` whose `property` or `name`
/// equals `key` (case-insensitive).
pub fn meta_content(html: &str, key: &str) -> Option<String> {
    META_TAG.find_iter(html).find_map(|tag| {
        let mut is_key = false;
        let mut content = None;
        for caps in ATTRIBUTE.captures_iter(tag.as_str()) {
            let name = caps[1].to_ascii_lowercase();
            let value = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str());
            match (name.as_str(), value) {
                ("property" | "name", Some(v)) if v.eq_ignore_ascii_case(key) => is_key = true,
                ("content", Some(v)) => content = Some(v.to_string()),
                _ => {}
            }
        }
        if is_key {
            content
        } else {
            None
        }
    })
}
