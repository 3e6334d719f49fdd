//! Title cleaning and validation for titles scraped out of HTML.

use super::classify::{truncate_chars, MAX_TITLE_CHARS};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Scraped titles longer than this are treated as junk, not truncated.
const MAX_RAW_TITLE_CHARS: usize = 200;

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[a-zA-Z]{2,8});").unwrap());

static SURROGATE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\u([dD][89abAB][0-9a-fA-F]{2})\\u([dD][c-fC-F][0-9a-fA-F]{2})").unwrap()
});

static UNICODE_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\u([0-9a-fA-F]{4})").unwrap());

static JSON_ESCAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\\(["\\/])"#).unwrap());

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static SITE_SUFFIXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\s*[-|·–—]\s*YouTube\s*$",
        r"(?i)\s*[-|·–—]\s*Google\s*(?:Maps|地圖)\s*$",
        r"(?i)\s*[-|·–—]\s*Facebook\s*$",
        r"(?i)\s*[-|·–—]\s*Instagram\s*$",
        r"(?i)\s*[-|·–—]\s*LinkedIn\s*$",
        r"(?i)\s*[/|]\s*(?:Twitter|X)\s*$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Lowercased titles that say nothing about the page.
const GENERIC_TITLES: &[&str] = &[
    "google",
    "google maps",
    "maps",
    "youtube",
    "facebook",
    "instagram",
    "twitter",
    "x",
    "tiktok",
    "linkedin",
    "home",
    "homepage",
    "index",
    "404",
    "error",
    "untitled",
    "loading",
    "loading...",
    "not found",
    "page not found",
    "access denied",
    "just a moment...",
];

pub fn decode_html_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    Some(match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '–',
        "mdash" => '—',
        "middot" => '·',
        "hellip" => '…',
        "laquo" => '«',
        "raquo" => '»',
        "copy" => '©',
        "reg" => '®',
        _ => return None,
    })
}

/// Decodes `\uXXXX` escapes as found in inline JSON, including surrogate pairs.
/// Lone surrogates are left as written.
pub fn decode_unicode_escapes(text: &str) -> String {
    let paired = SURROGATE_PAIR.replace_all(text, |caps: &Captures| {
        let high = u32::from_str_radix(&caps[1], 16).unwrap_or(0);
        let low = u32::from_str_radix(&caps[2], 16).unwrap_or(0);
        let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        char::from_u32(code)
            .map(|c| c.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });
    UNICODE_ESCAPE
        .replace_all(&paired, |caps: &Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn decode_json_escapes(text: &str) -> String {
    JSON_ESCAPE.replace_all(text, "$1").into_owned()
}

pub fn strip_site_suffix(title: &str) -> String {
    let mut title = title.to_string();
    for suffix in SITE_SUFFIXES.iter() {
        let stripped = suffix.replace(&title, "");
        if stripped.len() != title.len() && !stripped.trim().is_empty() {
            title = stripped.into_owned();
            break;
        }
    }
    title
}

/// Turns a raw capture into display text: tags dropped, entities and escapes
/// decoded, whitespace collapsed, site suffix removed.
pub fn clean_title(raw: &str) -> String {
    let text = TAG.replace_all(raw, " ");
    let text = decode_unicode_escapes(&text);
    let text = decode_json_escapes(&text);
    let text = decode_html_entities(&text);
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    strip_site_suffix(&text).trim().to_string()
}

/// Whether a cleaned title is worth showing.
pub fn is_meaningful(title: &str) -> bool {
    let trimmed = title.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_RAW_TITLE_CHARS {
        return false;
    }
    if !trimmed.chars().any(char::is_alphanumeric) {
        return false;
    }
    if trimmed.chars().filter(|c| !c.is_whitespace()).all(|c| c.is_ascii_digit()) {
        return false;
    }
    let lower = trimmed.to_lowercase();
    !GENERIC_TITLES.contains(&lower.as_str())
}

/// Cleans, validates and caps a raw capture in one go.
pub fn usable_title(raw: &str) -> Option<String> {
    let cleaned = clean_title(raw);
    is_meaningful(&cleaned).then(|| truncate_chars(&cleaned, MAX_TITLE_CHARS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_entities() {
        assert_eq!(
            decode_html_entities("Tom &amp; Jerry &#39;s &#x4E2D; &lt;b&gt; &bogus;"),
            "Tom & Jerry 's 中 <b> &bogus;"
        );
    }

    #[test]
    fn entities_are_decoded_once() {
        assert_eq!(decode_html_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn decodes_unicode_escapes_and_pairs() {
        assert_eq!(decode_unicode_escapes(r"caf\u00e9 \ud83c\udf89"), "café 🎉");
        assert_eq!(decode_unicode_escapes(r"lone \ud83c"), r"lone \ud83c");
    }

    #[test]
    fn clean_collapses_whitespace_and_strips_suffix() {
        assert_eq!(clean_title("  My\n\tVideo   - YouTube "), "My Video");
        assert_eq!(clean_title("Taipei 101 - Google Maps"), "Taipei 101");
        assert_eq!(clean_title("Some Page | Facebook"), "Some Page");
        assert_eq!(clean_title("<b>Bold</b> heading"), "Bold heading");
    }

    #[test]
    fn suffix_alone_is_kept() {
        assert_eq!(clean_title("YouTube"), "YouTube");
    }

    #[test]
    fn rejects_useless_titles() {
        assert!(!is_meaningful(""));
        assert!(!is_meaningful("   "));
        assert!(!is_meaningful("--- | ---"));
        assert!(!is_meaningful("12345"));
        assert!(!is_meaningful("YouTube"));
        assert!(!is_meaningful("Home"));
        assert!(!is_meaningful("404"));
        assert!(!is_meaningful(&"a".repeat(201)));
        assert!(is_meaningful("Rust 2024 Edition"));
    }

    #[test]
    fn usable_title_caps_length() {
        let title = usable_title(&"word ".repeat(30)).unwrap();
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
    }
}
