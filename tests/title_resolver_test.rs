//! Title resolution against a local HTTP server.
//!
//! Covers the network path end to end: metadata precedence, error and
//! timeout fallbacks, redirect handling and the body size cap.

mod common;

use common::{local_resolver_config, serve, Reply};
use qr_snap_lib::config::ResolverConfig;
use qr_snap_lib::TitleResolver;
use std::time::Duration;

fn resolver(config: ResolverConfig) -> TitleResolver {
    TitleResolver::new(&config).unwrap()
}

// ── Metadata ────────────────────────────────────────────────────────

#[tokio::test]
async fn og_title_beats_title_tag() {
    let base = serve(|_, _| {
        Reply::html(
            r#"<html><head>
                <title>Fallback Title</title>
                <meta property="og:title" content="Example Page">
            </head><body></body></html>"#,
        )
    })
    .await;

    let title = resolver(local_resolver_config()).resolve(&format!("{}/page", base)).await;
    assert_eq!(title, "Example Page");
}

#[tokio::test]
async fn title_tag_entities_are_decoded() {
    let base = serve(|_, _| Reply::html("<html><head><title>Fish &amp; Chips</title></head></html>")).await;

    let title = resolver(local_resolver_config()).resolve(&format!("{}/", base)).await;
    assert_eq!(title, "Fish & Chips");
}

#[tokio::test]
async fn generic_title_falls_back_to_hostname() {
    let base = serve(|_, _| Reply::html("<html><head><title>Home</title></head></html>")).await;

    let title = resolver(local_resolver_config()).resolve(&format!("{}/", base)).await;
    assert_eq!(title, "127.0.0.1");
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn not_found_falls_back_to_hostname() {
    let base = serve(|_, _| Reply::status(404)).await;

    let title = resolver(local_resolver_config()).resolve(&format!("{}/missing", base)).await;
    assert_eq!(title, "127.0.0.1");
}

#[tokio::test]
async fn unresponsive_server_times_out_to_hostname() {
    let base = serve(|_, _| Reply::Hang).await;
    let config = ResolverConfig {
        request_timeout: Duration::from_millis(200),
        ..local_resolver_config()
    };

    let start = std::time::Instant::now();
    let title = resolver(config).resolve(&format!("{}/slow", base)).await;
    assert_eq!(title, "127.0.0.1");
    // One timed-out HEAD plus one timed-out GET.
    assert!(start.elapsed() < Duration::from_secs(5), "took {:?}", start.elapsed());
}

#[tokio::test]
async fn connection_refused_falls_back_to_hostname() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let title = resolver(local_resolver_config()).resolve(&format!("http://{}/", addr)).await;
    assert_eq!(title, "127.0.0.1");
}

// ── Redirects ───────────────────────────────────────────────────────

fn hop_number(path: &str) -> Option<u32> {
    path.strip_prefix("/hop/")?.parse().ok()
}

#[tokio::test]
async fn redirect_chain_is_capped_at_five_hops() {
    let base = serve(|method, path| {
        let n = hop_number(path).unwrap_or(0);
        if method == "HEAD" {
            Reply::redirect(format!("/hop/{}", n + 1))
        } else {
            Reply::html(format!("<html><head><title>Hop {}</title></head></html>", n))
        }
    })
    .await;

    let title = resolver(local_resolver_config()).resolve(&format!("{}/hop/0", base)).await;
    assert_eq!(title, "Hop 5");
}

#[tokio::test]
async fn self_redirect_stops_the_walk() {
    let base = serve(|method, path| {
        if method == "HEAD" {
            Reply::redirect(path.to_string())
        } else {
            Reply::html("<html><head><title>Loop Landing</title></head></html>")
        }
    })
    .await;

    let title = resolver(local_resolver_config()).resolve(&format!("{}/loop", base)).await;
    assert_eq!(title, "Loop Landing");
}

#[tokio::test]
async fn relative_location_resolves_against_current_url() {
    let base = serve(|method, path| match (method, path) {
        ("HEAD", "/short/abc") => Reply::redirect("../articles/final"),
        (_, "/articles/final") => {
            Reply::html("<html><head><title>Final Article</title></head></html>")
        }
        ("HEAD", _) => Reply::status(200),
        _ => Reply::status(404),
    })
    .await;

    let title = resolver(local_resolver_config()).resolve(&format!("{}/short/abc", base)).await;
    assert_eq!(title, "Final Article");
}

// ── Size cap ────────────────────────────────────────────────────────

#[tokio::test]
async fn oversized_body_is_cut_and_still_parsed() {
    let base = serve(|_, _| {
        let mut body = String::from("<html><head><title>Partial Page</title>");
        body.push_str(&"x".repeat(10_000));
        body.push_str("</head></html>");
        Reply::html(body)
    })
    .await;
    let config = ResolverConfig {
        max_content_length: 64,
        ..local_resolver_config()
    };

    let title = resolver(config).resolve(&format!("{}/big", base)).await;
    assert_eq!(title, "Partial Page");
}

#[tokio::test]
async fn long_titles_are_capped_at_one_hundred_chars() {
    let long = "Word ".repeat(40);
    let base = serve(move |_, _| {
        Reply::html(format!("<html><head><title>{}</title></head></html>", long))
    })
    .await;

    let title = resolver(local_resolver_config()).resolve(&format!("{}/", base)).await;
    assert!(title.chars().count() <= 100);
    assert!(title.starts_with("Word Word"));
}
