//! Shared fixtures for integration tests: a throwaway HTTP server and a QR
//! code renderer.

#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use qr_snap_lib::config::ResolverConfig;
use qrcode::{Color, QrCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const BLACK: [u8; 4] = [0, 0, 0, 255];
pub const WHITE: [u8; 4] = [255, 255, 255, 255];

/// What the stub server sends back for one request.
pub enum Reply {
    Page {
        status: u16,
        headers: Vec<(&'static str, String)>,
        body: String,
    },
    /// Accept the connection and never answer.
    Hang,
}

impl Reply {
    pub fn html(body: impl Into<String>) -> Self {
        Reply::Page {
            status: 200,
            headers: vec![("Content-Type", "text/html; charset=utf-8".into())],
            body: body.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Reply::Page {
            status,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Reply::Page {
            status: 302,
            headers: vec![("Location", location.into())],
            body: String::new(),
        }
    }
}

/// Serves each connection with `route(method, path)`. One request per
/// connection; the socket closes after the reply.
///
/// Returns the base URL, e.g. `http://127.0.0.1:54321`.
pub async fn serve<F>(route: F) -> String
where
    F: Fn(&str, &str) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let route = Arc::new(route);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let route = Arc::clone(&route);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&request);
                let mut first = head.lines().next().unwrap_or_default().split_whitespace();
                let method = first.next().unwrap_or_default().to_string();
                let path = first.next().unwrap_or_default().to_string();

                match route(&method, &path) {
                    Reply::Hang => {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                    Reply::Page { status, headers, body } => {
                        let mut response = format!(
                            "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nConnection: close\r\n",
                            status,
                            body.len()
                        );
                        for (name, value) in headers {
                            response.push_str(&format!("{}: {}\r\n", name, value));
                        }
                        response.push_str("\r\n");
                        if method != "HEAD" {
                            response.push_str(&body);
                        }
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                }
            });
        }
    });

    format!("http://{}", addr)
}

/// Resolver settings that never go through a system proxy.
pub fn local_resolver_config() -> ResolverConfig {
    ResolverConfig {
        use_system_proxy: false,
        request_timeout: Duration::from_secs(5),
        ..ResolverConfig::default()
    }
}

/// Renders `payload` as a QR code, 6 px per module with a 4-module quiet zone.
pub fn render_qr(payload: &str) -> RgbaImage {
    let code = QrCode::new(payload.as_bytes()).unwrap();
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let (scale, quiet) = (6u32, 4u32);
    let side = (modules + quiet * 2) * scale;
    RgbaImage::from_fn(side, side, |x, y| {
        let (mx, my) = (x / scale, y / scale);
        if mx < quiet || my < quiet || mx >= modules + quiet || my >= modules + quiet {
            return Rgba(WHITE);
        }
        match colors[((my - quiet) * modules + (mx - quiet)) as usize] {
            Color::Dark => Rgba(BLACK),
            Color::Light => Rgba(WHITE),
        }
    })
}
