//! Integration tests for remote background fetching (strap-renderer).
//!
//! Tests cover:
//! - Loopback targets refused unless private hosts are allowed
//! - Oversized bodies abandoned at the byte limit
//! - Slow responses cut off by the fetch timeout
//! - An allowed fetch inlining into the export

use std::time::{Duration, Instant};

use strap_core::{Background, BackgroundFit};
use strap_renderer::image::ImageFetcher;
use strap_renderer::{BackgroundResolver, FetchPolicy, HttpFetcher, RenderError};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn local_policy() -> FetchPolicy {
    FetchPolicy {
        allow_private_hosts: true,
        ..FetchPolicy::default()
    }
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 2, image::Rgba([0, 200, 0, 255]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode");
    buf.into_inner()
}

#[tokio::test]
async fn test_loopback_refused_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(FetchPolicy::default()).expect("fetcher");
    let err = fetcher
        .fetch(&format!("{}/bg.png", server.uri()))
        .await
        .expect_err("loopback must be refused");
    assert!(matches!(err, RenderError::Resource(ref m) if m.contains("not a public address")));

    server.verify().await;
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/huge.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64 * 1024]))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(FetchPolicy {
        max_bytes: 1024,
        ..local_policy()
    })
    .expect("fetcher");
    let err = fetcher
        .fetch(&format!("{}/huge.png", server.uri()))
        .await
        .expect_err("body over the limit");
    assert!(matches!(err, RenderError::Resource(ref m) if m.contains("1024 byte limit")));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(png_bytes())
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(FetchPolicy {
        timeout: Duration::from_millis(300),
        ..local_policy()
    })
    .expect("fetcher");
    let started = Instant::now();
    let result = fetcher.fetch(&format!("{}/slow.png", server.uri())).await;
    assert!(result.is_err());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_allowed_fetch_inlines_background() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bg.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(png_bytes()))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = BackgroundResolver::http(local_policy()).expect("resolver");
    let bg = Background::Image(format!("{}/bg.png", server.uri()));
    let resolved = resolver.resolve(&bg, BackgroundFit::Cover).await;
    let image = resolved.image.expect("image");
    assert!(image.is_inlined());
    assert_eq!(image.decoded.expect("decoded").width, 4);

    server.verify().await;
}

#[tokio::test]
async fn test_refused_fetch_falls_back_to_solid_fill() {
    let resolver = BackgroundResolver::http(FetchPolicy::default()).expect("resolver");
    let bg = Background::Image("http://169.254.169.254/latest/meta-data".to_string());
    let resolved = resolver.resolve(&bg, BackgroundFit::Cover).await;
    let image = resolved.image.expect("image");
    assert!(!image.is_inlined());
    assert!(image.decoded.is_none());
}
