//! Integration tests for draft export (strap-renderer).
//!
//! Tests cover:
//! - PNG framing and scale clamping
//! - Guides present in the preview but never in export pixels
//! - Remote background inlining and the solid-fill fallback
//! - Stroke suppression at zero width

use std::sync::Arc;

use async_trait::async_trait;
use strap_core::{Background, BackgroundFit, Color, Draft};
use strap_renderer::image::{ImageFetcher, ResolvedBackground};
use strap_renderer::{
    BackgroundResolver, ExportCompositor, ExportConfig, FontLibrary, PixelSurface,
    PreviewRenderer, RenderError, RenderResult, Renderer, RendererConfig, Surface,
};
use usvg::fontdb;

/// Serves a fixed response for every URL.
struct FixedFetcher(Option<Vec<u8>>);

#[async_trait]
impl ImageFetcher for FixedFetcher {
    async fn fetch(&self, url: &str) -> RenderResult<Vec<u8>> {
        self.0
            .clone()
            .ok_or_else(|| RenderError::Resource(format!("{url} unreachable")))
    }
}

fn renderer() -> Arc<Renderer> {
    let fonts = Arc::new(FontLibrary::from_database(fontdb::Database::new()));
    Arc::new(Renderer::with_fonts(RendererConfig::default(), fonts).expect("renderer"))
}

fn compositor(fetched: Option<Vec<u8>>) -> ExportCompositor {
    ExportCompositor::new(
        renderer(),
        BackgroundResolver::new(Arc::new(FixedFetcher(fetched))),
        ExportConfig::default(),
    )
}

fn blank_draft() -> Draft {
    Draft {
        text: String::new(),
        ..Draft::default()
    }
}

fn red_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).expect("encode");
    buf.into_inner()
}

fn decode(bytes: &[u8]) -> image::RgbaImage {
    image::load_from_memory(bytes).expect("decode png").to_rgba8()
}

/// Pixels covering the top edge of the safe-area rectangle (y = 27).
fn guide_band(img: &image::RgbaImage) -> Vec<[u8; 4]> {
    let mut out = Vec::new();
    for y in 25..=29 {
        for x in 27..=60 {
            out.push(img.get_pixel(x, y).0);
        }
    }
    out
}

// ==========================================================================
// Framing
// ==========================================================================

#[tokio::test]
async fn test_export_png_dimensions() {
    let artifact = compositor(None)
        .export(&blank_draft(), 2)
        .await
        .expect("export");
    assert_eq!(&artifact.bytes[..4], &[0x89, 0x50, 0x4E, 0x47]);
    assert_eq!((artifact.width, artifact.height), (3200, 900));
    let img = decode(&artifact.bytes);
    assert_eq!(img.dimensions(), (3200, 900));
    assert!(artifact.file_name.starts_with("snapink-preview-"));
    assert!(artifact.file_name.ends_with("-2x.png"));
}

#[tokio::test]
async fn test_export_scale_clamped() {
    let artifact = compositor(None)
        .export(&blank_draft(), 0)
        .await
        .expect("export");
    assert_eq!(artifact.scale, 1);
    assert_eq!((artifact.width, artifact.height), (1600, 450));
    assert!(artifact.file_name.ends_with("-1x.png"));
}

#[test]
fn test_custom_file_name_parts() {
    let c = ExportCompositor::new(
        renderer(),
        BackgroundResolver::new(Arc::new(FixedFetcher(None))),
        ExportConfig {
            product: "strap".to_string(),
            context: "order".to_string(),
            ..ExportConfig::default()
        },
    );
    assert_eq!(c.file_name(42, 3), "strap-order-42-3x.png");
}

// ==========================================================================
// Guides
// ==========================================================================

#[tokio::test]
async fn test_guides_never_in_export() {
    let artifact = compositor(None)
        .export(&blank_draft(), 1)
        .await
        .expect("export");
    let img = decode(&artifact.bytes);
    assert!(guide_band(&img).iter().all(|p| *p == [0, 0, 0, 255]));
}

#[test]
fn test_guides_visible_in_preview() {
    let surface = PixelSurface::new(renderer(), 1600, 450);
    let mut preview = PreviewRenderer::new(Surface::Mounted(Box::new(surface.clone())));
    assert!(preview.guides());
    preview.redraw(&blank_draft()).expect("redraw");

    let png = surface.latest_png().expect("png").expect("frame");
    let img = decode(&png);
    assert!(guide_band(&img).iter().any(|p| p[0] > 0));
}

// ==========================================================================
// Backgrounds
// ==========================================================================

#[tokio::test]
async fn test_remote_background_is_inlined() {
    let draft = Draft {
        background_ref: Background::Image("https://cdn.example.com/strap.png".to_string()),
        background_fit: BackgroundFit::Cover,
        ..blank_draft()
    };
    let artifact = compositor(Some(red_png()))
        .export(&draft, 1)
        .await
        .expect("export");
    let img = decode(&artifact.bytes);
    assert_eq!(img.get_pixel(800, 225).0, [255, 0, 0, 255]);
}

#[tokio::test]
async fn test_unreachable_background_falls_back_to_fill() {
    let draft = Draft {
        background_ref: Background::Image("https://cdn.example.com/missing.png".to_string()),
        ..blank_draft()
    };
    let artifact = compositor(None)
        .export(&draft, 1)
        .await
        .expect("export still succeeds");
    let img = decode(&artifact.bytes);
    assert_eq!(img.get_pixel(800, 225).0, [0, 0, 0, 255]);
    assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);
}

#[tokio::test]
async fn test_solid_background_color() {
    let draft = Draft {
        background_ref: Background::Color(Color::rgb(12, 34, 56)),
        ..blank_draft()
    };
    let artifact = compositor(None)
        .export(&draft, 1)
        .await
        .expect("export");
    let img = decode(&artifact.bytes);
    assert_eq!(img.get_pixel(1599, 449).0, [12, 34, 56, 255]);
}

// ==========================================================================
// Text paint
// ==========================================================================

#[test]
fn test_zero_stroke_width_emits_no_stroke() {
    let c = compositor(None);
    let draft = Draft {
        stroke: Color::rgb(0, 255, 0),
        stroke_width: 0.0,
        ..Draft::default()
    };
    let svg = c.render_svg(&draft, &ResolvedBackground::solid(Color::BLACK), 1);
    assert!(svg.contains("stroke=\"none\""));
    assert!(!svg.contains("#00FF00"));
    assert!(!svg.contains("stroke-width"));
}
