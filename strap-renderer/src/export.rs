//! Export compositor.
//!
//! Produces a PNG mockup of a draft at an integer multiple of the logical
//! canvas. Guides are never part of an export.

use std::sync::Arc;

use strap_core::limits::clamp_export_scale;
use strap_core::{compute_layout, Draft, CANVAS_HEIGHT, CANVAS_WIDTH};

use crate::backend::FrameSpec;
use crate::image::{BackgroundResolver, ResolvedBackground};
use crate::svg::{build_svg, SvgOptions};
use crate::{RenderError, RenderResult, Renderer};

/// Configuration for exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Product slug, first part of the file name.
    pub product: String,
    /// Context slug, second part of the file name.
    pub context: String,
    /// Scale used when none is requested.
    pub default_scale: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            product: "snapink".to_string(),
            context: "preview".to_string(),
            default_scale: 2,
        }
    }
}

/// An encoded export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested download name.
    pub file_name: String,
    /// PNG bytes.
    pub bytes: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Scale the export was rendered at.
    pub scale: u32,
}

/// Renders drafts to PNG.
#[derive(Debug, Clone)]
pub struct ExportCompositor {
    renderer: Arc<Renderer>,
    resolver: BackgroundResolver,
    config: ExportConfig,
}

impl ExportCompositor {
    /// Create a compositor.
    #[must_use]
    pub fn new(renderer: Arc<Renderer>, resolver: BackgroundResolver, config: ExportConfig) -> Self {
        Self {
            renderer,
            resolver,
            config,
        }
    }

    /// Get the export configuration.
    #[must_use]
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// The renderer exports are drawn with.
    #[must_use]
    pub fn renderer(&self) -> &Arc<Renderer> {
        &self.renderer
    }

    /// Export a snapshot of `draft` at `scale` (clamped to 1..=4).
    ///
    /// Remote backgrounds are inlined first; one that cannot be fetched leaves
    /// the solid fill showing.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or PNG encoding fails.
    pub async fn export(&self, draft: &Draft, scale: u32) -> RenderResult<ExportArtifact> {
        let (snapshot, background) = self.prepare(draft).await;
        self.export_resolved(
            &snapshot,
            &background,
            scale,
            chrono::Utc::now().timestamp_millis(),
        )
    }

    /// Normalize a snapshot of `draft` and resolve its background, inlining
    /// remote images. The result feeds [`Self::export_resolved`].
    pub async fn prepare(&self, draft: &Draft) -> (Draft, ResolvedBackground) {
        let snapshot = draft.clone().normalized();
        let background = self
            .resolver
            .resolve(&snapshot.background_ref, snapshot.background_fit)
            .await;
        (snapshot, background)
    }

    /// Export with an already resolved background and a fixed timestamp.
    ///
    /// Rasterizing and encoding are CPU bound; async callers should run this
    /// on a blocking thread.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or PNG encoding fails.
    pub fn export_resolved(
        &self,
        draft: &Draft,
        background: &ResolvedBackground,
        scale: u32,
        timestamp_ms: i64,
    ) -> RenderResult<ExportArtifact> {
        let scale = clamp_export_scale(scale);
        let (width, height) = output_size(scale);
        let layout = compute_layout(draft, CANVAS_WIDTH, CANVAS_HEIGHT);
        let frame = FrameSpec {
            draft,
            layout: &layout,
            background,
            guides: false,
        };

        let pixmap = self.renderer.render(&frame, width, height)?;
        let bytes = pixmap
            .encode_png()
            .map_err(|e| RenderError::Export(format!("PNG encoding failed: {e}")))?;

        let file_name = self.file_name(timestamp_ms, scale);
        tracing::info!(
            file_name = %file_name,
            width,
            height,
            bytes = bytes.len(),
            backend = self.renderer.active_backend().as_str(),
            "Export rendered"
        );
        Ok(ExportArtifact {
            file_name,
            bytes,
            width,
            height,
            scale,
        })
    }

    /// `<product>-<context>-<timestamp_ms>-<scale>x.png`
    #[must_use]
    pub fn file_name(&self, timestamp_ms: i64, scale: u32) -> String {
        format!(
            "{}-{}-{timestamp_ms}-{}x.png",
            self.config.product,
            self.config.context,
            clamp_export_scale(scale)
        )
    }

    /// The export as SVG markup, without guides.
    #[must_use]
    pub fn render_svg(&self, draft: &Draft, background: &ResolvedBackground, scale: u32) -> String {
        let layout = compute_layout(draft, CANVAS_WIDTH, CANVAS_HEIGHT);
        let options = SvgOptions::for_layout(&layout).scaled(clamp_export_scale(scale));
        build_svg(draft, &layout, background, &options)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn output_size(scale: u32) -> (u32, u32) {
    (
        CANVAS_WIDTH as u32 * scale,
        CANVAS_HEIGHT as u32 * scale,
    )
}
