//! # Strap Customizer
//!
//! One customizer instance: the draft scene, its live preview and the export
//! compositor behind a narrow imperative handle.
//!
//! ## Usage
//!
//! ```no_run
//! use strap_app::{Customizer, CustomizerConfig};
//! use strap_core::{DraftField, DraftUpdate};
//! use strap_renderer::MarkupSurface;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut app = Customizer::new(CustomizerConfig::default())?;
//! let surface = MarkupSurface::new();
//! app.mount(Box::new(surface.clone()));
//!
//! app.apply(DraftUpdate::Text("RIDE OR DIE".to_string()));
//! app.apply_input(DraftField::Arc, "12");
//! println!("{}", surface.markup().unwrap_or_default());
//!
//! if let Some(job) = app.trigger_export() {
//!     let artifact = job.run().await?;
//!     std::fs::write(&artifact.file_name, &artifact.bytes)?;
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

use strap_core::limits::clamp_export_scale;
use strap_core::text::Casing;
use strap_core::{
    Draft, DraftField, DraftUpdate, LayoutResult, ListenerId, Nudge, OrderPayload, Scene,
    StrapError,
};
use strap_renderer::{
    BackgroundResolver, ExportArtifact, ExportCompositor, ExportConfig, FetchPolicy,
    PreviewFrame, PreviewRenderer, PreviewSurface, RenderError, RenderResult, Renderer,
    RendererConfig,
};
use thiserror::Error;

/// Result type for customizer operations.
pub type CustomizerResult<T> = Result<T, CustomizerError>;

/// Errors raised by the customizer handle.
#[derive(Debug, Error)]
pub enum CustomizerError {
    /// Rendering setup or drawing failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Draft input could not be read.
    #[error(transparent)]
    Draft(#[from] StrapError),
}

/// Configuration for a customizer instance.
#[derive(Debug, Clone)]
pub struct CustomizerConfig {
    /// Renderer setup shared by preview surfaces and exports.
    pub renderer: RendererConfig,
    /// Export naming.
    pub export: ExportConfig,
    /// Limits on fetching remote backgrounds.
    pub fetch: FetchPolicy,
    /// Draft to start from.
    pub initial: Draft,
    /// Show guides in the preview.
    pub guides: bool,
}

impl Default for CustomizerConfig {
    fn default() -> Self {
        Self {
            renderer: RendererConfig::default(),
            export: ExportConfig::default(),
            fetch: FetchPolicy::default(),
            initial: Draft::default(),
            guides: true,
        }
    }
}

/// A pending export, holding the draft as it was when triggered.
#[derive(Debug, Clone)]
pub struct ExportJob {
    compositor: Arc<ExportCompositor>,
    draft: Draft,
    scale: u32,
}

impl ExportJob {
    /// The draft snapshot being exported.
    #[must_use]
    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Export scale.
    #[must_use]
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Render the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or encoding fails.
    pub async fn run(self) -> RenderResult<ExportArtifact> {
        self.compositor.export(&self.draft, self.scale).await
    }
}

/// The customizer component instance.
#[derive(Debug)]
pub struct Customizer {
    scene: Scene,
    preview: PreviewRenderer,
    compositor: Arc<ExportCompositor>,
    export_scale: u32,
    last_frame: Option<PreviewFrame>,
}

impl Customizer {
    /// Create a customizer, loading fonts and an HTTP background fetcher.
    ///
    /// # Errors
    ///
    /// Returns an error if no rendering backend or HTTP client is available.
    pub fn new(config: CustomizerConfig) -> CustomizerResult<Self> {
        let renderer = Arc::new(Renderer::new(config.renderer.clone())?);
        let resolver = BackgroundResolver::http(config.fetch)?;
        Ok(Self::with_parts(config, renderer, resolver))
    }

    /// Create a customizer from an existing renderer and resolver.
    #[must_use]
    pub fn with_parts(
        config: CustomizerConfig,
        renderer: Arc<Renderer>,
        resolver: BackgroundResolver,
    ) -> Self {
        let default_scale = config.export.default_scale;
        let compositor = Arc::new(ExportCompositor::new(renderer, resolver, config.export));
        let mut preview = PreviewRenderer::default();
        preview.set_guides(config.guides);
        Self {
            scene: Scene::new(config.initial),
            preview,
            compositor,
            export_scale: clamp_export_scale(default_scale),
            last_frame: None,
        }
    }

    /// Attach a preview surface and draw the current draft on it.
    pub fn mount(&mut self, surface: Box<dyn PreviewSurface>) {
        self.preview.mount(surface);
        self.redraw();
    }

    /// Detach the preview surface.
    pub fn unmount(&mut self) {
        self.preview.unmount();
        self.last_frame = None;
    }

    /// Whether a preview surface is attached.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.preview.is_mounted()
    }

    /// Current draft.
    #[must_use]
    pub fn draft(&self) -> &Draft {
        self.scene.draft()
    }

    /// Current layout.
    #[must_use]
    pub fn layout(&self) -> LayoutResult {
        self.scene.layout()
    }

    /// Whether the text likely overflows the printable width.
    #[must_use]
    pub fn over_capacity(&self) -> bool {
        self.scene.over_capacity()
    }

    /// Latest presented preview frame.
    #[must_use]
    pub fn last_frame(&self) -> Option<&PreviewFrame> {
        self.last_frame.as_ref()
    }

    /// Apply an update and redraw if the draft changed.
    pub fn apply(&mut self, update: DraftUpdate) -> bool {
        let changed = self.scene.apply(update);
        self.redraw_if(changed)
    }

    /// Apply raw form input; input that cannot be coerced is ignored.
    pub fn apply_input(&mut self, field: DraftField, raw: &str) -> bool {
        let changed = self.scene.apply_input(field, raw);
        self.redraw_if(changed)
    }

    /// Change the text casing mode.
    pub fn set_casing(&mut self, casing: Casing) -> bool {
        let changed = self.scene.set_casing(casing);
        self.redraw_if(changed)
    }

    /// Arrow-key nudge.
    pub fn nudge(&mut self, nudge: Nudge) -> bool {
        let changed = self.scene.nudge(nudge);
        self.redraw_if(changed)
    }

    /// Reset the text anchor to the canvas center.
    pub fn center_text(&mut self) -> bool {
        let changed = self.scene.center_text();
        self.redraw_if(changed)
    }

    /// Toggle the preview guides.
    pub fn set_guides(&mut self, on: bool) {
        if self.preview.guides() != on {
            self.preview.set_guides(on);
            self.redraw();
        }
    }

    /// Subscribe to draft changes.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Draft) + Send + 'static,
    {
        self.scene.subscribe(listener)
    }

    /// Remove a listener.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.scene.unsubscribe(id)
    }

    /// Draft as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn draft_json(&self) -> CustomizerResult<String> {
        Ok(self.scene.draft().to_json()?)
    }

    /// Rehydrate from draft JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a draft.
    pub fn set_draft_json(&mut self, json: &str) -> CustomizerResult<bool> {
        let draft = Draft::from_json(json)?;
        let changed = self.scene.replace(draft);
        Ok(self.redraw_if(changed))
    }

    /// Set the export scale (clamped to 1..=4).
    pub fn set_export_scale(&mut self, scale: u32) {
        self.export_scale = clamp_export_scale(scale);
    }

    /// Export scale.
    #[must_use]
    pub fn export_scale(&self) -> u32 {
        self.export_scale
    }

    /// Snapshot the draft for export.
    ///
    /// Returns `None` when no preview surface is mounted. The job holds its
    /// own copy of the draft, so later edits do not affect it.
    #[must_use]
    pub fn trigger_export(&self) -> Option<ExportJob> {
        if !self.preview.is_mounted() {
            tracing::debug!("Export ignored: preview not mounted");
            return None;
        }
        Some(ExportJob {
            compositor: Arc::clone(&self.compositor),
            draft: self.scene.draft().clone(),
            scale: self.export_scale,
        })
    }

    /// Snapshot the draft into an order payload.
    #[must_use]
    pub fn snapshot_order(&self, customer_name: &str, customer_email: &str) -> OrderPayload {
        self.scene.snapshot_order(customer_name, customer_email)
    }

    /// Frames rendered by the shared renderer.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.compositor.renderer().frame_count()
    }

    fn redraw_if(&mut self, changed: bool) -> bool {
        if changed {
            self.redraw();
        }
        changed
    }

    fn redraw(&mut self) {
        match self.preview.redraw(self.scene.draft()) {
            Ok(Some(frame)) => self.last_frame = Some(frame),
            Ok(None) => {}
            Err(e) => tracing::warn!("Preview redraw failed: {}", e),
        }
    }
}
