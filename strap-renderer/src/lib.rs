//! # Strap Renderer
//!
//! Preview and export rendering for strap drafts.
//!
//! ## Rendering Backends
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            RenderBackend Trait              │
//! ├──────────────────────┬──────────────────────┤
//! │ Vector               │ Canvas               │
//! │ (SVG + resvg,        │ (tiny-skia layers,   │
//! │  native text layout) │  glyph-by-glyph)     │
//! └──────────────────────┴──────────────────────┘
//! ```
//!
//! Both backends draw the same [`strap_core::LayoutResult`] with the same
//! named effect stages, so a preview and an export of one draft agree.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod blur;
pub mod effects;
pub mod error;
pub mod export;
pub mod fonts;
pub mod image;
pub mod preview;
pub mod svg;

pub use backend::{FrameSpec, RenderBackend};
pub use effects::{effect_for, TextEffect};
pub use error::{RenderError, RenderResult};
pub use export::{ExportArtifact, ExportCompositor, ExportConfig};
pub use fonts::FontLibrary;
pub use image::{BackgroundResolver, FetchPolicy, HttpFetcher, ResolvedBackground};
pub use preview::{
    MarkupSurface, PixelSurface, PreviewFrame, PreviewRenderer, PreviewSurface, Surface,
};

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tiny_skia::Pixmap;

/// Configuration for the renderer.
#[derive(Debug, Clone, Default)]
pub struct RendererConfig {
    /// Preferred backend (will fall back if unavailable).
    pub preferred_backend: BackendType,
    /// Extra directories scanned for `.ttf`/`.otf`/`.ttc` files.
    pub font_dirs: Vec<PathBuf>,
}

/// Available rendering backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendType {
    /// SVG rasterized by resvg (always available).
    #[default]
    Vector,
    /// Software canvas with per-glyph placement (needs font faces).
    Canvas,
}

impl BackendType {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Canvas => "canvas",
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vector" | "svg" => Ok(Self::Vector),
            "canvas" | "software" => Ok(Self::Canvas),
            other => Err(RenderError::NoBackend(format!("unknown backend '{other}'"))),
        }
    }
}

/// The main renderer interface.
pub struct Renderer {
    config: RendererConfig,
    fonts: Arc<FontLibrary>,
    backend: Box<dyn RenderBackend>,
    frame_count: AtomicU64,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("backend", &self.backend.backend_type())
            .field("frame_count", &self.frame_count())
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Create a new renderer, loading system fonts plus `config.font_dirs`.
    ///
    /// # Errors
    ///
    /// Returns an error if no suitable backend is available.
    pub fn new(config: RendererConfig) -> RenderResult<Self> {
        let fonts = Arc::new(FontLibrary::with_font_dirs(&config.font_dirs));
        Self::with_fonts(config, fonts)
    }

    /// Create a renderer over an existing font library.
    ///
    /// # Errors
    ///
    /// Returns an error if no suitable backend is available.
    pub fn with_fonts(config: RendererConfig, fonts: Arc<FontLibrary>) -> RenderResult<Self> {
        let backend = Self::create_backend(config.preferred_backend, &fonts)?;
        tracing::debug!("Renderer using {} backend", backend.backend_type().as_str());

        Ok(Self {
            config,
            fonts,
            backend,
            frame_count: AtomicU64::new(0),
        })
    }

    /// Create the appropriate backend based on preference and availability.
    fn create_backend(
        preferred: BackendType,
        fonts: &Arc<FontLibrary>,
    ) -> RenderResult<Box<dyn RenderBackend>> {
        match preferred {
            BackendType::Canvas => match backend::canvas::CanvasBackend::new(Arc::clone(fonts)) {
                Ok(b) => Ok(Box::new(b)),
                Err(e) => {
                    tracing::warn!("Canvas backend unavailable, falling back: {}", e);
                    Self::create_backend(BackendType::Vector, fonts)
                }
            },
            BackendType::Vector => Ok(Box::new(backend::vector::VectorBackend::new(Arc::clone(
                fonts,
            )))),
        }
    }

    /// Render a frame at `width` × `height` pixels.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    pub fn render(&self, frame: &FrameSpec<'_>, width: u32, height: u32) -> RenderResult<Pixmap> {
        let pixmap = self.backend.render(frame, width, height)?;
        self.frame_count.fetch_add(1, Ordering::Relaxed);
        Ok(pixmap)
    }

    /// Get the number of frames rendered.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }

    /// Get the active backend type.
    #[must_use]
    pub fn active_backend(&self) -> BackendType {
        self.backend.backend_type()
    }

    /// Get the renderer configuration.
    #[must_use]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Font library shared by the backends.
    #[must_use]
    pub fn fonts(&self) -> &Arc<FontLibrary> {
        &self.fonts
    }
}

/// Strap renderer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
