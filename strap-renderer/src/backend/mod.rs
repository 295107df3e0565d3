//! Rendering backend implementations.

pub mod canvas;
pub mod vector;

use strap_core::{Draft, LayoutResult};
use tiny_skia::Pixmap;

use crate::image::ResolvedBackground;
use crate::{BackendType, RenderResult};

/// Everything a backend needs to draw one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameSpec<'a> {
    /// Draft being drawn.
    pub draft: &'a Draft,
    /// Layout derived from the draft.
    pub layout: &'a LayoutResult,
    /// Background, already resolved.
    pub background: &'a ResolvedBackground,
    /// Include the guides layer.
    pub guides: bool,
}

/// Trait for rendering backends.
pub trait RenderBackend: Send + Sync {
    /// Get the backend type.
    fn backend_type(&self) -> BackendType;

    /// Render a frame to a `width` × `height` pixmap.
    ///
    /// The logical canvas is stretched to the output size.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&self, frame: &FrameSpec<'_>, width: u32, height: u32) -> RenderResult<Pixmap>;
}
