//! Live preview.
//!
//! Every draft change redraws synchronously: layout, SVG markup, then the
//! mounted surface presents the frame. Without a surface, redraws do nothing.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;
use strap_core::{
    compute_layout, Background, BackgroundFit, Draft, LayoutResult, CANVAS_HEIGHT, CANVAS_WIDTH,
};
use tiny_skia::Pixmap;

use crate::backend::FrameSpec;
use crate::image::{BackgroundResolver, ResolvedBackground};
use crate::svg::{build_svg, SvgOptions};
use crate::{RenderError, RenderResult, Renderer};

/// One presented preview frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewFrame {
    /// Monotonic redraw counter.
    pub revision: u64,
    /// SVG markup of the frame.
    pub markup: String,
    /// Layout the frame was drawn from.
    pub layout: LayoutResult,
    /// Whether the longest line exceeds the auto-fit estimate.
    pub over_capacity: bool,
    /// Whether guides were drawn.
    pub guides: bool,
}

/// Something a preview frame can be shown on.
pub trait PreviewSurface: Send {
    /// Present a frame. `scene` carries the inputs for surfaces that rasterize.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot show the frame.
    fn present(&mut self, frame: &PreviewFrame, scene: &FrameSpec<'_>) -> RenderResult<()>;
}

/// An optional drawing surface.
pub enum Surface {
    /// A live surface.
    Mounted(Box<dyn PreviewSurface>),
    /// Nothing to draw on.
    Unmounted,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mounted(_) => f.write_str("Mounted"),
            Self::Unmounted => f.write_str("Unmounted"),
        }
    }
}

/// Redraws a draft onto its surface.
#[derive(Debug)]
pub struct PreviewRenderer {
    surface: Surface,
    guides: bool,
    revision: u64,
    background: Option<(Background, BackgroundFit, ResolvedBackground)>,
}

impl Default for PreviewRenderer {
    fn default() -> Self {
        Self::new(Surface::Unmounted)
    }
}

impl PreviewRenderer {
    /// Create a preview over `surface`, with guides on.
    #[must_use]
    pub fn new(surface: Surface) -> Self {
        Self {
            surface,
            guides: true,
            revision: 0,
            background: None,
        }
    }

    /// Attach a surface, replacing any previous one.
    pub fn mount(&mut self, surface: Box<dyn PreviewSurface>) {
        self.surface = Surface::Mounted(surface);
        tracing::debug!("Preview surface mounted");
    }

    /// Detach the surface.
    pub fn unmount(&mut self) {
        self.surface = Surface::Unmounted;
        tracing::debug!("Preview surface unmounted");
    }

    /// Whether a surface is attached.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        matches!(self.surface, Surface::Mounted(_))
    }

    /// Show or hide the guides layer on subsequent redraws.
    pub fn set_guides(&mut self, on: bool) {
        self.guides = on;
    }

    /// Whether guides are drawn.
    #[must_use]
    pub fn guides(&self) -> bool {
        self.guides
    }

    /// Number of frames presented.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Redraw `draft`.
    ///
    /// Returns `Ok(None)` without drawing when no surface is mounted.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface fails to present the frame.
    pub fn redraw(&mut self, draft: &Draft) -> RenderResult<Option<PreviewFrame>> {
        if !self.is_mounted() {
            tracing::trace!("Preview redraw skipped: no surface");
            return Ok(None);
        }

        let layout = compute_layout(draft, CANVAS_WIDTH, CANVAS_HEIGHT);
        let background = self.background_for(draft);
        let options = SvgOptions::for_layout(&layout).with_guides(self.guides);
        let markup = build_svg(draft, &layout, &background, &options);

        self.revision += 1;
        let frame = PreviewFrame {
            revision: self.revision,
            markup,
            over_capacity: layout.over_capacity(),
            layout,
            guides: self.guides,
        };
        let scene = FrameSpec {
            draft,
            layout: &frame.layout,
            background: &background,
            guides: self.guides,
        };

        if let Surface::Mounted(surface) = &mut self.surface {
            surface.present(&frame, &scene)?;
        }
        tracing::debug!(
            revision = frame.revision,
            over_capacity = frame.over_capacity,
            "Preview redrawn"
        );
        Ok(Some(frame))
    }

    /// Locally resolved background, cached until the draft's background changes.
    fn background_for(&mut self, draft: &Draft) -> ResolvedBackground {
        if let Some((bg, fit, resolved)) = &self.background {
            if *bg == draft.background_ref && *fit == draft.background_fit {
                return resolved.clone();
            }
        }
        let resolved =
            BackgroundResolver::resolve_local(&draft.background_ref, draft.background_fit);
        self.background = Some((
            draft.background_ref.clone(),
            draft.background_fit,
            resolved.clone(),
        ));
        resolved
    }
}

/// Keeps the latest frame for a host that renders SVG itself.
///
/// Clones share the same slot, so keep one before mounting.
#[derive(Debug, Clone, Default)]
pub struct MarkupSurface {
    latest: Arc<RwLock<Option<PreviewFrame>>>,
}

impl MarkupSurface {
    /// Create an empty surface.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest presented frame.
    #[must_use]
    pub fn latest(&self) -> Option<PreviewFrame> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Markup of the latest frame.
    #[must_use]
    pub fn markup(&self) -> Option<String> {
        self.latest().map(|f| f.markup)
    }
}

impl PreviewSurface for MarkupSurface {
    fn present(&mut self, frame: &PreviewFrame, _scene: &FrameSpec<'_>) -> RenderResult<()> {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(frame.clone());
        Ok(())
    }
}

/// Rasterizes each frame at a fixed display size.
///
/// Clones share the same pixel slot.
#[derive(Clone)]
pub struct PixelSurface {
    renderer: Arc<Renderer>,
    width: u32,
    height: u32,
    latest: Arc<Mutex<Option<Pixmap>>>,
}

impl std::fmt::Debug for PixelSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelSurface")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl PixelSurface {
    /// Create a surface of `width` × `height` display pixels.
    #[must_use]
    pub fn new(renderer: Arc<Renderer>, width: u32, height: u32) -> Self {
        Self {
            renderer,
            width: width.max(1),
            height: height.max(1),
            latest: Arc::new(Mutex::new(None)),
        }
    }

    /// Display size.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Latest frame's pixels.
    #[must_use]
    pub fn latest(&self) -> Option<Pixmap> {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Latest frame encoded as PNG.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn latest_png(&self) -> RenderResult<Option<Vec<u8>>> {
        self.latest()
            .map(|p| {
                p.encode_png()
                    .map_err(|e| RenderError::Surface(format!("PNG encoding failed: {e}")))
            })
            .transpose()
    }
}

impl PreviewSurface for PixelSurface {
    fn present(&mut self, _frame: &PreviewFrame, scene: &FrameSpec<'_>) -> RenderResult<()> {
        let pixmap = self.renderer.render(scene, self.width, self.height)?;
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(pixmap);
        Ok(())
    }
}
