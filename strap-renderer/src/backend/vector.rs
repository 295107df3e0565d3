//! Vector backend: the SVG scene rasterized by resvg.
//!
//! Text layout, text-on-path and the effect filter chains are handled natively
//! by usvg.

use std::sync::Arc;

use tiny_skia::Pixmap;

use super::{FrameSpec, RenderBackend};
use crate::fonts::FontLibrary;
use crate::svg::{build_svg, SvgOptions};
use crate::{BackendType, RenderError, RenderResult};

/// SVG-native backend.
#[derive(Debug, Clone)]
pub struct VectorBackend {
    fonts: Arc<FontLibrary>,
}

impl VectorBackend {
    /// Create a backend resolving text against `fonts`.
    #[must_use]
    pub fn new(fonts: Arc<FontLibrary>) -> Self {
        Self { fonts }
    }

    /// Rasterize an SVG document.
    ///
    /// # Errors
    ///
    /// Returns an error if the SVG cannot be parsed or the pixmap allocated.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rasterize(&self, svg: &str) -> RenderResult<Pixmap> {
        let opt = self.fonts.usvg_options();
        let tree = usvg::Tree::from_str(svg, &opt)
            .map_err(|e| RenderError::Frame(format!("SVG parsing failed: {e}")))?;

        let px_w = tree.size().width().round() as u32;
        let px_h = tree.size().height().round() as u32;

        let mut pixmap = Pixmap::new(px_w.max(1), px_h.max(1))
            .ok_or_else(|| RenderError::Frame("Failed to create pixmap".to_string()))?;

        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        Ok(pixmap)
    }
}

impl RenderBackend for VectorBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Vector
    }

    fn render(&self, frame: &FrameSpec<'_>, width: u32, height: u32) -> RenderResult<Pixmap> {
        let options = SvgOptions {
            width,
            height,
            guides: frame.guides,
        };
        let svg = build_svg(frame.draft, frame.layout, frame.background, &options);
        tracing::trace!("Rasterizing {} byte SVG at {}x{}", svg.len(), width, height);
        self.rasterize(&svg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ResolvedBackground;
    use strap_core::{compute_layout, Color, Draft, CANVAS_HEIGHT, CANVAS_WIDTH};
    use usvg::fontdb;

    fn backend() -> VectorBackend {
        VectorBackend::new(Arc::new(FontLibrary::from_database(fontdb::Database::new())))
    }

    fn pixel(p: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * p.width() + x) * 4) as usize;
        let d = p.data();
        [d[i], d[i + 1], d[i + 2], d[i + 3]]
    }

    #[test]
    fn test_background_fill_at_scale() {
        let draft = Draft {
            text: String::new(),
            ..Draft::default()
        };
        let layout = compute_layout(&draft, CANVAS_WIDTH, CANVAS_HEIGHT);
        let bg = ResolvedBackground::solid(Color::rgb(10, 20, 30));
        let frame = FrameSpec {
            draft: &draft,
            layout: &layout,
            background: &bg,
            guides: false,
        };
        let pixmap = backend().render(&frame, 3200, 900).expect("render");
        assert_eq!((pixmap.width(), pixmap.height()), (3200, 900));
        assert_eq!(pixel(&pixmap, 0, 0), [10, 20, 30, 255]);
        assert_eq!(pixel(&pixmap, 3199, 899), [10, 20, 30, 255]);
    }

    #[test]
    fn test_strap_band_rasterized_at_scale() {
        let draft = Draft {
            text: String::new(),
            strap_color: Some(Color::rgb(0, 0, 200)),
            ..Draft::default()
        };
        let layout = compute_layout(&draft, CANVAS_WIDTH, CANVAS_HEIGHT);
        let bg = ResolvedBackground::solid(Color::BLACK);
        let frame = FrameSpec {
            draft: &draft,
            layout: &layout,
            background: &bg,
            guides: false,
        };
        let pixmap = backend().render(&frame, 3200, 900).expect("render");
        // Band spans x 480..2720, y 648..751.5 at 2x.
        assert!(pixel(&pixmap, 1600, 700)[2] > 100);
        assert_eq!(pixel(&pixmap, 1600, 620), [0, 0, 0, 255]);
        assert_eq!(pixel(&pixmap, 460, 700), [0, 0, 0, 255]);
        assert_eq!(pixel(&pixmap, 2740, 700), [0, 0, 0, 255]);
        assert!(pixel(&pixmap, 1600, 652)[2] > pixel(&pixmap, 1600, 746)[2]);
    }

    #[test]
    fn test_invalid_svg_is_frame_error() {
        let err = backend().rasterize("<svg").expect_err("should fail");
        assert!(matches!(err, RenderError::Frame(_)));
    }
}
