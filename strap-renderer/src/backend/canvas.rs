//! Software canvas backend.
//!
//! Draws layer by layer with tiny-skia: solid fill, background image, strap
//! band, guides, then a separate text layer. Glyphs come from ab_glyph outlines, placed one
//! at a time with manual spacing and rotated along the arc when curved. The
//! effect stage runs on the text layer as a pixel operation.

use std::sync::Arc;

use ab_glyph::{Font, FontArc, OutlineCurve};
use strap_core::layout::place_glyphs;
use strap_core::{Color, LayoutResult};
use tiny_skia::{
    FillRule, GradientStop, LineJoin, LinearGradient, Paint, Path, PathBuilder, Pixmap,
    PixmapPaint, SpreadMode, Stroke, StrokeDash, Transform,
};

use super::{FrameSpec, RenderBackend};
use crate::effects::effect_for;
use crate::fonts::FontLibrary;
use crate::image::ResolvedBackground;
use crate::svg::{
    CROSSHAIR_COLOR, CROSSHAIR_DASH, GUIDE_OPACITY, GUIDE_RECT_COLOR, GUIDE_RECT_DASH,
    SHEEN_BOTTOM, SHEEN_TOP,
};
use crate::{BackendType, RenderError, RenderResult};

/// Glyph-by-glyph software backend.
#[derive(Debug, Clone)]
pub struct CanvasBackend {
    fonts: Arc<FontLibrary>,
}

impl CanvasBackend {
    /// Create a canvas backend.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::NoBackend`] if the font library has no faces to
    /// outline glyphs with.
    pub fn new(fonts: Arc<FontLibrary>) -> RenderResult<Self> {
        if fonts.face_count() == 0 {
            return Err(RenderError::NoBackend(
                "canvas backend needs at least one font face".to_string(),
            ));
        }
        Ok(Self { fonts })
    }

    #[allow(clippy::cast_precision_loss)]
    fn paint_text(
        &self,
        frame: &FrameSpec<'_>,
        base: Transform,
        width: u32,
        height: u32,
    ) -> RenderResult<Option<Pixmap>> {
        let draft = frame.draft;
        let glyphs = place_glyphs(draft, frame.layout, self.fonts.as_ref());
        if glyphs.is_empty() {
            return Ok(None);
        }
        let face = self
            .fonts
            .face(draft.font, draft.font_weight)
            .ok_or_else(|| RenderError::Frame(format!("No usable face for '{}'", draft.font)))?;

        let mut layer = Pixmap::new(width, height)
            .ok_or_else(|| RenderError::Frame("Failed to create text layer".to_string()))?;

        let upem = face.units_per_em().unwrap_or(1000.0);
        let s = frame.layout.font_size / upem;
        let central = (face.ascent_unscaled() + face.descent_unscaled()) / 2.0;
        let out_scale = width as f32 / frame.layout.canvas_width;

        let fill = paint_for(draft.fill);
        let outline = draft.has_stroke().then(|| {
            (
                paint_for(draft.stroke),
                Stroke {
                    width: draft.stroke_width * out_scale,
                    line_join: LineJoin::Round,
                    ..Stroke::default()
                },
            )
        });

        for glyph in &glyphs {
            let Some(path) = glyph_path(&face, glyph.ch) else {
                continue;
            };
            let advance = face.h_advance_unscaled(face.glyph_id(glyph.ch));
            let t = base
                .pre_translate(glyph.center.x, glyph.center.y)
                .pre_rotate(glyph.angle.to_degrees())
                .pre_scale(s, -s)
                .pre_translate(-advance / 2.0, -central);
            let Some(path) = path.transform(t) else {
                continue;
            };
            // Stroke under fill.
            if let Some((paint, stroke)) = &outline {
                layer.stroke_path(&path, paint, stroke, Transform::identity(), None);
            }
            layer.fill_path(&path, &fill, FillRule::Winding, Transform::identity(), None);
        }

        effect_for(draft.style_mode).apply(&mut layer, out_scale);
        Ok(Some(layer))
    }
}

impl RenderBackend for CanvasBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Canvas
    }

    #[allow(clippy::cast_precision_loss)]
    fn render(&self, frame: &FrameSpec<'_>, width: u32, height: u32) -> RenderResult<Pixmap> {
        let mut pixmap = Pixmap::new(width.max(1), height.max(1))
            .ok_or_else(|| RenderError::Frame("Failed to create pixmap".to_string()))?;
        let base = Transform::from_scale(
            pixmap.width() as f32 / frame.layout.canvas_width,
            pixmap.height() as f32 / frame.layout.canvas_height,
        );

        paint_background(&mut pixmap, frame.background, frame.layout, base);
        paint_strap_band(&mut pixmap, frame.layout, base);
        if frame.guides {
            paint_guides(&mut pixmap, frame.layout, base)?;
        }
        if let Some(layer) = self.paint_text(frame, base, pixmap.width(), pixmap.height())? {
            pixmap.draw_pixmap(
                0,
                0,
                layer.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
        Ok(pixmap)
    }
}

/// Solid fill, then the decoded image at its fitted placement.
#[allow(clippy::cast_precision_loss)]
pub fn paint_background(
    pixmap: &mut Pixmap,
    background: &ResolvedBackground,
    layout: &LayoutResult,
    base: Transform,
) {
    pixmap.fill(skia_color(background.fill));

    let Some(rect) = background.placement(layout.canvas_width, layout.canvas_height) else {
        return;
    };
    let Some(decoded) = background.image.as_ref().and_then(|i| i.decoded.as_ref()) else {
        return;
    };
    let t = base
        .pre_translate(rect.x, rect.y)
        .pre_scale(rect.width / decoded.width as f32, rect.height / decoded.height as f32);
    let source: &Pixmap = &decoded.pixmap;
    pixmap.draw_pixmap(
        0,
        0,
        source.as_ref(),
        &PixmapPaint {
            quality: tiny_skia::FilterQuality::Bilinear,
            ..PixmapPaint::default()
        },
        t,
        None,
    );
}

/// Rounded strap band with its vertical sheen.
pub fn paint_strap_band(pixmap: &mut Pixmap, layout: &LayoutResult, base: Transform) {
    let Some(band) = &layout.strap_band else {
        return;
    };
    let Some(path) = rounded_rect(&band.rect, band.radius) else {
        return;
    };
    pixmap.fill_path(&path, &paint_for(band.color), FillRule::Winding, base, None);

    let r = &band.rect;
    let sheen = LinearGradient::new(
        tiny_skia::Point::from_xy(0.0, r.y),
        tiny_skia::Point::from_xy(0.0, r.bottom()),
        vec![
            GradientStop::new(0.0, skia_color(SHEEN_TOP)),
            GradientStop::new(1.0, skia_color(SHEEN_BOTTOM)),
        ],
        SpreadMode::Pad,
        Transform::identity(),
    );
    if let Some(shader) = sheen {
        let paint = Paint {
            shader,
            anti_alias: true,
            ..Paint::default()
        };
        pixmap.fill_path(&path, &paint, FillRule::Winding, base, None);
    }
}

fn rounded_rect(r: &strap_core::Rect, radius: f32) -> Option<Path> {
    // Quarter circle as one cubic.
    const K: f32 = 0.552_284_8;
    let (x, y, w, h) = (r.x, r.y, r.width, r.height);
    let rr = radius.min(w / 2.0).min(h / 2.0).max(0.0);
    let c = rr * (1.0 - K);

    let mut pb = PathBuilder::new();
    pb.move_to(x + rr, y);
    pb.line_to(x + w - rr, y);
    pb.cubic_to(x + w - c, y, x + w, y + c, x + w, y + rr);
    pb.line_to(x + w, y + h - rr);
    pb.cubic_to(x + w, y + h - c, x + w - c, y + h, x + w - rr, y + h);
    pb.line_to(x + rr, y + h);
    pb.cubic_to(x + c, y + h, x, y + h - c, x, y + h - rr);
    pb.line_to(x, y + rr);
    pb.cubic_to(x, y + c, x + c, y, x + rr, y);
    pb.close();
    pb.finish()
}

/// Safe-area rectangle and crosshairs, composited at the guide opacity.
///
/// # Errors
///
/// Returns an error if the guide layer cannot be allocated.
pub fn paint_guides(
    pixmap: &mut Pixmap,
    layout: &LayoutResult,
    base: Transform,
) -> RenderResult<()> {
    let mut layer = Pixmap::new(pixmap.width(), pixmap.height())
        .ok_or_else(|| RenderError::Frame("Failed to create guide layer".to_string()))?;

    let r = &layout.guide_rect;
    if let Some(rect) = tiny_skia::Rect::from_xywh(r.x, r.y, r.width, r.height) {
        let path = PathBuilder::from_rect(rect);
        stroke_dashed(&mut layer, &path, GUIDE_RECT_COLOR, GUIDE_RECT_DASH, base);
    }
    for line in &layout.crosshairs {
        let mut pb = PathBuilder::new();
        pb.move_to(line.from.x, line.from.y);
        pb.line_to(line.to.x, line.to.y);
        if let Some(path) = pb.finish() {
            stroke_dashed(&mut layer, &path, CROSSHAIR_COLOR, CROSSHAIR_DASH, base);
        }
    }

    pixmap.draw_pixmap(
        0,
        0,
        layer.as_ref(),
        &PixmapPaint {
            opacity: GUIDE_OPACITY,
            ..PixmapPaint::default()
        },
        Transform::identity(),
        None,
    );
    Ok(())
}

fn stroke_dashed(layer: &mut Pixmap, path: &Path, color: Color, dash: [f32; 2], t: Transform) {
    let stroke = Stroke {
        width: 1.0,
        dash: StrokeDash::new(dash.to_vec(), 0.0),
        ..Stroke::default()
    };
    layer.stroke_path(path, &paint_for(color), &stroke, t, None);
}

/// Outline of `ch` in font units (y up).
fn glyph_path(face: &FontArc, ch: char) -> Option<Path> {
    let outline = face.outline(face.glyph_id(ch))?;
    let mut pb = PathBuilder::new();
    let mut pen: Option<ab_glyph::Point> = None;
    for curve in &outline.curves {
        let (start, end) = match curve {
            OutlineCurve::Line(a, b)
            | OutlineCurve::Quad(a, _, b)
            | OutlineCurve::Cubic(a, _, _, b) => (*a, *b),
        };
        let continues =
            pen.is_some_and(|p| (p.x - start.x).abs() < 1e-3 && (p.y - start.y).abs() < 1e-3);
        if !continues {
            if pen.is_some() {
                pb.close();
            }
            pb.move_to(start.x, start.y);
        }
        match curve {
            OutlineCurve::Line(_, b) => pb.line_to(b.x, b.y),
            OutlineCurve::Quad(_, c, b) => pb.quad_to(c.x, c.y, b.x, b.y),
            OutlineCurve::Cubic(_, c1, c2, b) => pb.cubic_to(c1.x, c1.y, c2.x, c2.y, b.x, b.y),
        }
        pen = Some(end);
    }
    if pen.is_some() {
        pb.close();
    }
    pb.finish()
}

fn paint_for(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(skia_color(color));
    paint.anti_alias = true;
    paint
}

fn skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strap_core::{compute_layout, Draft, CANVAS_HEIGHT, CANVAS_WIDTH};
    use usvg::fontdb;

    fn pixel(p: &Pixmap, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * p.width() + x) * 4) as usize;
        let d = p.data();
        [d[i], d[i + 1], d[i + 2], d[i + 3]]
    }

    fn layout() -> LayoutResult {
        compute_layout(&Draft::default(), CANVAS_WIDTH, CANVAS_HEIGHT)
    }

    #[test]
    fn test_requires_font_faces() {
        let fonts = Arc::new(FontLibrary::from_database(fontdb::Database::new()));
        let err = CanvasBackend::new(fonts).expect_err("no faces");
        assert!(matches!(err, RenderError::NoBackend(_)));
    }

    #[test]
    fn test_background_solid_fill() {
        let mut pixmap = Pixmap::new(160, 45).expect("pixmap");
        let bg = ResolvedBackground::solid(Color::rgb(200, 0, 0));
        paint_background(&mut pixmap, &bg, &layout(), Transform::from_scale(0.1, 0.1));
        assert_eq!(pixel(&pixmap, 80, 20), [200, 0, 0, 255]);
    }

    #[test]
    fn test_strap_band_geometry_and_sheen() {
        let draft = Draft {
            strap_color: Some(Color::rgb(200, 0, 0)),
            ..Draft::default()
        };
        let layout = compute_layout(&draft, CANVAS_WIDTH, CANVAS_HEIGHT);
        let mut pixmap = Pixmap::new(1600, 450).expect("pixmap");
        pixmap.fill(tiny_skia::Color::BLACK);
        paint_strap_band(&mut pixmap, &layout, Transform::identity());

        // Band spans x 240..1360, y 324..375.75.
        let inside = pixel(&pixmap, 800, 350);
        assert!(inside[0] > 100 && inside[1] < 40);
        assert_eq!(pixel(&pixmap, 800, 310), [0, 0, 0, 255]);
        assert_eq!(pixel(&pixmap, 800, 380), [0, 0, 0, 255]);
        assert_eq!(pixel(&pixmap, 230, 350), [0, 0, 0, 255]);
        assert_eq!(pixel(&pixmap, 1370, 350), [0, 0, 0, 255]);
        assert!(pixel(&pixmap, 250, 350)[0] > 100);
        // Rounded corners leave the extreme corner pixel untouched.
        assert_eq!(pixel(&pixmap, 241, 325), [0, 0, 0, 255]);
        // Sheen: lighter at the top edge than at the bottom.
        assert!(pixel(&pixmap, 800, 327)[0] > pixel(&pixmap, 800, 372)[0]);

        let mut untouched = Pixmap::new(1600, 450).expect("pixmap");
        untouched.fill(tiny_skia::Color::BLACK);
        paint_strap_band(&mut untouched, &self::layout(), Transform::identity());
        assert!(untouched.data().chunks_exact(4).all(|p| p == [0, 0, 0, 255]));
    }

    #[test]
    fn test_guides_are_faint_and_dashed() {
        let mut pixmap = Pixmap::new(1600, 450).expect("pixmap");
        pixmap.fill(tiny_skia::Color::BLACK);
        paint_guides(&mut pixmap, &layout(), Transform::identity()).expect("guides");

        // Top edge of the safe-area rectangle sits at y = 27.
        let band: Vec<[u8; 4]> = (27..60).map(|x| pixel(&pixmap, x, 27)).collect();
        let touched: Vec<_> = band.iter().filter(|p| p[0] > 0).collect();
        assert!(!touched.is_empty());
        // Red at 0.18 opacity never gets near full intensity.
        assert!(touched.iter().all(|p| p[0] < 60 && p[1] == 0));
        // Dashes leave gaps.
        assert!(touched.len() < band.len());
        // Center stays untouched.
        assert_eq!(pixel(&pixmap, 400, 100), [0, 0, 0, 255]);
    }

    #[test]
    fn test_system_font_text_draws_when_available() {
        let fonts = Arc::new(FontLibrary::system());
        let Ok(backend) = CanvasBackend::new(fonts) else {
            return;
        };
        let draft = Draft::default();
        let layout = compute_layout(&draft, CANVAS_WIDTH, CANVAS_HEIGHT);
        let bg = ResolvedBackground::solid(Color::BLACK);
        let frame = FrameSpec {
            draft: &draft,
            layout: &layout,
            background: &bg,
            guides: false,
        };
        let pixmap = backend.render(&frame, 1600, 450).expect("render");
        let lit = pixmap
            .data()
            .chunks_exact(4)
            .filter(|p| p[0] > 128)
            .count();
        assert!(lit > 0);
    }
}
