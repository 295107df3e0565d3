//! Layout engine: derived geometry for a draft on a canvas.
//!
//! Everything here is a pure function of its inputs, so preview and export
//! derive identical geometry from the same draft.

use serde::Serialize;

use crate::geometry::{Point, QuadCurve, Rect, Segment};
use crate::glyph::{GlyphMetrics, HEURISTIC_ADVANCE_EM};
use crate::limits::{self, pos_x_for_margin};
use crate::{Align, BackgroundFit, Color, Draft};

/// Logical canvas width shared by preview and export.
pub const CANVAS_WIDTH: f32 = 1600.0;
/// Logical canvas height shared by preview and export.
pub const CANVAS_HEIGHT: f32 = 450.0;

/// Lower bound of the auto-fit character estimate.
pub const MIN_CAPACITY: usize = 6;
/// Upper bound of the auto-fit character estimate.
pub const MAX_CAPACITY: usize = 22;

/// Strap band placement in percent of the canvas: x, y, width, height.
pub const STRAP_BAND_PERCENT: [f32; 4] = [15.0, 72.0, 70.0, 11.5];
/// Corner radius of the strap band in px.
pub const STRAP_BAND_RADIUS: f32 = 16.0;

/// The rounded strap band painted between the background and the text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrapBand {
    /// Band rectangle in canvas px.
    pub rect: Rect,
    /// Corner radius, never more than half the shorter side.
    pub radius: f32,
    /// Band fill.
    pub color: Color,
}

/// Strap band rectangle on a `canvas_w` × `canvas_h` canvas.
#[must_use]
pub fn strap_band_rect(canvas_w: f32, canvas_h: f32) -> Rect {
    let [x, y, w, h] = STRAP_BAND_PERCENT;
    Rect::new(
        x * canvas_w / 100.0,
        y * canvas_h / 100.0,
        w * canvas_w / 100.0,
        h * canvas_h / 100.0,
    )
}

/// Horizontal anchor of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    /// Run starts at the anchor.
    Start,
    /// Run is centered on the anchor.
    Middle,
    /// Run ends at the anchor.
    End,
}

impl TextAnchor {
    /// SVG `text-anchor` value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

impl From<Align> for TextAnchor {
    fn from(align: Align) -> Self {
        match align {
            Align::Start => Self::Start,
            Align::Center => Self::Middle,
            Align::End => Self::End,
        }
    }
}

/// A line laid out on a straight baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StraightLine {
    /// Line content.
    pub text: String,
    /// Anchor x.
    pub x: f32,
    /// Vertical center of the line.
    pub y: f32,
}

/// A line laid out along the arc path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurvedLine {
    /// Line content.
    pub text: String,
    /// Anchor position along the path in percent of its length.
    pub start_offset_pct: f32,
}

/// How the text block is placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "lines", rename_all = "lowercase")]
pub enum TextPlacement {
    /// Nothing to draw.
    Empty,
    /// Lines stacked around the nominal baseline.
    Straight(Vec<StraightLine>),
    /// Lines distributed along the arc path.
    Curved(Vec<CurvedLine>),
}

impl TextPlacement {
    /// Number of lines placed.
    #[must_use]
    pub fn line_count(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Straight(lines) => lines.len(),
            Self::Curved(lines) => lines.len(),
        }
    }
}

/// Derived geometry of a draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutResult {
    /// Canvas width the layout was computed for.
    pub canvas_width: f32,
    /// Canvas height the layout was computed for.
    pub canvas_height: f32,
    /// Safe-area margin in px.
    pub margin: f32,
    /// Guide rectangle inset by the margin.
    pub guide_rect: Rect,
    /// Vertical then horizontal center crosshair.
    pub crosshairs: [Segment; 2],
    /// Clamped baseline y of the arc.
    pub base_y: f32,
    /// Arc path through the clamped baseline.
    pub arc_path: QuadCurve,
    /// Text anchor mode.
    pub anchor: TextAnchor,
    /// Nominal anchor point (`posX`, `posY` in px).
    pub anchor_point: Point,
    /// Strap band, when the draft has a strap color.
    pub strap_band: Option<StrapBand>,
    /// Line placement.
    pub placement: TextPlacement,
    /// Font size in px.
    pub font_size: f32,
    /// Letter spacing in px.
    pub letter_spacing: f32,
    /// Distance between successive lines in px.
    pub line_advance: f32,
    /// Estimated character capacity of the printable width.
    pub capacity: usize,
    /// Character count of the longest line.
    pub longest_line: usize,
}

impl LayoutResult {
    /// Whether text follows the arc.
    #[must_use]
    pub fn is_curved(&self) -> bool {
        matches!(self.placement, TextPlacement::Curved(_))
    }

    /// Whether the longest line exceeds the estimated capacity.
    #[must_use]
    pub fn over_capacity(&self) -> bool {
        self.longest_line > self.capacity
    }
}

/// Compute the layout of `draft` on a `canvas_w` × `canvas_h` canvas.
#[must_use]
pub fn compute_layout(draft: &Draft, canvas_w: f32, canvas_h: f32) -> LayoutResult {
    let safe_margin = limits::SAFE_MARGIN.clamp(draft.safe_margin);
    let margin = safe_margin / 100.0 * canvas_h;
    let guide_rect = Rect::new(
        margin,
        margin,
        canvas_w - 2.0 * margin,
        canvas_h - 2.0 * margin,
    );
    let crosshairs = [
        Segment::new(
            Point::new(canvas_w / 2.0, margin),
            Point::new(canvas_w / 2.0, canvas_h - margin),
        ),
        Segment::new(
            Point::new(margin, canvas_h / 2.0),
            Point::new(canvas_w - margin, canvas_h / 2.0),
        ),
    ];

    let pos_x = pos_x_for_margin(safe_margin).clamp_or(draft.pos_x, 50.0);
    let pos_y = limits::POS_Y.clamp_or(draft.pos_y, 50.0);
    let arc = limits::ARC.clamp(draft.arc);

    let (lo, hi) = (margin, (canvas_h - margin).max(margin));
    let base_y = (pos_y / 100.0 * canvas_h).clamp(lo, hi);
    let control_y = (base_y + arc / 100.0 * canvas_h).clamp(lo, hi);
    let arc_path = QuadCurve::new(
        Point::new(margin, base_y),
        Point::new(canvas_w / 2.0, control_y),
        Point::new(canvas_w - margin, base_y),
    );

    let font_size = draft.font_size;
    let line_advance = font_size * draft.line_height;
    let letter_spacing = draft.tracking_px();
    let anchor_point = Point::new(pos_x / 100.0 * canvas_w, pos_y / 100.0 * canvas_h);

    let placement = if draft.has_text() {
        let lines: Vec<&str> = draft.lines().collect();
        #[allow(clippy::cast_precision_loss)]
        let mid = (lines.len() - 1) as f32 / 2.0;
        if arc.abs() < 1.0 {
            TextPlacement::Straight(
                lines
                    .iter()
                    .enumerate()
                    .map(|(i, line)| {
                        #[allow(clippy::cast_precision_loss)]
                        let offset = (i as f32 - mid) * line_advance;
                        StraightLine {
                            text: (*line).to_string(),
                            x: anchor_point.x,
                            y: anchor_point.y + offset,
                        }
                    })
                    .collect(),
            )
        } else {
            let gap_pct = line_advance / canvas_h * 100.0;
            let (sm_lo, sm_hi) = (safe_margin, 100.0 - safe_margin);
            TextPlacement::Curved(
                lines
                    .iter()
                    .enumerate()
                    .map(|(i, line)| {
                        #[allow(clippy::cast_precision_loss)]
                        let offset = pos_x + (i as f32 - mid) * gap_pct;
                        CurvedLine {
                            text: (*line).to_string(),
                            start_offset_pct: offset.clamp(sm_lo, sm_hi),
                        }
                    })
                    .collect(),
            )
        }
    } else {
        TextPlacement::Empty
    };

    let strap_band = draft.strap_color.map(|color| {
        let rect = strap_band_rect(canvas_w, canvas_h);
        StrapBand {
            rect,
            radius: STRAP_BAND_RADIUS.min(rect.width / 2.0).min(rect.height / 2.0),
            color,
        }
    });

    let longest_line = draft.lines().map(|l| l.chars().count()).max().unwrap_or(0);

    LayoutResult {
        canvas_width: canvas_w,
        canvas_height: canvas_h,
        margin,
        guide_rect,
        crosshairs,
        base_y,
        arc_path,
        anchor: draft.align.into(),
        anchor_point,
        strap_band,
        placement,
        font_size,
        letter_spacing,
        line_advance,
        capacity: auto_fit_capacity(guide_rect.width, font_size, letter_spacing),
        longest_line,
    }
}

/// Estimate how many characters fit across `width`.
///
/// `floor(width / (font_size * 0.55 + tracking * 2))`, clamped to
/// [`MIN_CAPACITY`]..=[`MAX_CAPACITY`]. A non-positive divisor yields the
/// maximum.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn auto_fit_capacity(width: f32, font_size: f32, tracking: f32) -> usize {
    let per_char = font_size * HEURISTIC_ADVANCE_EM + tracking * 2.0;
    if per_char <= 0.0 || !per_char.is_finite() {
        return MAX_CAPACITY;
    }
    let estimate = (width / per_char).floor().max(0.0);
    (estimate as usize).clamp(MIN_CAPACITY, MAX_CAPACITY)
}

/// Centers of manually spaced glyphs along one axis.
///
/// The run spans `sum(widths) + spacing * (n - 1)`. The cursor starts at
/// `anchor - total / 2` (middle), `anchor` (start) or `anchor - total` (end);
/// each glyph sits at the cursor plus half its width, then the cursor
/// advances by the width plus `spacing`.
#[must_use]
pub fn spaced_glyph_positions(
    widths: &[f32],
    anchor: f32,
    spacing: f32,
    mode: TextAnchor,
) -> Vec<f32> {
    if widths.is_empty() {
        return Vec::new();
    }
    #[allow(clippy::cast_precision_loss)]
    let gaps = (widths.len() - 1) as f32;
    let total: f32 = widths.iter().sum::<f32>() + spacing * gaps;
    let mut cursor = match mode {
        TextAnchor::Start => anchor,
        TextAnchor::Middle => anchor - total / 2.0,
        TextAnchor::End => anchor - total,
    };
    widths
        .iter()
        .map(|w| {
            let center = cursor + w / 2.0;
            cursor += w + spacing;
            center
        })
        .collect()
}

/// Placement of an image of `image_w` × `image_h` on the canvas.
#[must_use]
pub fn fit_rect(
    image_w: f32,
    image_h: f32,
    canvas_w: f32,
    canvas_h: f32,
    fit: BackgroundFit,
) -> Rect {
    if image_w <= 0.0 || image_h <= 0.0 {
        return Rect::new(0.0, 0.0, canvas_w, canvas_h);
    }
    let sx = canvas_w / image_w;
    let sy = canvas_h / image_h;
    let scale = match fit {
        BackgroundFit::Cover => sx.max(sy),
        BackgroundFit::Contain => sx.min(sy),
    };
    let w = image_w * scale;
    let h = image_h * scale;
    Rect::new((canvas_w - w) / 2.0, (canvas_h - h) / 2.0, w, h)
}

/// A single glyph placed for per-character rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlyphPlacement {
    /// Character to draw.
    pub ch: char,
    /// Glyph center on its baseline.
    pub center: Point,
    /// Rotation in radians.
    pub angle: f32,
}

/// Place every glyph of the layout individually with manual spacing.
///
/// Straight lines space glyphs horizontally around each line anchor. Curved
/// lines space them along the arc length and rotate each glyph to the
/// tangent, so the result matches a native text-on-path layout.
#[must_use]
pub fn place_glyphs(
    draft: &Draft,
    layout: &LayoutResult,
    metrics: &dyn GlyphMetrics,
) -> Vec<GlyphPlacement> {
    let advances = |line: &str| {
        metrics.advances(draft.font, draft.font_weight, layout.font_size, line)
    };
    let mut out = Vec::new();
    match &layout.placement {
        TextPlacement::Empty => {}
        TextPlacement::Straight(lines) => {
            for line in lines {
                let widths = advances(&line.text);
                let xs =
                    spaced_glyph_positions(&widths, line.x, layout.letter_spacing, layout.anchor);
                out.extend(line.text.chars().zip(xs).map(|(ch, x)| GlyphPlacement {
                    ch,
                    center: Point::new(x, line.y),
                    angle: 0.0,
                }));
            }
        }
        TextPlacement::Curved(lines) => {
            let length = layout.arc_path.arc_length();
            for line in lines {
                let widths = advances(&line.text);
                let start = line.start_offset_pct / 100.0 * length;
                let ds =
                    spaced_glyph_positions(&widths, start, layout.letter_spacing, layout.anchor);
                out.extend(line.text.chars().zip(ds).map(|(ch, d)| {
                    let (center, angle) = layout.arc_path.position_at_length(d);
                    GlyphPlacement { ch, center, angle }
                }));
            }
        }
    }
    out
}
