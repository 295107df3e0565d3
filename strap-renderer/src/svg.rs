//! SVG scene builder shared by the preview and the vector backend.
//!
//! The document is laid out in logical canvas units; `width`/`height` set the
//! output size and the `viewBox` maps one onto the other.

use std::fmt::Write;

use strap_core::{Color, Draft, LayoutResult, TextPlacement};

use crate::effects::effect_for;
use crate::image::ResolvedBackground;

/// Id of the arc path referenced by curved text.
pub const ARC_PATH_ID: &str = "strap-arc";

/// Id of the effect filter applied to the text group.
pub const EFFECT_FILTER_ID: &str = "strap-fx";

/// Id of the sheen gradient laid over the strap band.
pub const SHEEN_GRADIENT_ID: &str = "strap-sheen";
/// Sheen color at the top edge of the band.
pub const SHEEN_TOP: Color = Color::rgba(255, 255, 255, 26);
/// Sheen color at the bottom edge of the band.
pub const SHEEN_BOTTOM: Color = Color::rgba(0, 0, 0, 89);

/// Opacity of the guides layer.
pub const GUIDE_OPACITY: f32 = 0.18;

/// Safe-area rectangle stroke.
pub const GUIDE_RECT_COLOR: Color = Color::rgb(255, 0, 0);
/// Dash pattern of the safe-area rectangle.
pub const GUIDE_RECT_DASH: [f32; 2] = [10.0, 7.0];
/// Crosshair stroke.
pub const CROSSHAIR_COLOR: Color = Color::WHITE;
/// Dash pattern of the crosshairs.
pub const CROSSHAIR_DASH: [f32; 2] = [6.0, 6.0];

/// Output options for [`build_svg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvgOptions {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Include the guides layer.
    pub guides: bool,
}

impl SvgOptions {
    /// Logical size, guides off.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn for_layout(layout: &LayoutResult) -> Self {
        Self {
            width: layout.canvas_width.round().max(1.0) as u32,
            height: layout.canvas_height.round().max(1.0) as u32,
            guides: false,
        }
    }

    /// Multiply the output size by an integer scale.
    #[must_use]
    pub fn scaled(mut self, scale: u32) -> Self {
        self.width *= scale.max(1);
        self.height *= scale.max(1);
        self
    }

    /// Toggle the guides layer.
    #[must_use]
    pub fn with_guides(mut self, guides: bool) -> Self {
        self.guides = guides;
        self
    }
}

/// Build the SVG document for a draft.
///
/// Paint order: solid fill, background image, strap band, guides (when
/// enabled), text.
#[must_use]
pub fn build_svg(
    draft: &Draft,
    layout: &LayoutResult,
    background: &ResolvedBackground,
    options: &SvgOptions,
) -> String {
    let (view_w, view_h) = (layout.canvas_width, layout.canvas_height);
    let effect = effect_for(draft.style_mode);

    let mut svg = String::with_capacity(4096);
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" \
         width=\"{}\" height=\"{}\" viewBox=\"0 0 {view_w} {view_h}\">",
        options.width, options.height,
    );

    svg.push_str("<defs>");
    svg.push_str(&effect.svg_filter(EFFECT_FILTER_ID));
    let _ = write!(
        svg,
        "<path id=\"{ARC_PATH_ID}\" d=\"{}\"/>",
        layout.arc_path.to_path_data()
    );
    if layout.strap_band.is_some() {
        let _ = write!(
            svg,
            "<linearGradient id=\"{SHEEN_GRADIENT_ID}\" x1=\"0\" y1=\"0\" x2=\"0\" y2=\"1\">\
             <stop offset=\"0\" stop-color=\"{}\" stop-opacity=\"{}\"/>\
             <stop offset=\"1\" stop-color=\"{}\" stop-opacity=\"{}\"/></linearGradient>",
            SHEEN_TOP.to_hex_rgb(),
            SHEEN_TOP.alpha_f32(),
            SHEEN_BOTTOM.to_hex_rgb(),
            SHEEN_BOTTOM.alpha_f32(),
        );
    }
    svg.push_str("</defs>");

    let _ = write!(
        svg,
        "<rect x=\"0\" y=\"0\" width=\"{view_w}\" height=\"{view_h}\"{}/>",
        paint_attrs("fill", background.fill),
    );
    write_background_image(&mut svg, background, view_w, view_h);
    write_strap_band(&mut svg, layout);

    if options.guides {
        write_guides(&mut svg, layout);
    }

    if !matches!(layout.placement, TextPlacement::Empty) {
        let _ = write!(svg, "<g filter=\"url(#{EFFECT_FILTER_ID})\">");
        write_text(&mut svg, draft, layout);
        svg.push_str("</g>");
    }

    svg.push_str("</svg>");
    svg
}

fn write_background_image(svg: &mut String, background: &ResolvedBackground, w: f32, h: f32) {
    let Some(image) = &background.image else {
        return;
    };
    let href = escape_xml(&image.href);
    match background.placement(w, h) {
        Some(rect) => {
            let _ = write!(
                svg,
                "<svg x=\"0\" y=\"0\" width=\"{w}\" height=\"{h}\" overflow=\"hidden\">\
                 <image x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" preserveAspectRatio=\"none\" \
                 xlink:href=\"{href}\"/></svg>",
                rect.x, rect.y, rect.width, rect.height,
            );
        }
        None => {
            let aspect = match background.fit {
                strap_core::BackgroundFit::Cover => "xMidYMid slice",
                strap_core::BackgroundFit::Contain => "xMidYMid meet",
            };
            let _ = write!(
                svg,
                "<image x=\"0\" y=\"0\" width=\"{w}\" height=\"{h}\" preserveAspectRatio=\"{aspect}\" \
                 xlink:href=\"{href}\"/>",
            );
        }
    }
}

fn write_strap_band(svg: &mut String, layout: &LayoutResult) {
    let Some(band) = &layout.strap_band else {
        return;
    };
    let r = &band.rect;
    let geometry = format!(
        "x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" rx=\"{}\" ry=\"{}\"",
        r.x, r.y, r.width, r.height, band.radius, band.radius,
    );
    let _ = write!(
        svg,
        "<rect {geometry}{}/><rect {geometry} fill=\"url(#{SHEEN_GRADIENT_ID})\"/>",
        paint_attrs("fill", band.color),
    );
}

fn write_guides(svg: &mut String, layout: &LayoutResult) {
    let r = &layout.guide_rect;
    let _ = write!(
        svg,
        "<g opacity=\"{GUIDE_OPACITY}\" fill=\"none\" stroke-width=\"1\">\
         <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" stroke=\"{}\" stroke-dasharray=\"{} {}\"/>",
        r.x,
        r.y,
        r.width,
        r.height,
        GUIDE_RECT_COLOR.to_hex_rgb(),
        GUIDE_RECT_DASH[0],
        GUIDE_RECT_DASH[1],
    );
    for line in &layout.crosshairs {
        let _ = write!(
            svg,
            "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{}\" stroke-dasharray=\"{} {}\"/>",
            line.from.x,
            line.from.y,
            line.to.x,
            line.to.y,
            CROSSHAIR_COLOR.to_hex_rgb(),
            CROSSHAIR_DASH[0],
            CROSSHAIR_DASH[1],
        );
    }
    svg.push_str("</g>");
}

fn write_text(svg: &mut String, draft: &Draft, layout: &LayoutResult) {
    let _ = write!(
        svg,
        "<text font-family=\"{}\" font-size=\"{}\" font-weight=\"{}\" letter-spacing=\"{}\"{}",
        escape_xml(draft.font.stack()),
        layout.font_size,
        draft.font_weight,
        layout.letter_spacing,
        paint_attrs("fill", draft.fill),
    );
    if draft.has_stroke() {
        let _ = write!(
            svg,
            "{} stroke-width=\"{}\" stroke-linejoin=\"round\"",
            paint_attrs("stroke", draft.stroke),
            draft.stroke_width,
        );
    } else {
        svg.push_str(" stroke=\"none\"");
    }
    let _ = write!(
        svg,
        " dominant-baseline=\"central\" text-anchor=\"{}\" paint-order=\"stroke fill\" xml:space=\"preserve\">",
        layout.anchor.as_str(),
    );

    match &layout.placement {
        TextPlacement::Empty => {}
        TextPlacement::Straight(lines) => {
            for line in lines {
                let _ = write!(
                    svg,
                    "<tspan x=\"{}\" y=\"{}\">{}</tspan>",
                    line.x,
                    line.y,
                    escape_xml(&line.text),
                );
            }
        }
        TextPlacement::Curved(lines) => {
            for line in lines {
                let _ = write!(
                    svg,
                    "<textPath xlink:href=\"#{ARC_PATH_ID}\" startOffset=\"{}%\">{}</textPath>",
                    line.start_offset_pct,
                    escape_xml(&line.text),
                );
            }
        }
    }
    svg.push_str("</text>");
}

/// ` name="#rrggbb"` plus an opacity attribute for translucent colors.
fn paint_attrs(name: &str, color: Color) -> String {
    if color.is_opaque() {
        format!(" {name}=\"{}\"", color.to_hex_rgb())
    } else {
        format!(
            " {name}=\"{}\" {name}-opacity=\"{}\"",
            color.to_hex_rgb(),
            color.alpha_f32()
        )
    }
}

/// Escape special XML characters in a string.
#[must_use]
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
