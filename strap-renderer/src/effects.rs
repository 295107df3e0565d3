//! Named text effect stages.
//!
//! Each [`StyleMode`] maps to one effect. An effect can describe itself as an
//! SVG filter for the vector backend and apply itself to a premultiplied RGBA
//! text layer for the software canvas backend; both produce the same look.

use std::fmt::Write;

use strap_core::StyleMode;
use tiny_skia::Pixmap;

use crate::blur::blur_alpha;

/// A swappable post-processing stage for the text layer.
pub trait TextEffect: Send + Sync {
    /// Stable name, matching the style mode.
    fn name(&self) -> &'static str;

    /// SVG `<filter>` element with the given id.
    fn svg_filter(&self, id: &str) -> String;

    /// Apply to a text layer rendered at `scale` px per logical unit.
    fn apply(&self, layer: &mut Pixmap, scale: f32);
}

/// Raised lettering: specular lighting over a blurred alpha mask, clipped to
/// the glyphs and merged under the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Emboss {
    /// Blur of the source alpha, in logical units.
    pub blur_sigma: f32,
    /// Height of the alpha surface.
    pub surface_scale: f32,
    /// Specular reflection constant.
    pub specular_constant: f32,
    /// Specular exponent (shininess).
    pub specular_exponent: f32,
    /// Point light position in logical units.
    pub light: [f32; 3],
}

impl Emboss {
    /// The stock emboss.
    pub const DEFAULT: Self = Self {
        blur_sigma: 1.25,
        surface_scale: 3.0,
        specular_constant: 1.1,
        specular_exponent: 35.0,
        light: [-200.0, -300.0, 400.0],
    };
}

impl Default for Emboss {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TextEffect for Emboss {
    fn name(&self) -> &'static str {
        StyleMode::Emboss.as_str()
    }

    fn svg_filter(&self, id: &str) -> String {
        let [lx, ly, lz] = self.light;
        let mut out = String::with_capacity(640);
        let _ = write!(
            out,
            "<filter id=\"{id}\" x=\"-50%\" y=\"-50%\" width=\"200%\" height=\"200%\">\
             <feGaussianBlur in=\"SourceAlpha\" stdDeviation=\"{}\" result=\"alpha\"/>\
             <feSpecularLighting in=\"alpha\" surfaceScale=\"{}\" specularConstant=\"{}\" \
             specularExponent=\"{}\" lighting-color=\"#FFFFFF\" result=\"spec\">\
             <fePointLight x=\"{lx}\" y=\"{ly}\" z=\"{lz}\"/></feSpecularLighting>\
             <feComposite in=\"spec\" in2=\"SourceAlpha\" operator=\"in\" result=\"litSpec\"/>\
             <feMerge><feMergeNode in=\"litSpec\"/><feMergeNode in=\"SourceGraphic\"/></feMerge>\
             </filter>",
            self.blur_sigma, self.surface_scale, self.specular_constant, self.specular_exponent,
        );
        out
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap,
        clippy::many_single_char_names
    )]
    fn apply(&self, layer: &mut Pixmap, scale: f32) {
        let (w, h) = (layer.width(), layer.height());
        let alpha: Vec<u8> = layer.data().chunks_exact(4).map(|p| p[3]).collect();
        if alpha.iter().all(|a| *a == 0) {
            return;
        }
        let blurred = blur_alpha(&alpha, w, h, self.blur_sigma * scale);
        let (wi, hi) = (w as i32, h as i32);
        let a = |x: i32, y: i32| -> f32 {
            let x = x.clamp(0, wi - 1);
            let y = y.clamp(0, hi - 1);
            f32::from(blurred[(y * wi + x) as usize]) / 255.0
        };
        let ss = self.surface_scale;
        let [lx, ly, lz] = self.light.map(|v| v * scale);

        let data = layer.data_mut();
        for y in 0..hi {
            for x in 0..wi {
                let idx = (y * wi + x) as usize;
                let src_a = f32::from(alpha[idx]) / 255.0;
                if src_a <= 0.0 {
                    continue;
                }

                let nx = -ss
                    * 0.25
                    * ((a(x + 1, y - 1) + 2.0 * a(x + 1, y) + a(x + 1, y + 1))
                        - (a(x - 1, y - 1) + 2.0 * a(x - 1, y) + a(x - 1, y + 1)));
                let ny = -ss
                    * 0.25
                    * ((a(x - 1, y + 1) + 2.0 * a(x, y + 1) + a(x + 1, y + 1))
                        - (a(x - 1, y - 1) + 2.0 * a(x, y - 1) + a(x + 1, y - 1)));
                let n = normalize([nx, ny, 1.0]);

                let z = ss * a(x, y);
                let l = normalize([lx - x as f32, ly - y as f32, lz - z]);
                let half = normalize([l[0], l[1], l[2] + 1.0]);
                let n_dot_h = (n[0] * half[0] + n[1] * half[1] + n[2] * half[2]).max(0.0);
                let spec =
                    (self.specular_constant * n_dot_h.powf(self.specular_exponent)).clamp(0.0, 1.0);

                // Composite in SourceAlpha, then merge the source over it.
                let lit = spec * src_a * 255.0 * (1.0 - src_a);
                let px = &mut data[idx * 4..idx * 4 + 4];
                for c in px.iter_mut() {
                    *c = (f32::from(*c) + lit).round().min(255.0) as u8;
                }
            }
        }
    }
}

/// Flat lettering with a soft drop shadow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropShadow {
    /// Horizontal offset in logical units.
    pub dx: f32,
    /// Vertical offset in logical units.
    pub dy: f32,
    /// Blur in logical units.
    pub blur_sigma: f32,
    /// Shadow opacity.
    pub opacity: f32,
}

impl DropShadow {
    /// The stock shadow.
    pub const DEFAULT: Self = Self {
        dx: 0.0,
        dy: 2.0,
        blur_sigma: 1.5,
        opacity: 0.3,
    };
}

impl Default for DropShadow {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TextEffect for DropShadow {
    fn name(&self) -> &'static str {
        StyleMode::Flat.as_str()
    }

    fn svg_filter(&self, id: &str) -> String {
        format!(
            "<filter id=\"{id}\" x=\"-50%\" y=\"-50%\" width=\"200%\" height=\"200%\">\
             <feDropShadow dx=\"{}\" dy=\"{}\" stdDeviation=\"{}\" flood-color=\"#000000\" flood-opacity=\"{}\"/>\
             </filter>",
            self.dx, self.dy, self.blur_sigma, self.opacity
        )
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    fn apply(&self, layer: &mut Pixmap, scale: f32) {
        let (w, h) = (layer.width(), layer.height());
        let alpha: Vec<u8> = layer.data().chunks_exact(4).map(|p| p[3]).collect();
        if alpha.iter().all(|a| *a == 0) {
            return;
        }
        let blurred = blur_alpha(&alpha, w, h, self.blur_sigma * scale);
        let (wi, hi) = (w as i32, h as i32);
        let ox = (self.dx * scale).round() as i32;
        let oy = (self.dy * scale).round() as i32;

        let data = layer.data_mut();
        for y in 0..hi {
            for x in 0..wi {
                let (sx, sy) = (x - ox, y - oy);
                if sx < 0 || sy < 0 || sx >= wi || sy >= hi {
                    continue;
                }
                let shadow = f32::from(blurred[(sy * wi + sx) as usize]) * self.opacity;
                if shadow <= 0.0 {
                    continue;
                }
                // Black shadow under the source: only alpha grows.
                let idx = ((y * wi + x) as usize) * 4;
                let src_a = f32::from(data[idx + 3]) / 255.0;
                let out_a = f32::from(data[idx + 3]) + shadow * (1.0 - src_a);
                data[idx + 3] = out_a.round().min(255.0) as u8;
            }
        }
    }
}

static EMBOSS: Emboss = Emboss::DEFAULT;
static DROP_SHADOW: DropShadow = DropShadow::DEFAULT;

/// The effect stage for a style mode.
#[must_use]
pub fn effect_for(mode: StyleMode) -> &'static dyn TextEffect {
    match mode {
        StyleMode::Emboss => &EMBOSS,
        StyleMode::Flat => &DROP_SHADOW,
    }
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len <= f32::EPSILON {
        [0.0, 0.0, 1.0]
    } else {
        [v[0] / len, v[1] / len, v[2] / len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiny_skia::{Color, Paint, PathBuilder, Rect, Transform};

    fn square_layer() -> Pixmap {
        let mut layer = Pixmap::new(40, 40).expect("pixmap");
        let mut paint = Paint::default();
        paint.set_color(Color::WHITE);
        let rect = Rect::from_xywh(10.0, 10.0, 20.0, 20.0).expect("rect");
        layer.fill_path(
            &PathBuilder::from_rect(rect),
            &paint,
            tiny_skia::FillRule::Winding,
            Transform::identity(),
            None,
        );
        layer
    }

    fn alpha_at(p: &Pixmap, x: u32, y: u32) -> u8 {
        p.data()[((y * p.width() + x) * 4 + 3) as usize]
    }

    #[test]
    fn test_effect_names_match_modes() {
        assert_eq!(effect_for(StyleMode::Emboss).name(), "emboss");
        assert_eq!(effect_for(StyleMode::Flat).name(), "flat");
    }

    #[test]
    fn test_svg_filters() {
        let emboss = effect_for(StyleMode::Emboss).svg_filter("fx");
        assert!(emboss.contains("id=\"fx\""));
        assert!(emboss.contains("feSpecularLighting"));
        assert!(emboss.contains("<fePointLight x=\"-200\" y=\"-300\" z=\"400\"/>"));
        let flat = effect_for(StyleMode::Flat).svg_filter("fx");
        assert!(flat.contains("<feDropShadow dx=\"0\" dy=\"2\" stdDeviation=\"1.5\""));
        assert!(flat.contains("flood-opacity=\"0.3\""));
    }

    #[test]
    fn test_shadow_extends_below_glyph() {
        let mut layer = square_layer();
        assert_eq!(alpha_at(&layer, 20, 31), 0);
        DropShadow::DEFAULT.apply(&mut layer, 1.0);
        assert!(alpha_at(&layer, 20, 31) > 0);
        assert!(alpha_at(&layer, 20, 31) < 255);
        // Source stays opaque.
        assert_eq!(alpha_at(&layer, 20, 20), 255);
    }

    #[test]
    fn test_emboss_stays_inside_glyph() {
        let mut layer = square_layer();
        let before = layer.clone();
        Emboss::DEFAULT.apply(&mut layer, 1.0);
        assert_eq!(alpha_at(&layer, 5, 5), 0);
        assert_eq!(alpha_at(&layer, 35, 35), 0);
        assert_eq!(alpha_at(&layer, 20, 20), alpha_at(&before, 20, 20));
    }

    #[test]
    fn test_empty_layer_untouched() {
        let mut layer = Pixmap::new(8, 8).expect("pixmap");
        Emboss::DEFAULT.apply(&mut layer, 2.0);
        DropShadow::DEFAULT.apply(&mut layer, 2.0);
        assert!(layer.data().iter().all(|b| *b == 0));
    }
}
