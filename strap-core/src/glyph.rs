//! Glyph advance measurement.

use crate::FontId;

/// Average advance of a glyph as a fraction of the font size.
pub const HEURISTIC_ADVANCE_EM: f32 = 0.55;

/// Measures the horizontal advance of individual characters.
pub trait GlyphMetrics {
    /// Advance width of `ch` in px for `font` at `font_size` px and `weight`.
    fn advance(&self, font: FontId, weight: u16, font_size: f32, ch: char) -> f32;

    /// Advances of every character in `text`.
    fn advances(&self, font: FontId, weight: u16, font_size: f32, text: &str) -> Vec<f32> {
        text.chars()
            .map(|ch| self.advance(font, weight, font_size, ch))
            .collect()
    }
}

/// Fixed-ratio estimate that needs no font data.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMetrics;

impl GlyphMetrics for HeuristicMetrics {
    fn advance(&self, _font: FontId, _weight: u16, font_size: f32, ch: char) -> f32 {
        if ch == ' ' {
            font_size * 0.3
        } else {
            font_size * HEURISTIC_ADVANCE_EM
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_advances() {
        let widths = HeuristicMetrics.advances(FontId::default(), 400, 100.0, "A B");
        assert_eq!(widths.len(), 3);
        assert!((widths[0] - 55.0).abs() < 1e-4);
        assert!((widths[1] - 30.0).abs() < 1e-4);
    }
}
