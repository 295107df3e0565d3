//! Numeric bounds for every adjustable draft field.

use serde::Serialize;

/// Inclusive bounds and UI step of a numeric control.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    /// Smallest accepted value.
    pub min: f32,
    /// Largest accepted value.
    pub max: f32,
    /// Slider step offered by the form.
    pub step: f32,
}

impl Bounds {
    /// Create bounds.
    #[must_use]
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    /// Clamp a finite value into the bounds.
    ///
    /// Non-finite values collapse to `fallback` (itself clamped).
    #[must_use]
    pub fn clamp_or(self, value: f32, fallback: f32) -> f32 {
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            fallback.clamp(self.min, self.max)
        }
    }

    /// Clamp a value into the bounds.
    #[must_use]
    pub fn clamp(self, value: f32) -> f32 {
        self.clamp_or(value, self.min)
    }

    /// Whether the value lies within the bounds.
    #[must_use]
    pub fn contains(self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Maximum number of characters in the strap text.
pub const MAX_TEXT_CHARS: usize = 25;

/// Font size in px.
pub const FONT_SIZE: Bounds = Bounds::new(60.0, 500.0, 1.0);
/// Font weight.
pub const FONT_WEIGHT: Bounds = Bounds::new(100.0, 1000.0, 50.0);
/// Tracking in em.
pub const TRACKING: Bounds = Bounds::new(-0.1, 0.3, 0.005);
/// Line height multiplier.
pub const LINE_HEIGHT: Bounds = Bounds::new(0.9, 1.6, 0.01);
/// Outline width in px.
pub const STROKE_WIDTH: Bounds = Bounds::new(0.0, 20.0, 0.5);
/// Arc bow in percent of canvas height.
pub const ARC: Bounds = Bounds::new(-20.0, 20.0, 1.0);
/// Horizontal anchor position in percent, before the safe margin is applied.
pub const POS_X: Bounds = Bounds::new(0.0, 100.0, 0.5);
/// Vertical anchor position in percent.
pub const POS_Y: Bounds = Bounds::new(0.0, 100.0, 0.5);
/// Safe margin in percent.
pub const SAFE_MARGIN: Bounds = Bounds::new(0.0, 12.0, 0.5);
/// Integer export scale factor.
pub const EXPORT_SCALE: Bounds = Bounds::new(1.0, 4.0, 1.0);

/// Horizontal bounds once the safe margin is applied.
#[must_use]
pub fn pos_x_for_margin(safe_margin: f32) -> Bounds {
    let sm = SAFE_MARGIN.clamp(safe_margin);
    Bounds::new(sm, 100.0 - sm, POS_X.step)
}

/// Clamp an export scale factor into `1..=4`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_export_scale(scale: u32) -> u32 {
    scale.clamp(EXPORT_SCALE.min as u32, EXPORT_SCALE.max as u32)
}

/// Every bound in one serializable table, as offered to form hosts.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftLimits {
    /// See [`MAX_TEXT_CHARS`].
    pub max_text_chars: usize,
    /// See [`FONT_SIZE`].
    pub font_size: Bounds,
    /// See [`FONT_WEIGHT`].
    pub font_weight: Bounds,
    /// See [`TRACKING`].
    pub tracking: Bounds,
    /// See [`LINE_HEIGHT`].
    pub line_height: Bounds,
    /// See [`STROKE_WIDTH`].
    pub stroke_width: Bounds,
    /// See [`ARC`].
    pub arc: Bounds,
    /// See [`POS_X`].
    pub pos_x: Bounds,
    /// See [`POS_Y`].
    pub pos_y: Bounds,
    /// See [`SAFE_MARGIN`].
    pub safe_margin: Bounds,
    /// See [`EXPORT_SCALE`].
    pub export_scale: Bounds,
}

/// The limits table.
pub const LIMITS: DraftLimits = DraftLimits {
    max_text_chars: MAX_TEXT_CHARS,
    font_size: FONT_SIZE,
    font_weight: FONT_WEIGHT,
    tracking: TRACKING,
    line_height: LINE_HEIGHT,
    stroke_width: STROKE_WIDTH,
    arc: ARC,
    pos_x: POS_X,
    pos_y: POS_Y,
    safe_margin: SAFE_MARGIN,
    export_scale: EXPORT_SCALE,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_handles_non_finite() {
        assert!((FONT_SIZE.clamp(f32::NAN) - 60.0).abs() < f32::EPSILON);
        assert!((FONT_SIZE.clamp_or(f32::INFINITY, 240.0) - 240.0).abs() < f32::EPSILON);
        assert!((FONT_SIZE.clamp(9000.0) - 500.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_pos_x_bounds_follow_margin() {
        let b = pos_x_for_margin(6.0);
        assert!((b.min - 6.0).abs() < f32::EPSILON);
        assert!((b.max - 94.0).abs() < f32::EPSILON);
        let wide = pos_x_for_margin(40.0);
        assert!((wide.min - 12.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_export_scale_clamp() {
        assert_eq!(clamp_export_scale(0), 1);
        assert_eq!(clamp_export_scale(3), 3);
        assert_eq!(clamp_export_scale(9), 4);
    }
}
