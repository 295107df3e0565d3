//! Keyboard input for positioning the text block.

use serde::{Deserialize, Serialize};

/// Nudge distance in percent.
pub const NUDGE_STEP: f32 = 0.5;
/// Nudge distance in percent while the modifier is held.
pub const NUDGE_STEP_LARGE: f32 = 5.0;

/// Arrow keys that move the text anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrowKey {
    /// Move left.
    #[serde(rename = "ArrowLeft")]
    Left,
    /// Move right.
    #[serde(rename = "ArrowRight")]
    Right,
    /// Move up.
    #[serde(rename = "ArrowUp")]
    Up,
    /// Move down.
    #[serde(rename = "ArrowDown")]
    Down,
}

impl ArrowKey {
    /// Map a DOM `KeyboardEvent.key` value.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowLeft" => Some(Self::Left),
            "ArrowRight" => Some(Self::Right),
            "ArrowUp" => Some(Self::Up),
            "ArrowDown" => Some(Self::Down),
            _ => None,
        }
    }
}

/// A key press that nudges the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nudge {
    /// Direction.
    pub key: ArrowKey,
    /// Whether the large-step modifier (Shift) was held.
    pub modifier: bool,
}

impl Nudge {
    /// Create a nudge.
    #[must_use]
    pub const fn new(key: ArrowKey, modifier: bool) -> Self {
        Self { key, modifier }
    }

    /// Position delta `(dx, dy)` in percent; y grows downwards.
    #[must_use]
    pub fn delta(self) -> (f32, f32) {
        let step = if self.modifier {
            NUDGE_STEP_LARGE
        } else {
            NUDGE_STEP
        };
        match self.key {
            ArrowKey::Left => (-step, 0.0),
            ArrowKey::Right => (step, 0.0),
            ArrowKey::Up => (0.0, -step),
            ArrowKey::Down => (0.0, step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_steps() {
        assert_eq!(Nudge::new(ArrowKey::Left, false).delta(), (-0.5, 0.0));
        assert_eq!(Nudge::new(ArrowKey::Down, true).delta(), (0.0, 5.0));
    }

    #[test]
    fn test_from_key() {
        assert_eq!(ArrowKey::from_key("ArrowUp"), Some(ArrowKey::Up));
        assert_eq!(ArrowKey::from_key("Enter"), None);
    }
}
