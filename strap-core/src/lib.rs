//! # Strap Core
//!
//! Design state and geometry for the custom strap designer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 strap-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Scene Model      │  Layout Engine          │
//! │  - Draft          │  - Safe-area guides     │
//! │  - Normalization  │  - Arc path             │
//! │  - Listeners      │  - Line placement       │
//! │  - Nudges         │  - Auto-fit capacity    │
//! ├─────────────────────────────────────────────┤
//! │  Catalogs         │  Order payload          │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Preview and export both call [`compute_layout`] on the same [`Draft`], so
//! the two never disagree about where anything goes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod color;
pub mod draft;
pub mod error;
pub mod event;
pub mod font;
pub mod geometry;
pub mod glyph;
pub mod layout;
pub mod limits;
pub mod order;
pub mod scene;
pub mod text;

pub use color::{Color, Swatch, SWATCHES};
pub use draft::{Align, Background, BackgroundFit, Draft, DraftField, StyleMode};
pub use error::{StrapError, StrapResult};
pub use event::{ArrowKey, Nudge};
pub use font::{FontFace, FontId, FONT_CATALOG};
pub use geometry::{Point, QuadCurve, Rect, Segment};
pub use glyph::{GlyphMetrics, HeuristicMetrics};
pub use layout::{
    compute_layout, GlyphPlacement, LayoutResult, StrapBand, TextAnchor, TextPlacement,
    CANVAS_HEIGHT, CANVAS_WIDTH,
};
pub use limits::{Bounds, DraftLimits, LIMITS};
pub use order::OrderPayload;
pub use scene::{DraftUpdate, ListenerId, Scene};
pub use text::Casing;

/// Strap core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
