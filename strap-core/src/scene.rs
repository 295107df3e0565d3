//! The scene model: owner of the draft and its single mutation entry point.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event::Nudge;
use crate::layout::{compute_layout, LayoutResult, CANVAS_HEIGHT, CANVAS_WIDTH};
use crate::limits::{self, pos_x_for_margin};
use crate::text::{self, Casing};
use crate::{
    Align, Background, BackgroundFit, Color, Draft, DraftField, FontId, OrderPayload,
    StrapError, StrapResult, StyleMode,
};

/// A change to one draft field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
#[allow(missing_docs)]
pub enum DraftUpdate {
    Text(String),
    Font(FontId),
    FontSize(f32),
    FontWeight(u16),
    Tracking(f32),
    LineHeight(f32),
    Fill(Color),
    Stroke(Color),
    StrokeWidth(f32),
    StyleMode(StyleMode),
    Arc(f32),
    PosX(f32),
    PosY(f32),
    Align(Align),
    SafeMargin(f32),
    BackgroundRef(Background),
    BackgroundFit(BackgroundFit),
    StrapColor(Option<Color>),
}

impl DraftUpdate {
    /// Coerce raw form input for `field` into an update.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be coerced to the field's type.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn parse(field: DraftField, raw: &str) -> StrapResult<Self> {
        let number = |name: &'static str| -> StrapResult<f32> {
            raw.trim()
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| StrapError::InvalidNumber {
                    field: name,
                    value: raw.to_string(),
                })
        };
        Ok(match field {
            DraftField::Text => Self::Text(raw.to_string()),
            DraftField::Font => Self::Font(FontId::parse(raw)?),
            DraftField::FontSize => Self::FontSize(number(field.key())?),
            DraftField::FontWeight => {
                Self::FontWeight(limits::FONT_WEIGHT.clamp(number(field.key())?).round() as u16)
            }
            DraftField::Tracking => Self::Tracking(number(field.key())?),
            DraftField::LineHeight => Self::LineHeight(number(field.key())?),
            DraftField::Fill => Self::Fill(Color::parse(raw)?),
            DraftField::Stroke => Self::Stroke(Color::parse(raw)?),
            DraftField::StrokeWidth => Self::StrokeWidth(number(field.key())?),
            DraftField::StyleMode => Self::StyleMode(raw.parse()?),
            DraftField::Arc => Self::Arc(number(field.key())?),
            DraftField::PosX => Self::PosX(number(field.key())?),
            DraftField::PosY => Self::PosY(number(field.key())?),
            DraftField::Align => Self::Align(raw.parse()?),
            DraftField::SafeMargin => Self::SafeMargin(number(field.key())?),
            DraftField::BackgroundRef => Self::BackgroundRef(Background::parse(raw)),
            DraftField::BackgroundFit => Self::BackgroundFit(raw.parse()?),
            DraftField::StrapColor => match raw.trim() {
                "" | "none" => Self::StrapColor(None),
                color => Self::StrapColor(Some(Color::parse(color)?)),
            },
        })
    }

    /// The field this update targets.
    #[must_use]
    pub fn field(&self) -> DraftField {
        match self {
            Self::Text(_) => DraftField::Text,
            Self::Font(_) => DraftField::Font,
            Self::FontSize(_) => DraftField::FontSize,
            Self::FontWeight(_) => DraftField::FontWeight,
            Self::Tracking(_) => DraftField::Tracking,
            Self::LineHeight(_) => DraftField::LineHeight,
            Self::Fill(_) => DraftField::Fill,
            Self::Stroke(_) => DraftField::Stroke,
            Self::StrokeWidth(_) => DraftField::StrokeWidth,
            Self::StyleMode(_) => DraftField::StyleMode,
            Self::Arc(_) => DraftField::Arc,
            Self::PosX(_) => DraftField::PosX,
            Self::PosY(_) => DraftField::PosY,
            Self::Align(_) => DraftField::Align,
            Self::SafeMargin(_) => DraftField::SafeMargin,
            Self::BackgroundRef(_) => DraftField::BackgroundRef,
            Self::BackgroundFit(_) => DraftField::BackgroundFit,
            Self::StrapColor(_) => DraftField::StrapColor,
        }
    }
}

/// Handle returned by [`Scene::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&Draft) + Send>;

/// Holds the current draft and notifies listeners on every change.
///
/// All edits go through [`Scene::apply`]. Invalid input never reaches the
/// draft: numbers are clamped, non-finite numbers and unparseable strings keep
/// the previous value.
pub struct Scene {
    draft: Draft,
    /// Text as typed, after trademark rewriting but before casing.
    typed: String,
    casing: Casing,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("draft", &self.draft)
            .field("casing", &self.casing)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Draft::default())
    }
}

impl Scene {
    /// Create a scene around a draft; the draft is normalized first.
    #[must_use]
    pub fn new(draft: Draft) -> Self {
        let draft = draft.normalized();
        Self {
            typed: draft.text.clone(),
            draft,
            casing: Casing::AsIs,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// The current draft.
    #[must_use]
    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Active casing mode.
    #[must_use]
    pub fn casing(&self) -> Casing {
        self.casing
    }

    /// Layout of the current draft on the logical canvas.
    #[must_use]
    pub fn layout(&self) -> LayoutResult {
        compute_layout(&self.draft, CANVAS_WIDTH, CANVAS_HEIGHT)
    }

    /// Whether the longest line exceeds the auto-fit estimate.
    #[must_use]
    pub fn over_capacity(&self) -> bool {
        self.layout().over_capacity()
    }

    /// Register a listener called after every change.
    pub fn subscribe<F>(&mut self, listener: F) -> ListenerId
    where
        F: FnMut(&Draft) + Send + 'static,
    {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Apply an update. Returns whether the draft changed.
    pub fn apply(&mut self, update: DraftUpdate) -> bool {
        let field = update.field();
        let mut next = self.draft.clone();
        let mut typed = None;

        match update {
            DraftUpdate::Text(raw) => {
                let t = text::truncate(&text::replace_trademark(&raw.replace("\r\n", "\n")));
                next.text = text::normalize(&t, self.casing);
                typed = Some(t);
            }
            DraftUpdate::Font(font) => next.font = font,
            DraftUpdate::FontSize(v) => {
                next.font_size = limits::FONT_SIZE.clamp_or(v, next.font_size);
            }
            DraftUpdate::FontWeight(v) => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let w = limits::FONT_WEIGHT.clamp(f32::from(v)).round() as u16;
                next.font_weight = w;
            }
            DraftUpdate::Tracking(v) => {
                next.tracking = limits::TRACKING.clamp_or(v, next.tracking);
            }
            DraftUpdate::LineHeight(v) => {
                next.line_height = limits::LINE_HEIGHT.clamp_or(v, next.line_height);
            }
            DraftUpdate::Fill(c) => next.fill = c,
            DraftUpdate::Stroke(c) => next.stroke = c,
            DraftUpdate::StrokeWidth(v) => {
                next.stroke_width = limits::STROKE_WIDTH.clamp_or(v, next.stroke_width);
            }
            DraftUpdate::StyleMode(m) => next.style_mode = m,
            DraftUpdate::Arc(v) => next.arc = limits::ARC.clamp_or(v, next.arc),
            DraftUpdate::PosX(v) => {
                next.pos_x = pos_x_for_margin(next.safe_margin).clamp_or(v, next.pos_x);
            }
            DraftUpdate::PosY(v) => next.pos_y = limits::POS_Y.clamp_or(v, next.pos_y),
            DraftUpdate::Align(a) => next.align = a,
            DraftUpdate::SafeMargin(v) => {
                next.safe_margin = limits::SAFE_MARGIN.clamp_or(v, next.safe_margin);
                next.clamp_position();
            }
            DraftUpdate::BackgroundRef(bg) => next.background_ref = bg,
            DraftUpdate::BackgroundFit(fit) => next.background_fit = fit,
            DraftUpdate::StrapColor(color) => next.strap_color = color,
        }

        if let Some(t) = typed {
            self.typed = t;
        }
        self.commit(field.key(), next)
    }

    /// Coerce and apply raw form input. Input that cannot be coerced leaves
    /// the draft untouched.
    pub fn apply_input(&mut self, field: DraftField, raw: &str) -> bool {
        match DraftUpdate::parse(field, raw) {
            Ok(update) => self.apply(update),
            Err(e) => {
                debug!("Ignoring input for {}: {}", field, e);
                false
            }
        }
    }

    /// Change the casing mode and re-normalize the text.
    pub fn set_casing(&mut self, casing: Casing) -> bool {
        self.casing = casing;
        let mut next = self.draft.clone();
        next.text = text::normalize(&self.typed, casing);
        self.commit("casing", next)
    }

    /// Move the anchor by an arrow-key nudge, re-clamped.
    pub fn nudge(&mut self, nudge: Nudge) -> bool {
        let (dx, dy) = nudge.delta();
        let mut next = self.draft.clone();
        next.pos_x += dx;
        next.pos_y += dy;
        next.clamp_position();
        self.commit("nudge", next)
    }

    /// Reset the anchor to the canvas center.
    pub fn center_text(&mut self) -> bool {
        let mut next = self.draft.clone();
        next.pos_x = 50.0;
        next.pos_y = 50.0;
        next.clamp_position();
        self.commit("center", next)
    }

    /// Replace the whole draft, e.g. when rehydrating a saved design.
    pub fn replace(&mut self, draft: Draft) -> bool {
        let next = draft.normalized();
        self.typed = next.text.clone();
        let mut next = next;
        next.text = text::normalize(&self.typed, self.casing);
        self.commit("replace", next)
    }

    /// Snapshot the draft into an order payload.
    #[must_use]
    pub fn snapshot_order(&self, customer_name: &str, customer_email: &str) -> OrderPayload {
        OrderPayload::new(customer_name.trim(), customer_email.trim(), self.draft.clone())
    }

    fn commit(&mut self, what: &str, next: Draft) -> bool {
        if next == self.draft {
            return false;
        }
        self.draft = next;
        debug!("Draft updated ({})", what);
        for (_, listener) in &mut self.listeners {
            listener(&self.draft);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ArrowKey;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_text_normalization_on_edit() {
        let mut scene = Scene::default();
        assert!(scene.apply(DraftUpdate::Text("snap(TM) strap".to_string())));
        assert_eq!(scene.draft().text, "snap™ strap");
    }

    #[test]
    fn test_casing_is_reversible() {
        let mut scene = Scene::default();
        scene.apply(DraftUpdate::Text("Crew(tm)".to_string()));
        scene.set_casing(Casing::Upper);
        assert_eq!(scene.draft().text, "CREW™");
        scene.set_casing(Casing::AsIs);
        assert_eq!(scene.draft().text, "Crew™");
    }

    #[test]
    fn test_invalid_number_keeps_previous() {
        let mut scene = Scene::default();
        assert!(!scene.apply_input(DraftField::FontSize, "huge"));
        assert!(!scene.apply_input(DraftField::FontSize, "NaN"));
        assert!((scene.draft().font_size - 240.0).abs() < f32::EPSILON);
        assert!(!scene.apply(DraftUpdate::Arc(f32::INFINITY)));
        assert!(scene.apply_input(DraftField::FontSize, " 80 "));
        assert!((scene.draft().font_size - 80.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_safe_margin_reclamps_position() {
        let mut scene = Scene::default();
        scene.apply(DraftUpdate::PosX(2.0));
        assert!((scene.draft().pos_x - 6.0).abs() < f32::EPSILON);
        scene.apply(DraftUpdate::SafeMargin(0.0));
        scene.apply(DraftUpdate::PosX(2.0));
        assert!((scene.draft().pos_x - 2.0).abs() < f32::EPSILON);
        scene.apply(DraftUpdate::SafeMargin(12.0));
        assert!((scene.draft().pos_x - 12.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_listeners_only_on_change() {
        let mut scene = Scene::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let id = scene.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        scene.apply(DraftUpdate::Arc(5.0));
        scene.apply(DraftUpdate::Arc(5.0));
        scene.apply_input(DraftField::Fill, "not a color");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(scene.unsubscribe(id));
        scene.apply(DraftUpdate::Arc(6.0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!scene.unsubscribe(id));
    }

    #[test]
    fn test_nudges_clamp() {
        let mut scene = Scene::default();
        scene.nudge(Nudge::new(ArrowKey::Right, false));
        assert!((scene.draft().pos_x - 50.5).abs() < f32::EPSILON);
        for _ in 0..20 {
            scene.nudge(Nudge::new(ArrowKey::Right, true));
        }
        assert!((scene.draft().pos_x - 94.0).abs() < f32::EPSILON);
        for _ in 0..20 {
            scene.nudge(Nudge::new(ArrowKey::Up, true));
        }
        assert!(scene.draft().pos_y.abs() < f32::EPSILON);
        assert!(scene.center_text());
        assert!((scene.draft().pos_y - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_apply_input_parses_choices() {
        let mut scene = Scene::default();
        assert!(scene.apply_input(DraftField::StyleMode, "flat"));
        assert!(scene.apply_input(DraftField::Align, "end"));
        assert!(scene.apply_input(DraftField::Font, "Pacifico"));
        assert!(scene.apply_input(DraftField::BackgroundRef, "https://x.test/bg.jpg"));
        assert!(!scene.apply_input(DraftField::Align, "justify"));
        assert_eq!(scene.draft().style_mode, StyleMode::Flat);
        assert_eq!(scene.draft().align, Align::End);
        assert!(scene.draft().background_ref.image_href().is_some());
    }

    #[test]
    fn test_named_colors_accepted() {
        let mut scene = Scene::default();
        assert!(scene.apply_input(DraftField::Fill, "orange"));
        assert_eq!(scene.draft().fill, Color::rgb(255, 165, 0));
        assert!(scene.apply_input(DraftField::BackgroundRef, "navy"));
        assert_eq!(
            scene.draft().background_ref,
            Background::Color(Color::rgb(0, 0, 128))
        );
    }

    #[test]
    fn test_strap_color_input() {
        let mut scene = Scene::default();
        assert!(scene.apply_input(DraftField::StrapColor, "#111111"));
        assert_eq!(scene.draft().strap_color, Some(Color::rgb(17, 17, 17)));
        assert!(!scene.apply_input(DraftField::StrapColor, "plaid"));
        assert!(scene.apply_input(DraftField::StrapColor, ""));
        assert_eq!(scene.draft().strap_color, None);
    }

    #[test]
    fn test_snapshot_order_trims_contact() {
        let scene = Scene::default();
        let order = scene.snapshot_order("  Ada ", " ada@example.com ");
        assert_eq!(order.customer_name, "Ada");
        assert_eq!(order.customer_email, "ada@example.com");
        assert_eq!(&order.draft, scene.draft());
    }
}
