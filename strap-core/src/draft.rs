//! The draft: the complete design state of one editing session.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::limits::{self, pos_x_for_margin};
use crate::text::{self, Casing};
use crate::{Color, FontId, StrapError, StrapResult};

/// Which effect stage decorates the text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleMode {
    /// Raised, specular-lit lettering.
    #[default]
    #[serde(alias = "embossed")]
    Emboss,
    /// Plain lettering with a soft drop shadow.
    Flat,
}

impl StyleMode {
    /// Stable name of the mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emboss => "emboss",
            Self::Flat => "flat",
        }
    }
}

impl FromStr for StyleMode {
    type Err = StrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emboss" | "embossed" => Ok(Self::Emboss),
            "flat" => Ok(Self::Flat),
            _ => Err(StrapError::InvalidChoice {
                field: "styleMode",
                value: s.to_string(),
            }),
        }
    }
}

/// Horizontal text anchor relative to `posX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    /// Text starts at the anchor.
    Start,
    /// Text is centered on the anchor.
    #[default]
    Center,
    /// Text ends at the anchor.
    End,
}

impl Align {
    /// SVG `text-anchor` value.
    #[must_use]
    pub fn text_anchor(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Center => "middle",
            Self::End => "end",
        }
    }
}

impl FromStr for Align {
    type Err = StrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" | "left" => Ok(Self::Start),
            "center" | "middle" => Ok(Self::Center),
            "end" | "right" => Ok(Self::End),
            _ => Err(StrapError::InvalidChoice {
                field: "align",
                value: s.to_string(),
            }),
        }
    }
}

/// How a background image fills the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundFit {
    /// Scale to cover the canvas, cropping overflow.
    #[default]
    Cover,
    /// Scale to fit inside the canvas, letterboxing the rest.
    Contain,
}

impl FromStr for BackgroundFit {
    type Err = StrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cover" => Ok(Self::Cover),
            "contain" => Ok(Self::Contain),
            _ => Err(StrapError::InvalidChoice {
                field: "backgroundFit",
                value: s.to_string(),
            }),
        }
    }
}

/// Background behind the design: a solid color or an image reference.
///
/// Serialized as a single string. Anything that parses as a color is a color,
/// everything else is an image href (URL, path or data URI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Background {
    /// Solid fill.
    Color(Color),
    /// Image reference.
    Image(String),
}

impl Background {
    /// Classify a background reference string.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let s = input.trim();
        if s.is_empty() {
            return Self::default();
        }
        Color::parse(s).map_or_else(|_| Self::Image(s.to_string()), Self::Color)
    }

    /// Solid fill painted under everything, including under an image.
    #[must_use]
    pub fn fill(&self) -> Color {
        match self {
            Self::Color(c) => *c,
            Self::Image(_) => Color::BLACK,
        }
    }

    /// Image href, if this is an image background.
    #[must_use]
    pub fn image_href(&self) -> Option<&str> {
        match self {
            Self::Color(_) => None,
            Self::Image(href) => Some(href),
        }
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::Color(Color::BLACK)
    }
}

impl From<String> for Background {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Background> for String {
    fn from(bg: Background) -> Self {
        match bg {
            Background::Color(c) => c.to_hex(),
            Background::Image(href) => href,
        }
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color(c) => write!(f, "{c}"),
            Self::Image(href) => f.write_str(href),
        }
    }
}

/// The design state: text, typography, color, placement, curvature and
/// background.
///
/// Serializes to flat camelCase key/value JSON. Missing keys take their
/// defaults on deserialization; call [`Draft::normalized`] on external input
/// to re-establish the clamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Draft {
    /// Strap text; `\n` separates lines.
    pub text: String,
    /// Catalog typeface.
    pub font: FontId,
    /// Font size in px.
    pub font_size: f32,
    /// Font weight.
    pub font_weight: u16,
    /// Extra letter spacing in em.
    pub tracking: f32,
    /// Line height multiplier.
    pub line_height: f32,
    /// Text fill.
    pub fill: Color,
    /// Outline color, ignored when `stroke_width` is zero.
    pub stroke: Color,
    /// Outline width in px; zero disables the outline.
    pub stroke_width: f32,
    /// Effect stage.
    pub style_mode: StyleMode,
    /// Baseline bow in percent of canvas height.
    pub arc: f32,
    /// Horizontal anchor in percent.
    pub pos_x: f32,
    /// Vertical anchor in percent.
    pub pos_y: f32,
    /// Text anchor.
    pub align: Align,
    /// Safe margin in percent.
    pub safe_margin: f32,
    /// Background color or image.
    pub background_ref: Background,
    /// Fit mode for image backgrounds.
    pub background_fit: BackgroundFit,
    /// Strap band color; `None` leaves the band out.
    pub strap_color: Option<Color>,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            text: "SNAPINK".to_string(),
            font: FontId::default(),
            font_size: 240.0,
            font_weight: 400,
            tracking: 0.0,
            line_height: 1.0,
            fill: Color::WHITE,
            stroke: Color::BLACK,
            stroke_width: 0.0,
            style_mode: StyleMode::Emboss,
            arc: 0.0,
            pos_x: 50.0,
            pos_y: 50.0,
            align: Align::Center,
            safe_margin: 6.0,
            background_ref: Background::default(),
            background_fit: BackgroundFit::Cover,
            strap_color: None,
        }
    }
}

impl Draft {
    /// Parse a draft from JSON and normalize it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a color/font is invalid.
    pub fn from_json(json: &str) -> StrapResult<Self> {
        let draft: Self = serde_json::from_str(json)?;
        Ok(draft.normalized())
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> StrapResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Re-establish every clamp and the text normalization.
    ///
    /// Non-finite numbers fall back to their defaults.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn normalized(mut self) -> Self {
        let d = Self::default();
        self.text = text::normalize(&self.text, Casing::AsIs);
        self.font_size = limits::FONT_SIZE.clamp_or(self.font_size, d.font_size);
        self.font_weight =
            limits::FONT_WEIGHT.clamp(f32::from(self.font_weight)).round() as u16;
        self.tracking = limits::TRACKING.clamp_or(self.tracking, d.tracking);
        self.line_height = limits::LINE_HEIGHT.clamp_or(self.line_height, d.line_height);
        self.stroke_width = limits::STROKE_WIDTH.clamp_or(self.stroke_width, d.stroke_width);
        self.arc = limits::ARC.clamp_or(self.arc, d.arc);
        self.safe_margin = limits::SAFE_MARGIN.clamp_or(self.safe_margin, d.safe_margin);
        self.clamp_position();
        self
    }

    /// Re-clamp `pos_x`/`pos_y` against the current safe margin.
    pub fn clamp_position(&mut self) {
        self.pos_x = pos_x_for_margin(self.safe_margin).clamp_or(self.pos_x, 50.0);
        self.pos_y = limits::POS_Y.clamp_or(self.pos_y, 50.0);
    }

    /// Text lines, split on `\n`.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    /// Whether any line has visible content.
    #[must_use]
    pub fn has_text(&self) -> bool {
        self.lines().any(|l| !l.trim().is_empty())
    }

    /// Tracking converted to px at the current font size.
    #[must_use]
    pub fn tracking_px(&self) -> f32 {
        self.tracking * self.font_size
    }

    /// Whether an outline should be painted at all.
    #[must_use]
    pub fn has_stroke(&self) -> bool {
        self.stroke_width > 0.0
    }
}

/// Addressable draft fields, keyed by their serialized names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub enum DraftField {
    Text,
    Font,
    FontSize,
    FontWeight,
    Tracking,
    LineHeight,
    Fill,
    Stroke,
    StrokeWidth,
    StyleMode,
    Arc,
    PosX,
    PosY,
    Align,
    SafeMargin,
    BackgroundRef,
    BackgroundFit,
    StrapColor,
}

impl DraftField {
    /// Every field, in form order.
    pub const ALL: [Self; 18] = [
        Self::Text,
        Self::Font,
        Self::FontSize,
        Self::FontWeight,
        Self::Tracking,
        Self::LineHeight,
        Self::Fill,
        Self::Stroke,
        Self::StrokeWidth,
        Self::StyleMode,
        Self::Arc,
        Self::PosX,
        Self::PosY,
        Self::Align,
        Self::SafeMargin,
        Self::BackgroundRef,
        Self::BackgroundFit,
        Self::StrapColor,
    ];

    /// Serialized key of the field.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Font => "font",
            Self::FontSize => "fontSize",
            Self::FontWeight => "fontWeight",
            Self::Tracking => "tracking",
            Self::LineHeight => "lineHeight",
            Self::Fill => "fill",
            Self::Stroke => "stroke",
            Self::StrokeWidth => "strokeWidth",
            Self::StyleMode => "styleMode",
            Self::Arc => "arc",
            Self::PosX => "posX",
            Self::PosY => "posY",
            Self::Align => "align",
            Self::SafeMargin => "safeMargin",
            Self::BackgroundRef => "backgroundRef",
            Self::BackgroundFit => "backgroundFit",
            Self::StrapColor => "strapColor",
        }
    }
}

impl FromStr for DraftField {
    type Err = StrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.key() == s)
            .ok_or_else(|| StrapError::InvalidChoice {
                field: "field",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let d = Draft::default();
        assert_eq!(d.text, "SNAPINK");
        assert!((d.font_size - 240.0).abs() < f32::EPSILON);
        assert_eq!(d.fill, Color::WHITE);
        assert_eq!(d.style_mode, StyleMode::Emboss);
        assert_eq!(d.background_ref, Background::Color(Color::BLACK));
        assert!(!d.has_stroke());
    }

    #[test]
    fn test_serializes_flat_camel_case() {
        let value = serde_json::to_value(Draft::default()).expect("ser");
        let obj = value.as_object().expect("object");
        assert_eq!(obj.len(), DraftField::ALL.len());
        for field in DraftField::ALL {
            let v = obj.get(field.key()).expect("key present");
            assert!(!v.is_object() && !v.is_array(), "{field} is nested");
        }
        assert_eq!(obj["font"], "Impact / Arial Black");
        assert_eq!(obj["backgroundRef"], "#000000");
        assert_eq!(obj["styleMode"], "emboss");
        assert!(obj["strapColor"].is_null());
    }

    #[test]
    fn test_strap_color_round_trip() {
        let d = Draft::from_json(r##"{"strapColor":"#111111"}"##).expect("parse");
        assert_eq!(d.strap_color, Some(Color::rgb(0x11, 0x11, 0x11)));
        let back = Draft::from_json(&d.to_json().expect("ser")).expect("de");
        assert_eq!(back, d);
        assert!(Draft::from_json(r#"{"strapColor":"https://x"}"#).is_err());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let d = Draft::from_json(r#"{"text":"hi","styleMode":"embossed"}"#).expect("parse");
        assert_eq!(d.text, "hi");
        assert_eq!(d.style_mode, StyleMode::Emboss);
        assert!((d.pos_x - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_normalized_clamps() {
        let d = Draft {
            font_size: 9999.0,
            font_weight: 5,
            arc: -80.0,
            safe_margin: 12.0,
            pos_x: 1.0,
            pos_y: 130.0,
            tracking: f32::NAN,
            ..Draft::default()
        }
        .normalized();
        assert!((d.font_size - 500.0).abs() < f32::EPSILON);
        assert_eq!(d.font_weight, 100);
        assert!((d.arc + 20.0).abs() < f32::EPSILON);
        assert!((d.pos_x - 12.0).abs() < f32::EPSILON);
        assert!((d.pos_y - 100.0).abs() < f32::EPSILON);
        assert!(d.tracking.abs() < f32::EPSILON);
    }

    #[test]
    fn test_background_classification() {
        assert_eq!(
            Background::parse("#fff"),
            Background::Color(Color::WHITE)
        );
        assert_eq!(
            Background::parse(" https://cdn.example.com/hat.jpg "),
            Background::Image("https://cdn.example.com/hat.jpg".to_string())
        );
        assert_eq!(Background::parse(""), Background::default());
        assert_eq!(Background::parse("photo.png").fill(), Color::BLACK);
    }

    #[test]
    fn test_named_background_is_a_color() {
        for (name, color) in [
            ("orange", Color::rgb(255, 165, 0)),
            ("navy", Color::rgb(0, 0, 128)),
            ("purple", Color::rgb(128, 0, 128)),
            ("rebeccapurple", Color::rgb(0x66, 0x33, 0x99)),
            ("Silver", Color::rgb(192, 192, 192)),
        ] {
            let bg = Background::parse(name);
            assert_eq!(bg, Background::Color(color), "{name}");
            let draft = Draft {
                background_ref: bg,
                ..Draft::default()
            };
            assert_eq!(draft.background_ref.image_href(), None);
            let back = Draft::from_json(&draft.to_json().expect("ser")).expect("de");
            assert_eq!(back.background_ref, Background::Color(color));
        }
    }

    #[test]
    fn test_unknown_font_is_rejected() {
        assert!(Draft::from_json(r#"{"font":"Wingdings"}"#).is_err());
    }

    #[test]
    fn test_field_keys_round_trip() {
        for field in DraftField::ALL {
            assert_eq!(field.key().parse::<DraftField>().expect("key"), field);
        }
    }
}
