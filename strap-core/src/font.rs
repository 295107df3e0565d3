//! The fixed typeface catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{StrapError, StrapResult};

/// A catalog entry: a display label and the CSS family stack used to render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FontFace {
    /// Display label, also the serialized identity of the face.
    pub label: &'static str,
    /// CSS `font-family` stack, most specific family first.
    pub stack: &'static str,
}

/// Every typeface a shopper can choose.
pub const FONT_CATALOG: &[FontFace] = &[
    // Hype / street
    FontFace { label: "Impact / Arial Black", stack: "Impact, 'Arial Black', system-ui, sans-serif" },
    FontFace { label: "Bebas Neue", stack: "'Bebas Neue', Impact, 'Arial Black', system-ui, sans-serif" },
    FontFace { label: "Anton", stack: "'Anton', Impact, 'Arial Black', system-ui, sans-serif" },
    FontFace { label: "League Gothic", stack: "'League Gothic', Impact, 'Arial Black', system-ui, sans-serif" },
    FontFace { label: "Staatliches", stack: "'Staatliches', Impact, 'Arial Black', system-ui, sans-serif" },
    FontFace { label: "Black Ops One", stack: "'Black Ops One', Impact, 'Arial Black', system-ui, sans-serif" },
    // Brand text
    FontFace { label: "Montserrat", stack: "'Montserrat', system-ui, sans-serif" },
    FontFace { label: "Open Sans", stack: "'Open Sans', system-ui, sans-serif" },
    FontFace { label: "Raleway", stack: "'Raleway', system-ui, sans-serif" },
    FontFace { label: "Sawarabi Gothic", stack: "'Sawarabi Gothic', system-ui, sans-serif" },
    FontFace { label: "Poppins", stack: "'Poppins', system-ui, sans-serif" },
    // Serif
    FontFace { label: "Playfair Display", stack: "'Playfair Display', serif" },
    FontFace { label: "Cinzel Decorative", stack: "'Cinzel Decorative', serif" },
    FontFace { label: "Prata", stack: "'Prata', serif" },
    // Script
    FontFace { label: "Great Vibes", stack: "'Great Vibes', cursive" },
    FontFace { label: "Pacifico", stack: "'Pacifico', cursive" },
    FontFace { label: "Tangerine", stack: "'Tangerine', cursive" },
    FontFace { label: "Hurricane", stack: "'Hurricane', cursive" },
    FontFace { label: "Petemoss", stack: "'Petemoss', cursive" },
    FontFace { label: "Ms Madi", stack: "'Ms Madi', cursive" },
    FontFace { label: "Kristi", stack: "'Kristi', cursive" },
    FontFace { label: "Clicker Script", stack: "'Clicker Script', cursive" },
    FontFace { label: "Delius Swash Caps", stack: "'Delius Swash Caps', cursive" },
    FontFace { label: "Norican", stack: "'Norican', cursive" },
];

/// Reference to a catalog typeface.
///
/// Always points at a valid catalog entry, so a draft can never carry an
/// empty or unknown font.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FontId(usize);

impl FontId {
    /// Look up a face by label (case-insensitive) or by its exact CSS stack.
    ///
    /// # Errors
    ///
    /// Returns [`StrapError::UnknownFont`] if nothing in the catalog matches.
    pub fn parse(input: &str) -> StrapResult<Self> {
        let needle = input.trim();
        FONT_CATALOG
            .iter()
            .position(|f| f.label.eq_ignore_ascii_case(needle) || f.stack == needle)
            .map(Self)
            .ok_or_else(|| StrapError::UnknownFont(input.to_string()))
    }

    /// The catalog entry.
    #[must_use]
    pub fn face(self) -> &'static FontFace {
        &FONT_CATALOG[self.0]
    }

    /// Display label.
    #[must_use]
    pub fn label(self) -> &'static str {
        self.face().label
    }

    /// CSS family stack.
    #[must_use]
    pub fn stack(self) -> &'static str {
        self.face().stack
    }

    /// Family names of the stack in preference order, quotes stripped.
    pub fn families(self) -> impl Iterator<Item = &'static str> {
        self.stack()
            .split(',')
            .map(|f| f.trim().trim_matches(|c| c == '\'' || c == '"'))
            .filter(|f| !f.is_empty())
    }
}

impl TryFrom<String> for FontId {
    type Error = StrapError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FontId> for String {
    fn from(id: FontId) -> Self {
        id.label().to_string()
    }
}

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_first_entry() {
        assert_eq!(FontId::default().label(), "Impact / Arial Black");
    }

    #[test]
    fn test_parse_by_label_and_stack() {
        let by_label = FontId::parse("pacifico").expect("label");
        assert_eq!(by_label.label(), "Pacifico");
        let by_stack = FontId::parse("'Pacifico', cursive").expect("stack");
        assert_eq!(by_label, by_stack);
        assert!(FontId::parse("Comic Sans").is_err());
        assert!(FontId::parse("").is_err());
    }

    #[test]
    fn test_families_strip_quotes() {
        let id = FontId::parse("Bebas Neue").expect("font");
        let families: Vec<_> = id.families().collect();
        assert_eq!(
            families,
            vec!["Bebas Neue", "Impact", "Arial Black", "system-ui", "sans-serif"]
        );
    }

    #[test]
    fn test_labels_are_unique() {
        for (i, a) in FONT_CATALOG.iter().enumerate() {
            for b in &FONT_CATALOG[i + 1..] {
                assert_ne!(a.label, b.label);
            }
        }
    }
}
