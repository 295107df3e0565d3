//! Strap text normalization.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::limits::MAX_TEXT_CHARS;
use crate::StrapError;

/// The trademark glyph substituted for `(tm)`.
pub const TRADEMARK: char = '\u{2122}';

/// Forced casing applied to the strap text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Casing {
    /// Keep what was typed.
    #[default]
    AsIs,
    /// Force uppercase.
    Upper,
    /// Force lowercase.
    Lower,
}

impl Casing {
    /// Apply the casing to a string.
    #[must_use]
    pub fn apply(self, text: &str) -> String {
        match self {
            Self::AsIs => text.to_string(),
            Self::Upper => text.to_uppercase(),
            Self::Lower => text.to_lowercase(),
        }
    }
}

impl FromStr for Casing {
    type Err = StrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "as-is" | "asis" | "none" | "" => Ok(Self::AsIs),
            "upper" | "uppercase" => Ok(Self::Upper),
            "lower" | "lowercase" => Ok(Self::Lower),
            _ => Err(StrapError::InvalidChoice {
                field: "casing",
                value: s.to_string(),
            }),
        }
    }
}

/// Rewrite every `(tm)` token, in any case, to the trademark glyph.
#[must_use]
pub fn replace_trademark(text: &str) -> String {
    const TOKEN: &str = "(tm)";
    // ASCII lowercasing keeps byte offsets aligned with the original.
    let lowered = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (idx, _) in lowered.match_indices(TOKEN) {
        out.push_str(&text[last..idx]);
        out.push(TRADEMARK);
        last = idx + TOKEN.len();
    }
    out.push_str(&text[last..]);
    out
}

/// Cap the text at [`MAX_TEXT_CHARS`] characters.
#[must_use]
pub fn truncate(text: &str) -> String {
    text.chars().take(MAX_TEXT_CHARS).collect()
}

/// Full normalization: trademark rewrite, casing, then the length cap.
#[must_use]
pub fn normalize(text: &str, casing: Casing) -> String {
    let text = text.replace("\r\n", "\n");
    truncate(&casing.apply(&replace_trademark(&text)))
}
