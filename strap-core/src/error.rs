//! Error types for strap design operations.

use thiserror::Error;

/// Result type for strap design operations.
pub type StrapResult<T> = Result<T, StrapError>;

/// Errors that can occur in strap design operations.
///
/// Interactive edits never surface these: the scene model recovers locally by
/// clamping or keeping the previous value. They appear when parsing external
/// data such as a serialized draft or an order payload.
#[derive(Debug, Error)]
pub enum StrapError {
    /// Font label is not part of the catalog.
    #[error("Unknown font: {0}")]
    UnknownFont(String),

    /// Color string could not be parsed.
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Numeric input could not be coerced.
    #[error("Invalid number for {field}: {value}")]
    InvalidNumber {
        /// Field that received the input.
        field: &'static str,
        /// Raw input.
        value: String,
    },

    /// Enumerated input did not match any known variant.
    #[error("Invalid value for {field}: {value}")]
    InvalidChoice {
        /// Field that received the input.
        field: &'static str,
        /// Raw input.
        value: String,
    },

    /// Draft serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
