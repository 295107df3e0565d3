//! Input validation for untrusted data.
//!
//! Everything a shopper types into the order or waitlist forms passes through
//! here before it is stored or mailed anywhere.

use thiserror::Error;

/// Maximum length for an email address (RFC 5321 path limit).
pub const MAX_EMAIL_LEN: usize = 254;
/// Maximum length for a customer name.
pub const MAX_NAME_LEN: usize = 200;
/// Maximum size of a JSON request body.
pub const MAX_BODY_BYTES: usize = 262_144; // 256KB, drafts are small

/// Validation error types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Email address is malformed.
    #[error("Invalid email")]
    EmailInvalid,
    /// Email address exceeds maximum length.
    #[error("email too long (max {MAX_EMAIL_LEN} chars)")]
    EmailTooLong,
    /// Customer name is empty.
    #[error("customer name is required")]
    NameMissing,
    /// Customer name exceeds maximum length.
    #[error("customer name too long (max {MAX_NAME_LEN} chars)")]
    NameTooLong,
    /// Request body could not be parsed.
    #[error("malformed request body: {0}")]
    Malformed(String),
}

impl ValidationError {
    /// Short label used for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EmailInvalid | Self::EmailTooLong => "email",
            Self::NameMissing | Self::NameTooLong => "name",
            Self::Malformed(_) => "body",
        }
    }
}

/// Trim and lowercase an email address.
#[must_use]
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Validate an email address.
///
/// Accepts `local@domain.tld`: no whitespace, exactly one `@`, and a dot in
/// the domain with at least one character on either side of it.
///
/// # Errors
///
/// Returns [`ValidationError::EmailTooLong`] if the address exceeds 254 chars.
/// Returns [`ValidationError::EmailInvalid`] if the address is malformed.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > MAX_EMAIL_LEN {
        return Err(ValidationError::EmailTooLong);
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::EmailInvalid);
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::EmailInvalid);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::EmailInvalid);
    }
    let dotted = domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len());
    if !dotted {
        return Err(ValidationError::EmailInvalid);
    }
    Ok(())
}

/// Validate a customer name. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`ValidationError::NameMissing`] if the name is blank.
/// Returns [`ValidationError::NameTooLong`] if the name exceeds 200 chars.
pub fn validate_customer_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::NameMissing);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("a.b+c@mail.example.co.uk").is_ok());
        assert!(validate_email("x@y.z").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        for email in [
            "",
            "ada",
            "ada@",
            "@example.com",
            "ada@example",
            "ada@.com",
            "ada@example.",
            "ada@@example.com",
            "ada@exa@mple.com",
            "ada lovelace@example.com",
            "ada@example.com\n",
        ] {
            assert_eq!(
                validate_email(email),
                Err(ValidationError::EmailInvalid),
                "{email:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_email_too_long() {
        let email = format!("{}@example.com", "a".repeat(MAX_EMAIL_LEN));
        assert_eq!(validate_email(&email), Err(ValidationError::EmailTooLong));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM \t"), "ada@example.com");
    }

    #[test]
    fn test_customer_name() {
        assert!(validate_customer_name("Ada").is_ok());
        assert_eq!(validate_customer_name("   "), Err(ValidationError::NameMissing));
        assert_eq!(
            validate_customer_name(&"x".repeat(MAX_NAME_LEN + 1)),
            Err(ValidationError::NameTooLong)
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(ValidationError::EmailInvalid.kind(), "email");
        assert_eq!(ValidationError::NameMissing.kind(), "name");
        assert_eq!(ValidationError::Malformed("x".into()).kind(), "body");
    }

    proptest! {
        #[test]
        fn prop_well_formed_emails_accepted(
            local in "[a-z0-9._+-]{1,20}",
            host in "[a-z0-9-]{1,20}",
            tld in "[a-z]{2,6}",
        ) {
            let email = format!("{local}@{host}.{tld}");
            prop_assert!(validate_email(&email).is_ok());
        }

        #[test]
        fn prop_whitespace_always_rejected(
            head in "[a-z]{1,10}",
            tail in "[a-z]{1,10}",
            ws in prop::sample::select(vec![' ', '\t', '\n']),
        ) {
            let email = format!("{head}{ws}{tail}@example.com");
            prop_assert!(validate_email(&email).is_err());
        }

        #[test]
        fn prop_normalized_is_idempotent(raw in "[ \\tA-Za-z0-9@.]{0,40}") {
            let once = normalize_email(&raw);
            prop_assert_eq!(normalize_email(&once), once.clone());
        }
    }
}
