//! Order submission.
//!
//! An order is a draft snapshot plus contact details. It is formatted as a
//! plain-text email and handed to the mail relay; nothing is stored locally.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::SecondsFormat;
use serde_json::json;
use strap_core::OrderPayload;

use crate::mail::{MailMessage, MailSettings};
use crate::validation::{validate_customer_name, validate_email, ValidationError};
use crate::AppState;

/// Subject line of order emails.
pub const ORDER_SUBJECT: &str = "🧵 New SnapInk Strap Order";

/// Parse and validate an order body. The embedded draft is normalized.
///
/// # Errors
///
/// Returns [`ValidationError::Malformed`] if the body is not a valid order,
/// or the name/email error if contact details are unusable.
pub fn parse_order(body: &[u8]) -> Result<OrderPayload, ValidationError> {
    let text = std::str::from_utf8(body).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    let mut order =
        OrderPayload::from_json(text).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    order.customer_name = order.customer_name.trim().to_string();
    order.customer_email = order.customer_email.trim().to_string();
    validate_customer_name(&order.customer_name)?;
    validate_email(&order.customer_email)?;
    Ok(order)
}

/// Plain-text body of an order email.
///
/// # Errors
///
/// Returns an error if the draft cannot be serialized.
pub fn format_order(order: &OrderPayload) -> Result<String, serde_json::Error> {
    let draft = serde_json::to_string_pretty(&order.draft)?;
    Ok([
        "New SnapInk Custom Strap Order".to_string(),
        "-----------------------------------".to_string(),
        format!("Name: {}", order.customer_name),
        format!("Email: {}", order.customer_email),
        String::new(),
        "Draft:".to_string(),
        draft,
        String::new(),
        format!(
            "Submitted At: {}",
            order
                .submitted_at
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        ),
    ]
    .join("\n"))
}

/// The email announcing `order`.
///
/// # Errors
///
/// Returns an error if the draft cannot be serialized.
pub fn order_message(
    order: &OrderPayload,
    settings: &MailSettings,
) -> Result<MailMessage, serde_json::Error> {
    Ok(MailMessage {
        from: settings.from.clone(),
        from_name: None,
        to: vec![settings.order_recipient.clone()],
        reply_to: Some(order.customer_email.clone()),
        subject: ORDER_SUBJECT.to_string(),
        body: format_order(order)?,
    })
}

/// `POST /api/order`
#[tracing::instrument(name = "order_submit", skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let order = match parse_order(&body) {
        Ok(order) => order,
        Err(e) => {
            tracing::debug!("Order rejected: {}", e);
            crate::metrics::record_validation_failure(e.kind());
            crate::metrics::record_order("invalid");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            );
        }
    };

    let message = match order_message(&order, state.mailer.settings()) {
        Ok(message) => message,
        Err(e) => {
            tracing::error!("Failed to format order: {}", e);
            crate::metrics::record_order("failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            );
        }
    };

    if let Err(e) = state.mailer.send(&message).await {
        tracing::error!("Order relay failed: {}", e);
        crate::metrics::record_order("failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        );
    }

    crate::metrics::record_order("sent");
    tracing::info!(
        customer = %order.customer_email,
        submitted_at = %order.submitted_at,
        "Order relayed"
    );
    (StatusCode::OK, Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use strap_core::Draft;

    fn order() -> OrderPayload {
        let ts = Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 0)
            .single()
            .expect("ts");
        OrderPayload::at("Ada", "ada@example.com", Draft::default(), ts)
    }

    #[test]
    fn test_format_order() {
        let text = format_order(&order()).expect("format");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "New SnapInk Custom Strap Order");
        assert_eq!(lines[1], "-----------------------------------");
        assert_eq!(lines[2], "Name: Ada");
        assert_eq!(lines[3], "Email: ada@example.com");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "Draft:");
        assert_eq!(lines[6], "{");
        assert!(text.contains("\"text\": \"SNAPINK\""));
        assert!(text.ends_with("\n\nSubmitted At: 2024-05-01T12:30:00.000Z"));
    }

    #[test]
    fn test_order_message_addresses() {
        let msg = order_message(&order(), &MailSettings::default()).expect("message");
        assert_eq!(msg.to, vec!["orders@snapinkhats.com".to_string()]);
        assert_eq!(msg.from, "no-reply@snapinkhats.com");
        assert_eq!(msg.subject, ORDER_SUBJECT);
        assert_eq!(msg.reply_to.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_parse_order_round_trip() {
        let original = order();
        let json = original.to_json().expect("json");
        let parsed = parse_order(json.as_bytes()).expect("parse");
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_order_rejects_bad_contact() {
        let mut bad = order();
        bad.customer_email = "not-an-email".to_string();
        let json = bad.to_json().expect("json");
        assert_eq!(
            parse_order(json.as_bytes()),
            Err(ValidationError::EmailInvalid)
        );

        let mut blank = order();
        blank.customer_name = "  ".to_string();
        let json = blank.to_json().expect("json");
        assert_eq!(
            parse_order(json.as_bytes()),
            Err(ValidationError::NameMissing)
        );
    }

    #[test]
    fn test_parse_order_malformed() {
        assert!(matches!(
            parse_order(b"{\"customerName\":"),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            parse_order(&[0xff, 0xfe]),
            Err(ValidationError::Malformed(_))
        ));
    }
}
