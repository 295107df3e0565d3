//! Order payload handed to the order-submission collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Draft, StrapResult};

/// A draft snapshot together with the customer's contact details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    /// Customer name as typed.
    pub customer_name: String,
    /// Customer email as typed.
    pub customer_email: String,
    /// The design being ordered.
    pub draft: Draft,
    /// Submission time, ISO-8601 in UTC.
    pub submitted_at: DateTime<Utc>,
}

impl OrderPayload {
    /// Snapshot a draft now.
    #[must_use]
    pub fn new(customer_name: impl Into<String>, customer_email: impl Into<String>, draft: Draft) -> Self {
        Self::at(customer_name, customer_email, draft, Utc::now())
    }

    /// Snapshot a draft with an explicit timestamp.
    #[must_use]
    pub fn at(
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
        draft: Draft,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            draft,
            submitted_at,
        }
    }

    /// Serialize to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> StrapResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON; the embedded draft is normalized.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the draft is invalid.
    pub fn from_json(json: &str) -> StrapResult<Self> {
        let mut payload: Self = serde_json::from_str(json)?;
        payload.draft = payload.draft.normalized();
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_round_trip_preserves_draft() {
        let draft = Draft {
            text: "CREW\nLOVE".to_string(),
            arc: -12.0,
            stroke_width: 3.5,
            ..Draft::default()
        };
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).single().expect("ts");
        let order = OrderPayload::at("Ada", "ada@example.com", draft.clone(), ts);
        let json = order.to_json().expect("ser");
        assert!(json.contains("\"submittedAt\":\"2024-05-01T12:30:00Z\""));
        assert!(json.contains("\"customerName\":\"Ada\""));
        let back = OrderPayload::from_json(&json).expect("de");
        assert_eq!(back, order);
        assert_eq!(back.draft, draft);
    }
}
