//! Outbound mail relay.
//!
//! Orders and waitlist signups are announced by posting a JSON message to an
//! HTTP mail relay (MailChannels-compatible body). The relay is a trait so the
//! server can run without one and tests can swap it out.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Errors from the mail relay.
#[derive(Debug, Error)]
pub enum MailError {
    /// No relay endpoint was configured.
    #[error("mail relay not configured")]
    NotConfigured,
    /// The request never got a response.
    #[error("mail relay request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The relay answered with a non-success status.
    #[error("mail relay rejected message ({status}): {body}")]
    Rejected {
        /// HTTP status returned by the relay.
        status: u16,
        /// Response body, truncated.
        body: String,
    },
}

/// A plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    /// Sender address.
    pub from: String,
    /// Optional sender display name.
    pub from_name: Option<String>,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Reply-to address.
    pub reply_to: Option<String>,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

#[derive(Serialize)]
struct RelayBody<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    reply_to: Vec<Address<'a>>,
    content: Vec<Content<'a>>,
}

impl MailMessage {
    /// The JSON body posted to the relay.
    #[must_use]
    pub fn to_relay_json(&self) -> serde_json::Value {
        let body = RelayBody {
            personalizations: vec![Personalization {
                to: self
                    .to
                    .iter()
                    .map(|email| Address {
                        email: email.as_str(),
                        name: None,
                    })
                    .collect(),
            }],
            from: Address {
                email: &self.from,
                name: self.from_name.as_deref(),
            },
            subject: &self.subject,
            reply_to: self
                .reply_to
                .iter()
                .map(|email| Address {
                    email: email.as_str(),
                    name: Some(email.as_str()),
                })
                .collect(),
            content: vec![Content {
                kind: "text/plain",
                value: &self.body,
            }],
        };
        serde_json::to_value(body).unwrap_or(serde_json::Value::Null)
    }
}

/// Something that can deliver mail.
#[async_trait]
pub trait MailRelay: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handed off.
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Relay used when no endpoint is configured. Every send fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRelay;

#[async_trait]
impl MailRelay for DisabledRelay {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        tracing::warn!(subject = %message.subject, "Mail relay disabled, message dropped");
        Err(MailError::NotConfigured)
    }
}

/// Posts messages to an HTTP relay endpoint.
#[derive(Debug, Clone)]
pub struct HttpMailRelay {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpMailRelay {
    /// Create a relay for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(endpoint: Url, timeout: Option<Duration>) -> Result<Self, MailError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint,
        })
    }

    /// The relay endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl MailRelay for HttpMailRelay {
    #[tracing::instrument(name = "mail_send", skip(self, message), fields(subject = %message.subject))]
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&message.to_relay_json())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(512)
                .collect();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(status = status.as_u16(), "Mail relayed");
        Ok(())
    }
}

/// Addresses used for outbound notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    /// Sender address.
    pub from: String,
    /// Recipient of order emails.
    pub order_recipient: String,
    /// Recipient of waitlist notifications.
    pub waitlist_recipient: String,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            from: "no-reply@snapinkhats.com".to_string(),
            order_recipient: "orders@snapinkhats.com".to_string(),
            waitlist_recipient: "earlyaccess@snapinkhats.com".to_string(),
        }
    }
}

/// A relay plus the addresses it sends from and to.
#[derive(Clone)]
pub struct Mailer {
    relay: Arc<dyn MailRelay>,
    settings: MailSettings,
    enabled: bool,
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("settings", &self.settings)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl Mailer {
    /// Create a mailer.
    #[must_use]
    pub fn new(relay: Arc<dyn MailRelay>, settings: MailSettings) -> Self {
        Self {
            relay,
            settings,
            enabled: true,
        }
    }

    /// A mailer whose sends always fail.
    #[must_use]
    pub fn disabled(settings: MailSettings) -> Self {
        Self {
            enabled: false,
            ..Self::new(Arc::new(DisabledRelay), settings)
        }
    }

    /// Whether a real relay is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Configured addresses.
    #[must_use]
    pub fn settings(&self) -> &MailSettings {
        &self.settings
    }

    /// Deliver a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay fails.
    pub async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let result = self.relay.send(message).await;
        crate::metrics::record_mail(result.is_ok());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> MailMessage {
        MailMessage {
            from: "noreply@snapinkhats.com".to_string(),
            from_name: Some("SnapInk Waitlist".to_string()),
            to: vec!["earlyaccess@snapinkhats.com".to_string()],
            reply_to: Some("ada@example.com".to_string()),
            subject: "New waitlist signup".to_string(),
            body: "New signup".to_string(),
        }
    }

    #[test]
    fn test_relay_json_shape() {
        let json = message().to_relay_json();
        assert_eq!(
            json["personalizations"][0]["to"][0]["email"],
            "earlyaccess@snapinkhats.com"
        );
        assert_eq!(json["from"]["email"], "noreply@snapinkhats.com");
        assert_eq!(json["from"]["name"], "SnapInk Waitlist");
        assert_eq!(json["reply_to"][0]["email"], "ada@example.com");
        assert_eq!(json["content"][0]["type"], "text/plain");
        assert_eq!(json["content"][0]["value"], "New signup");
    }

    #[test]
    fn test_relay_json_omits_optional_fields() {
        let msg = MailMessage {
            from_name: None,
            reply_to: None,
            ..message()
        };
        let json = msg.to_relay_json();
        assert!(json["from"].get("name").is_none());
        assert!(json.get("reply_to").is_none());
    }

    #[tokio::test]
    async fn test_disabled_relay_fails() {
        let mailer = Mailer::disabled(MailSettings::default());
        assert!(!mailer.is_enabled());
        assert!(matches!(
            mailer.send(&message()).await,
            Err(MailError::NotConfigured)
        ));
    }

    #[test]
    fn test_default_settings() {
        let settings = MailSettings::default();
        assert_eq!(settings.order_recipient, "orders@snapinkhats.com");
        assert_eq!(settings.from, "no-reply@snapinkhats.com");
    }
}
