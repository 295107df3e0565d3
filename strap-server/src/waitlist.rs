//! Waitlist signups.
//!
//! Signups are keyed by normalized email. The first record for an address is
//! kept; repeats succeed without touching it. With a data directory the whole
//! list is written to `waitlist.json` after every new signup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::mail::MailMessage;
use crate::validation::{normalize_email, validate_email};
use crate::AppState;

/// File the waitlist is persisted to inside the data directory.
pub const WAITLIST_FILE: &str = "waitlist.json";

/// Errors from the waitlist store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error occurred during persistence.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The persisted file could not be read or written as JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistRecord {
    /// Normalized email.
    pub email: String,
    /// When the address first signed up.
    pub ts: DateTime<Utc>,
    /// User agent of the first signup.
    #[serde(default)]
    pub ua: String,
    /// Client address of the first signup, if known.
    #[serde(default)]
    pub ip: String,
}

/// Thread-safe signup storage with optional filesystem persistence.
#[derive(Debug, Clone, Default)]
pub struct WaitlistStore {
    records: Arc<RwLock<BTreeMap<String, WaitlistRecord>>>,
    data_dir: Option<PathBuf>,
}

impl WaitlistStore {
    /// Create an in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store persisted under `data_dir`, loading any existing list.
    ///
    /// The directory is created if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created or the file
    /// cannot be read, and [`StoreError::Serialization`] if it is corrupt.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        let records = load(&data_dir.join(WAITLIST_FILE))?;
        tracing::info!(
            path = %data_dir.display(),
            count = records.len(),
            "Waitlist loaded"
        );
        Ok(Self {
            records: Arc::new(RwLock::new(records)),
            data_dir: Some(data_dir),
        })
    }

    /// Store a signup unless the address is already present.
    ///
    /// Returns `true` when the record was new.
    ///
    /// # Errors
    ///
    /// Returns an error if the updated list cannot be persisted. The record
    /// is not kept in that case.
    pub fn insert(&self, record: WaitlistRecord) -> Result<bool, StoreError> {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let key = normalize_email(&record.email);
        if records.contains_key(&key) {
            return Ok(false);
        }
        records.insert(key.clone(), record);

        if let Some(dir) = &self.data_dir {
            if let Err(e) = persist(&dir.join(WAITLIST_FILE), &records) {
                records.remove(&key);
                return Err(e);
            }
        }
        crate::metrics::set_waitlist_size(records.len());
        Ok(true)
    }

    /// Look up a signup by email, case-insensitively.
    #[must_use]
    pub fn get(&self, email: &str) -> Option<WaitlistRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize_email(email))
            .cloned()
    }

    /// Number of stored signups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Data directory, if persistent.
    #[must_use]
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Whether the store can accept writes.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        match &self.data_dir {
            Some(dir) => dir.is_dir(),
            None => true,
        }
    }
}

fn load(path: &Path) -> Result<BTreeMap<String, WaitlistRecord>, StoreError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let contents = std::fs::read_to_string(path)?;
    let list: Vec<WaitlistRecord> = serde_json::from_str(&contents)?;
    let mut records = BTreeMap::new();
    for record in list {
        records
            .entry(normalize_email(&record.email))
            .or_insert(record);
    }
    Ok(records)
}

/// Write via a temp file so a crash never leaves a truncated list.
fn persist(path: &Path, records: &BTreeMap<String, WaitlistRecord>) -> Result<(), StoreError> {
    let list: Vec<&WaitlistRecord> = records.values().collect();
    let json = serde_json::to_string_pretty(&list)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Pull the email out of a JSON or form-encoded body.
///
/// A JSON body that fails to parse counts as empty.
#[must_use]
pub fn extract_email(content_type: &str, body: &[u8]) -> String {
    let raw = if content_type.contains("application/json") {
        serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("email").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_default()
    } else {
        url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "email")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default()
    };
    normalize_email(&raw)
}

fn client_ip(headers: &HeaderMap) -> String {
    ["cf-connecting-ip", "x-forwarded-for", "x-real-ip"]
        .iter()
        .find_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

fn notification(record: &WaitlistRecord, state: &AppState) -> MailMessage {
    let settings = state.mailer.settings();
    MailMessage {
        from: settings.from.clone(),
        from_name: Some("SnapInk Waitlist".to_string()),
        to: vec![settings.waitlist_recipient.clone()],
        reply_to: Some(record.email.clone()),
        subject: "New waitlist signup".to_string(),
        body: format!(
            "New signup:\n\nEmail: {}\nTime: {}\nIP: {}\nUA: {}",
            record.email,
            record.ts.to_rfc3339_opts(SecondsFormat::Millis, true),
            record.ip,
            record.ua
        ),
    }
}

/// `POST /api/waitlist`
#[tracing::instrument(name = "waitlist_join", skip_all)]
pub async fn join(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let email = extract_email(content_type, &body);

    if let Err(e) = validate_email(&email) {
        tracing::debug!("Waitlist signup rejected: {}", e);
        crate::metrics::record_validation_failure(e.kind());
        crate::metrics::record_waitlist_signup("invalid");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "ok": false, "error": "Invalid email" })),
        );
    }

    let record = WaitlistRecord {
        email,
        ts: Utc::now(),
        ua: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        ip: client_ip(&headers),
    };

    let is_new = match state.waitlist.insert(record.clone()) {
        Ok(is_new) => is_new,
        Err(e) => {
            tracing::error!("Failed to store waitlist signup: {}", e);
            crate::metrics::record_waitlist_signup("error");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "ok": false, "error": "Server error" })),
            );
        }
    };

    if is_new {
        crate::metrics::record_waitlist_signup("new");
        tracing::info!(email = %record.email, "Waitlist signup stored");
        if let Err(e) = state.mailer.send(&notification(&record, &state)).await {
            tracing::warn!("Waitlist notification failed: {}", e);
        }
    } else {
        crate::metrics::record_waitlist_signup("duplicate");
        tracing::debug!(email = %record.email, "Waitlist signup already present");
    }

    (StatusCode::OK, Json(json!({ "ok": true })))
}

/// `GET /api/waitlist/count`
pub async fn count(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "count": state.waitlist.len() }))
}
