//! Prometheus metrics for strap-server.
//!
//! Provides metrics collection and a Prometheus-compatible `/metrics` endpoint.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// Metric names as constants for consistency
const HTTP_REQUESTS_TOTAL: &str = "strap_http_requests_total";
const HTTP_REQUEST_DURATION: &str = "strap_http_request_duration_seconds";
const EXPORTS_TOTAL: &str = "strap_exports_total";
const EXPORT_DURATION: &str = "strap_export_duration_seconds";
const EXPORT_BYTES: &str = "strap_export_bytes";
const PREVIEWS_TOTAL: &str = "strap_previews_total";
const ORDERS_TOTAL: &str = "strap_orders_total";
const WAITLIST_SIGNUPS_TOTAL: &str = "strap_waitlist_signups_total";
const WAITLIST_SIZE: &str = "strap_waitlist_size";
const MAIL_SENDS_TOTAL: &str = "strap_mail_sends_total";
const VALIDATION_FAILURES_TOTAL: &str = "strap_validation_failures_total";

/// Initialize metrics and return the Prometheus handle.
///
/// # Errors
///
/// Returns an error if the Prometheus recorder cannot be installed
/// (e.g., if another recorder is already installed).
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Record an HTTP request.
///
/// # Arguments
///
/// * `method` - HTTP method (GET, POST, etc.)
/// * `path` - Matched route
/// * `status` - HTTP status code
/// * `duration_secs` - Request duration in seconds
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        HTTP_REQUEST_DURATION,
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

/// Record a finished export.
///
/// # Arguments
///
/// * `scale` - Scale the export was rendered at
/// * `bytes` - Encoded PNG size
/// * `duration_secs` - Time spent resolving and rendering
#[allow(clippy::cast_precision_loss)]
pub fn record_export(scale: u32, bytes: usize, duration_secs: f64) {
    counter!(EXPORTS_TOTAL, "scale" => scale.to_string()).increment(1);
    histogram!(EXPORT_DURATION).record(duration_secs);
    histogram!(EXPORT_BYTES).record(bytes as f64);
}

/// Record a rendered preview.
pub fn record_preview(guides: bool) {
    counter!(PREVIEWS_TOTAL, "guides" => guides.to_string()).increment(1);
}

/// Record an order submission.
///
/// # Arguments
///
/// * `outcome` - "sent", "invalid" or "failed"
pub fn record_order(outcome: &'static str) {
    counter!(ORDERS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a waitlist signup attempt.
///
/// # Arguments
///
/// * `outcome` - "new", "duplicate", "invalid" or "error"
pub fn record_waitlist_signup(outcome: &'static str) {
    counter!(WAITLIST_SIGNUPS_TOTAL, "outcome" => outcome).increment(1);
}

/// Update the stored waitlist size.
#[allow(clippy::cast_precision_loss)]
pub fn set_waitlist_size(count: usize) {
    gauge!(WAITLIST_SIZE).set(count as f64);
}

/// Record a mail relay send.
pub fn record_mail(success: bool) {
    counter!(MAIL_SENDS_TOTAL, "success" => success.to_string()).increment(1);
}

/// Record an input validation failure.
///
/// # Arguments
///
/// * `validation_type` - Type of validation that failed (email, name, body)
pub fn record_validation_failure(validation_type: &str) {
    counter!(
        VALIDATION_FAILURES_TOTAL,
        "type" => validation_type.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_are_rendered() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            record_order("sent");
            record_waitlist_signup("duplicate");
            record_export(2, 1024, 0.25);
            set_waitlist_size(3);
        });

        let rendered = handle.render();
        assert!(rendered.contains("strap_orders_total{outcome=\"sent\"} 1"));
        assert!(rendered.contains("strap_waitlist_signups_total{outcome=\"duplicate\"} 1"));
        assert!(rendered.contains("strap_exports_total{scale=\"2\"} 1"));
        assert!(rendered.contains("strap_waitlist_size 3"));
    }

    #[test]
    fn test_recording_without_recorder_is_harmless() {
        record_validation_failure("email");
        record_http_request("GET", "/api/catalog", 200, 0.001);
        record_mail(false);
    }
}
