//! API route handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, MatchedPath, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use strap_core::{Draft, CANVAS_HEIGHT, CANVAS_WIDTH, FONT_CATALOG, LIMITS, SWATCHES};
use strap_renderer::{MarkupSurface, PreviewRenderer, RenderError, Surface};

use crate::validation::MAX_BODY_BYTES;
use crate::{health, order, waitlist, AppState};

/// Build the API router: health probes, rendering, orders and the waitlist.
///
/// `/metrics` and the outer layers (CORS, tracing, request ids) are added by
/// the binary.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/health", get(health::readiness)) // Backward compatible
        .route("/api/catalog", get(catalog))
        .route("/api/preview", post(preview))
        .route("/api/export", post(export))
        .route("/api/order", post(order::submit))
        .route("/api/waitlist", post(waitlist::join))
        .route("/api/waitlist/count", get(waitlist::count))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

/// Record count and latency for every request, labelled by matched route.
async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());
    let method = req.method().to_string();

    let response = next.run(req).await;

    crate::metrics::record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

/// A JSON `{error}` response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// A 400 for input the client can fix.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// A 500 for failures on our side.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(e: RenderError) -> Self {
        tracing::error!("Render failed: {}", e);
        Self::internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        crate::metrics::record_validation_failure("body");
        ApiError::bad_request(format!("malformed request body: {e}"))
    })
}

/// `GET /api/catalog` - everything a form host needs to build its controls.
pub async fn catalog() -> Json<serde_json::Value> {
    Json(json!({
        "canvas": { "width": CANVAS_WIDTH, "height": CANVAS_HEIGHT },
        "fonts": FONT_CATALOG,
        "swatches": SWATCHES,
        "limits": LIMITS,
        "defaultDraft": Draft::default(),
    }))
}

fn default_guides() -> bool {
    true
}

/// Body of `POST /api/preview`.
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    /// Draft to draw; missing fields take their defaults.
    #[serde(default)]
    pub draft: Draft,
    /// Whether to draw guides.
    #[serde(default = "default_guides")]
    pub guides: bool,
}

/// `POST /api/preview` - one preview frame as SVG.
#[tracing::instrument(name = "preview", skip_all)]
pub async fn preview(body: Bytes) -> Result<Response, ApiError> {
    let request: PreviewRequest = parse_body(&body)?;
    let draft = request.draft.normalized();

    let surface = MarkupSurface::new();
    let mut renderer = PreviewRenderer::new(Surface::Mounted(Box::new(surface.clone())));
    renderer.set_guides(request.guides);
    let frame = renderer
        .redraw(&draft)?
        .ok_or_else(|| ApiError::internal("preview surface not mounted"))?;

    crate::metrics::record_preview(request.guides);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/svg+xml".to_string()),
            (
                header::HeaderName::from_static("x-over-capacity"),
                frame.over_capacity.to_string(),
            ),
        ],
        frame.markup,
    )
        .into_response())
}

/// Body of `POST /api/export`.
#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    /// Draft to export; missing fields take their defaults.
    #[serde(default)]
    pub draft: Draft,
    /// Export scale, clamped to 1..=4. Defaults to the configured scale.
    pub scale: Option<u32>,
}

/// `POST /api/export` - a PNG download.
#[tracing::instrument(name = "export", skip_all)]
pub async fn export(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request: ExportRequest = parse_body(&body)?;
    let scale = request
        .scale
        .unwrap_or(state.compositor.config().default_scale);

    let start = Instant::now();
    let (snapshot, background) = state.compositor.prepare(&request.draft).await;
    let compositor = Arc::clone(&state.compositor);
    let artifact = tokio::task::spawn_blocking(move || {
        compositor.export_resolved(
            &snapshot,
            &background,
            scale,
            chrono::Utc::now().timestamp_millis(),
        )
    })
    .await
    .map_err(|e| {
        tracing::error!("Export task failed: {}", e);
        ApiError::internal("export task failed")
    })??;
    crate::metrics::record_export(
        artifact.scale,
        artifact.bytes.len(),
        start.elapsed().as_secs_f64(),
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.file_name),
            ),
        ],
        artifact.bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_request_defaults() {
        let req: PreviewRequest = serde_json::from_str("{}").expect("parse");
        assert!(req.guides);
        assert_eq!(req.draft, Draft::default());
    }

    #[test]
    fn test_export_request_partial_draft() {
        let req: ExportRequest =
            serde_json::from_str(r#"{"draft":{"text":"CREW"},"scale":3}"#).expect("parse");
        assert_eq!(req.draft.text, "CREW");
        assert_eq!(req.scale, Some(3));
    }

    #[test]
    fn test_parse_body_rejects_garbage() {
        let err = parse_body::<ExportRequest>(b"nope").expect_err("should fail");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_catalog_shape() {
        let Json(value) = catalog().await;
        assert_eq!(value["fonts"].as_array().map(Vec::len), Some(FONT_CATALOG.len()));
        assert_eq!(value["canvas"]["width"], 1600.0);
        assert!(value["limits"]["exportScale"].is_object());
        assert_eq!(value["defaultDraft"]["text"], "SNAPINK");
    }
}
