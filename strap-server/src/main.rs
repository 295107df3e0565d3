//! # Strap Server
//!
//! HTTP front for the strap customizer, plus a one-shot `export` command.
//! Binds to localhost unless told otherwise.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use strap_core::Draft;
use strap_renderer::{BackgroundResolver, ExportCompositor, ExportConfig, Renderer};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use strap_server::config::{Cli, Command, ExportArgs, RenderArgs, ServeArgs};
use strap_server::mail::HttpMailRelay;
use strap_server::metrics;
use strap_server::{api_router, AppState, Mailer, WaitlistStore};

/// Build a CORS layer from the configured origins.
///
/// With no configured origins only localhost pages (the server's own port and
/// common dev-server ports) may call the API.
fn build_cors_layer(port: u16, allowed: &[String]) -> CorsLayer {
    let origins: Vec<String> = if allowed.is_empty() {
        vec![
            format!("http://localhost:{port}"),
            format!("http://127.0.0.1:{port}"),
            "http://localhost:3000".to_string(),
            "http://localhost:5173".to_string(), // Vite
            "http://127.0.0.1:3000".to_string(),
            "http://127.0.0.1:5173".to_string(),
        ]
    } else {
        allowed.to_vec()
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_DISPOSITION])
}

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,strap_server=debug,tower_http=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output (recommended for production).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,strap_server=debug,tower_http=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    // Use JSON format in production (RUST_LOG_FORMAT=json)
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    match Cli::parse().command {
        Command::Serve(args) => serve(args).await,
        Command::Export(args) => export(args).await,
    }
}

/// Renderer, background resolver and compositor from the render flags.
fn build_compositor(render: &RenderArgs) -> anyhow::Result<Arc<ExportCompositor>> {
    let renderer = Renderer::new(render.renderer_config()).context("creating renderer")?;
    tracing::info!(
        backend = renderer.active_backend().as_str(),
        font_faces = renderer.fonts().face_count(),
        "Renderer ready"
    );
    let resolver = BackgroundResolver::http(render.fetch_policy())
        .context("creating background fetcher")?;
    Ok(Arc::new(ExportCompositor::new(
        Arc::new(renderer),
        resolver,
        ExportConfig::default(),
    )))
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    // Initialize Prometheus metrics
    let metrics_handle = metrics::init_metrics()
        .map_err(|e| anyhow::anyhow!("Failed to initialize Prometheus metrics: {}", e))?;
    tracing::info!("Prometheus metrics initialized");

    let compositor = build_compositor(&args.render)?;

    let settings = args.mail.settings();
    let mailer = match &args.mail.mail_endpoint {
        Some(endpoint) => {
            let relay = HttpMailRelay::new(
                endpoint.clone(),
                Some(Duration::from_secs(args.mail.mail_timeout)),
            )?;
            tracing::info!("Mail relay: {}", endpoint);
            Mailer::new(Arc::new(relay), settings)
        }
        None => {
            tracing::warn!("No mail relay configured; orders will be rejected");
            Mailer::disabled(settings)
        }
    };

    let waitlist = match &args.data_dir {
        Some(dir) => WaitlistStore::with_data_dir(dir)
            .with_context(|| format!("opening waitlist in {}", dir.display()))?,
        None => {
            tracing::warn!("No data directory configured; waitlist is in-memory only");
            WaitlistStore::new()
        }
    };

    let state = AppState::new(compositor, mailer, waitlist);

    // Build metrics router with PrometheusHandle
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    let app = api_router(state)
        .merge(metrics_router)
        // Request ID for distributed tracing correlation
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(build_cors_layer(args.port, &args.allowed_origins))
        // Structured request tracing with timing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let addr = args.addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Strap server starting on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Strap server stopped");
    Ok(())
}

async fn export(args: ExportArgs) -> anyhow::Result<()> {
    let json = args
        .draft_json()
        .with_context(|| format!("reading draft {}", args.draft))?;
    let draft = Draft::from_json(&json).context("parsing draft")?;
    let compositor = build_compositor(&args.render)?;

    let artifact = compositor.export(&draft, args.scale).await?;

    tokio::fs::create_dir_all(&args.out).await?;
    let path = args.out.join(&artifact.file_name);
    tokio::fs::write(&path, &artifact.bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    println!("{}", path.display());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Prometheus metrics endpoint.
#[tracing::instrument(name = "metrics", skip(handle))]
async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
