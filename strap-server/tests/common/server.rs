//! Test server harness for integration tests.
//!
//! Spins up the real API router on a random port so tests talk to it over
//! HTTP with reqwest.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use strap_renderer::{
    BackgroundResolver, ExportCompositor, ExportConfig, FetchPolicy, FontLibrary, Renderer,
    RendererConfig,
};
use strap_server::mail::{HttpMailRelay, MailSettings};
use strap_server::{api_router, AppState, Mailer, WaitlistStore};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;
use usvg::fontdb;

/// How to wire the test server's collaborators.
#[derive(Debug, Default)]
pub struct TestServerOptions {
    /// Mail relay endpoint; mail is disabled if `None`.
    pub mail_endpoint: Option<Url>,
    /// Waitlist data directory; in-memory if `None`.
    pub data_dir: Option<PathBuf>,
}

/// A test server instance with control handles.
pub struct TestServer {
    addr: SocketAddr,
    state: AppState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with mail disabled and an in-memory waitlist.
    pub async fn start() -> Self {
        Self::start_with(TestServerOptions::default()).await
    }

    /// Start a new test server on a random available port.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or server fails to bind.
    pub async fn start_with(options: TestServerOptions) -> Self {
        let port = portpicker::pick_unused_port().expect("no available port");
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        // No system fonts: output must not depend on the host.
        let fonts = Arc::new(FontLibrary::from_database(fontdb::Database::new()));
        let renderer = Renderer::with_fonts(RendererConfig::default(), fonts).expect("renderer");
        let resolver = BackgroundResolver::http(FetchPolicy::default()).expect("resolver");
        let compositor = Arc::new(ExportCompositor::new(
            Arc::new(renderer),
            resolver,
            ExportConfig::default(),
        ));

        let mailer = match options.mail_endpoint {
            Some(endpoint) => Mailer::new(
                Arc::new(HttpMailRelay::new(endpoint, None).expect("relay")),
                MailSettings::default(),
            ),
            None => Mailer::disabled(MailSettings::default()),
        };

        let waitlist = match options.data_dir {
            Some(dir) => WaitlistStore::with_data_dir(dir).expect("waitlist store"),
            None => WaitlistStore::new(),
        };

        let state = AppState::new(compositor, mailer, waitlist);
        let app = api_router(state.clone());

        let listener = TcpListener::bind(addr).await.expect("failed to bind");
        let actual_addr = listener.local_addr().expect("failed to get local addr");

        // Create shutdown channel
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        // Spawn the server
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("server error");
        });

        // Give the server a moment to start
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        Self {
            addr: actual_addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Get access to the shared state (for test assertions).
    #[allow(dead_code)]
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(tokio::time::Duration::from_secs(5), self.handle).await;
    }
}
