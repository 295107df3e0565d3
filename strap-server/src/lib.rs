//! # Strap Server Library
//!
//! Shared types and functionality for the strap server.
//! This library is used by both the binary and integration tests.
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────┐   ┌──────────────┐
//! │ /api/preview │──▶│  PreviewRenderer  │   │  /api/order  │──▶ MailRelay
//! │ /api/export  │──▶│ ExportCompositor  │   │/api/waitlist │──▶ WaitlistStore
//! └──────────────┘   └───────────────────┘   └──────────────┘
//! ```

use std::sync::Arc;

use strap_renderer::ExportCompositor;

pub mod config;
pub mod health;
pub mod mail;
pub mod metrics;
pub mod order;
pub mod routes;
pub mod validation;
pub mod waitlist;

pub use mail::{MailError, MailRelay, Mailer};
pub use routes::api_router;
pub use validation::ValidationError;
pub use waitlist::{StoreError, WaitlistStore};

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Export compositor (also owns the renderer).
    pub compositor: Arc<ExportCompositor>,
    /// Outbound mail.
    pub mailer: Arc<Mailer>,
    /// Waitlist signups.
    pub waitlist: WaitlistStore,
}

impl AppState {
    /// Bundle the server's collaborators.
    #[must_use]
    pub fn new(compositor: Arc<ExportCompositor>, mailer: Mailer, waitlist: WaitlistStore) -> Self {
        Self {
            compositor,
            mailer: Arc::new(mailer),
            waitlist,
        }
    }

    /// Get a reference to the waitlist store.
    #[must_use]
    pub fn waitlist(&self) -> &WaitlistStore {
        &self.waitlist
    }
}

/// Strap server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
