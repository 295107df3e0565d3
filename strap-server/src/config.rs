//! Command-line and environment configuration.
//!
//! Every flag has an environment fallback so the server can be configured
//! entirely from a container spec.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use strap_renderer::{BackendType, FetchPolicy, RendererConfig};
use url::Url;

use crate::mail::MailSettings;

/// Default port for the strap server.
pub const DEFAULT_PORT: u16 = 7877; // "STRP" on phone keypad

/// Strap customizer server.
#[derive(Debug, Parser)]
#[command(name = "strap-server", version, about)]
pub struct Cli {
    /// What to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeArgs),
    /// Render one draft to a PNG file and exit.
    Export(ExportArgs),
}

/// Rendering options shared by both subcommands.
#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Preferred render backend (`vector` or `canvas`).
    #[arg(long, env = "STRAP_BACKEND", default_value = "vector")]
    pub backend: BackendType,

    /// Extra font directories, comma separated.
    #[arg(long = "font-dir", env = "STRAP_FONT_DIRS", value_delimiter = ',')]
    pub font_dirs: Vec<PathBuf>,

    /// Timeout in seconds for fetching a remote background.
    #[arg(long, env = "STRAP_FETCH_TIMEOUT", default_value_t = 10)]
    pub fetch_timeout: u64,

    /// Allow remote backgrounds on loopback, private and link-local hosts.
    #[arg(long, env = "STRAP_FETCH_ALLOW_PRIVATE")]
    pub fetch_allow_private: bool,
}

impl RenderArgs {
    /// Renderer configuration.
    #[must_use]
    pub fn renderer_config(&self) -> RendererConfig {
        RendererConfig {
            preferred_backend: self.backend,
            font_dirs: self.font_dirs.clone(),
        }
    }

    /// Limits for background fetches.
    #[must_use]
    pub fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(self.fetch_timeout.max(1)),
            allow_private_hosts: self.fetch_allow_private,
            ..FetchPolicy::default()
        }
    }
}

/// Mail relay options.
#[derive(Debug, Clone, Args)]
pub struct MailArgs {
    /// HTTP mail relay endpoint. Orders fail and waitlist notifications are
    /// skipped without one.
    #[arg(long, env = "STRAP_MAIL_ENDPOINT")]
    pub mail_endpoint: Option<Url>,

    /// Recipient of order emails.
    #[arg(long, env = "STRAP_ORDER_RECIPIENT", default_value = "orders@snapinkhats.com")]
    pub order_recipient: String,

    /// Recipient of waitlist notifications.
    #[arg(
        long,
        env = "STRAP_WAITLIST_RECIPIENT",
        default_value = "earlyaccess@snapinkhats.com"
    )]
    pub waitlist_recipient: String,

    /// Sender address.
    #[arg(long, env = "STRAP_MAIL_FROM", default_value = "no-reply@snapinkhats.com")]
    pub mail_from: String,

    /// Timeout in seconds for relay requests.
    #[arg(long, env = "STRAP_MAIL_TIMEOUT", default_value_t = 10)]
    pub mail_timeout: u64,
}

impl MailArgs {
    /// Mail addresses.
    #[must_use]
    pub fn settings(&self) -> MailSettings {
        MailSettings {
            from: self.mail_from.clone(),
            order_recipient: self.order_recipient.clone(),
            waitlist_recipient: self.waitlist_recipient.clone(),
        }
    }
}

/// Options for `serve`.
#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Port to listen on.
    #[arg(long, env = "STRAP_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind.
    #[arg(long, env = "STRAP_BIND", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub bind: IpAddr,

    /// Origins allowed by CORS, comma separated. Localhost only if empty.
    #[arg(long = "allowed-origin", env = "STRAP_ALLOWED_ORIGIN", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Directory the waitlist is persisted to. In-memory if unset.
    #[arg(long, env = "STRAP_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Mail relay.
    #[command(flatten)]
    pub mail: MailArgs,

    /// Rendering.
    #[command(flatten)]
    pub render: RenderArgs,
}

impl ServeArgs {
    /// Socket address to bind.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Options for `export`.
#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Draft JSON, or `@path` to read it from a file.
    #[arg(long)]
    pub draft: String,

    /// Export scale (clamped to 1..=4).
    #[arg(long, default_value_t = 2)]
    pub scale: u32,

    /// Output directory.
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Rendering.
    #[command(flatten)]
    pub render: RenderArgs,
}

impl ExportArgs {
    /// The draft JSON, reading it from disk for `@path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn draft_json(&self) -> std::io::Result<String> {
        match self.draft.strip_prefix('@') {
            Some(path) => std::fs::read_to_string(path),
            None => Ok(self.draft.clone()),
        }
    }
}
