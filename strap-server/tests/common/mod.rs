//! Shared helpers for strap-server integration tests.

mod server;

#[allow(unused_imports)]
pub use server::{TestServer, TestServerOptions};
