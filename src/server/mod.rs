//! HTTP surface -- shared state, router, handlers, and the boundary error type.

pub mod error;
pub mod handlers;
pub mod routes;

use crate::client::WebClient;
use crate::config::ServerConfig;
use crate::session::store::SessionStore;
use anyhow::Result;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Captured sessions, shared across requests.
    pub store: Arc<SessionStore>,
    /// Outbound HTTP client, cheap to clone.
    pub client: WebClient,
    /// Request-handling settings.
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self> {
        Ok(Self {
            store: Arc::new(SessionStore::new()),
            client: WebClient::new()?,
            config,
        })
    }
}
