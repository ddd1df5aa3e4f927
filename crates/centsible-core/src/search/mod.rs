//! Web-search capability abstraction (§6.4).
//!
//! # Architecture
//!
//! - `SearchBackend` trait: defines the interface for all backends.
//! - `SearchClient` enum: concrete wrapper providing Clone + compile-time
//!   dispatch, mirroring the pluggable-backend shape used elsewhere in this
//!   codebase (§10.5).
//! - Backend implementations: `HttpSearchBackend`, `MockSearchBackend`.
//!
//! The capability is addressed by model name and is rate-limited; quota
//! errors (`Error::CapabilityQuota`) are distinguishable from transport
//! errors (`Error::CapabilityUnavailable`).

mod http;
mod mock;
pub mod parsing;

pub use http::HttpSearchBackend;
pub use mock::MockSearchBackend;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

/// A capability that, given a prompt, yields zero or more text chunks
/// culminating in a final response (§6.4). Chunks are forwarded on `chunks`
/// as they arrive so the caller can surface `progress` events (§4.6.4)
/// without waiting for the final response.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(
        &self,
        prompt: &str,
        model: &str,
        chunks: mpsc::UnboundedSender<String>,
    ) -> Result<String>;

    /// The model identifier this backend is configured to call.
    fn model(&self) -> &str;
}

/// Concrete search client enum.
///
/// Provides Clone and compile-time dispatch without `Box<dyn>` overhead,
/// the same shape as the AI backend dispatch enum this module is grounded
/// on (§10.5).
#[derive(Clone)]
pub enum SearchClient {
    Http(HttpSearchBackend),
    Mock(MockSearchBackend),
}

impl SearchClient {
    /// Build a client from configuration. `None` endpoint selects the mock
    /// backend — useful for local development and tests.
    pub fn new(endpoint: Option<&str>, model: &str) -> Self {
        match endpoint {
            Some(endpoint) => SearchClient::Http(HttpSearchBackend::new(endpoint, model)),
            None => SearchClient::Mock(MockSearchBackend::new(model)),
        }
    }
}

#[async_trait]
impl SearchBackend for SearchClient {
    async fn search(
        &self,
        prompt: &str,
        model: &str,
        chunks: mpsc::UnboundedSender<String>,
    ) -> Result<String> {
        match self {
            SearchClient::Http(backend) => backend.search(prompt, model, chunks).await,
            SearchClient::Mock(backend) => backend.search(prompt, model, chunks).await,
        }
    }

    fn model(&self) -> &str {
        match self {
            SearchClient::Http(backend) => backend.model(),
            SearchClient::Mock(backend) => backend.model(),
        }
    }
}
