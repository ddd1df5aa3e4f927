//! HTTP-backed web-search capability.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{Error, Result};

use super::SearchBackend;

/// Hard deadline for a capability call (§5: "exceeding it yields
/// `capability_unavailable`").
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct SearchRequest<'a> {
    prompt: &'a str,
    model: &'a str,
}

#[derive(Deserialize)]
struct SearchResponse {
    response: String,
    #[serde(default)]
    quota_exceeded: bool,
}

/// Calls a configured HTTP endpoint that exposes the web-search capability.
/// The endpoint contract is intentionally minimal: POST `{prompt, model}`,
/// receive `{response, quota_exceeded?}`.
#[derive(Clone)]
pub struct HttpSearchBackend {
    http_client: Client,
    endpoint: String,
    model: String,
}

impl HttpSearchBackend {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(CALL_TIMEOUT)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn search(
        &self,
        prompt: &str,
        model: &str,
        chunks: mpsc::UnboundedSender<String>,
    ) -> Result<String> {
        let request = SearchRequest { prompt, model };

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("web-search capability call: {e}"))
                } else {
                    Error::CapabilityUnavailable(e.to_string())
                }
            })?;

        if response.status().as_u16() == 429 {
            return Err(Error::CapabilityQuota(
                "web-search capability quota exceeded".to_string(),
            ));
        }
        if !response.status().is_success() {
            return Err(Error::CapabilityUnavailable(format!(
                "web-search capability returned status {}",
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await?;
        if body.quota_exceeded {
            return Err(Error::CapabilityQuota(
                "web-search capability quota exceeded".to_string(),
            ));
        }

        let _ = chunks.send(body.response.clone());
        Ok(body.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
