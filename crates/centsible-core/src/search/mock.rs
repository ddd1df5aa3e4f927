//! Deterministic mock backend for testing and local development without a
//! live web-search capability.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;

use super::SearchBackend;

/// Returns a fixed, well-formed `Finding` array. Can be configured to
/// simulate quota exhaustion or malformed output for failure-path tests.
#[derive(Clone, Default)]
pub struct MockSearchBackend {
    model: String,
    pub fail_quota: bool,
    pub malformed_output: bool,
}

impl MockSearchBackend {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            fail_quota: false,
            malformed_output: false,
        }
    }

    pub fn quota_exhausted(model: &str) -> Self {
        Self {
            model: model.to_string(),
            fail_quota: true,
            malformed_output: false,
        }
    }

    pub fn malformed(model: &str) -> Self {
        Self {
            model: model.to_string(),
            fail_quota: false,
            malformed_output: true,
        }
    }
}

#[async_trait]
impl SearchBackend for MockSearchBackend {
    async fn search(
        &self,
        _prompt: &str,
        _model: &str,
        chunks: mpsc::UnboundedSender<String>,
    ) -> Result<String> {
        use crate::error::Error;

        if self.fail_quota {
            return Err(Error::CapabilityQuota(
                "mock web-search capability quota exceeded".to_string(),
            ));
        }

        if self.malformed_output {
            let text = "not json at all".to_string();
            let _ = chunks.send(text.clone());
            return Ok(text);
        }

        let _ = chunks.send("searching local retailers…".to_string());
        let _ = chunks.send("comparing prices…".to_string());

        let final_response = r#"```json
[
  {
    "item_name": "Mock Item",
    "original_price": 49.99,
    "original_merchant": "Mock Original Store",
    "alternative_merchant": "Mock Cheaper Store",
    "alternative_price": 32.50,
    "shipping_cost": 0.0,
    "tax_estimate": 2.60,
    "total_landed_cost": 35.10,
    "total_savings": 14.89,
    "url": "https://example.com/mock-item",
    "notes": "Mock finding for tests",
    "channel": "online",
    "confidence": 0.82
  }
]
```"#
            .to_string();

        let _ = chunks.send(final_response.clone());
        Ok(final_response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
