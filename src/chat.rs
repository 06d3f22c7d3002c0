//! Chat completion provider abstraction.
//!
//! The Anthropic messages API backs both the RAG answering step and
//! (via [`crate::vision`]) image captioning; the endpoint and protocol
//! version constants live here and are shared.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::ChatConfig;
use crate::error::Failure;

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Produce a completion for `user` under the given system prompt.
    async fn complete(&self, system: &str, user: &str) -> Result<String, Failure>;
}

pub struct AnthropicChat {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicChat {
    pub fn new(config: &ChatConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl ChatProvider for AnthropicChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String, Failure> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": [
                { "role": "user", "content": user }
            ],
        });

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| Failure::Provider(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Failure::Provider(format!(
                "chat API error {status}: {detail}"
            )));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Failure::Provider(format!("invalid chat response: {e}")))?;

        extract_message_text(&parsed)
            .ok_or_else(|| Failure::Provider("chat response contained no text".to_string()))
    }
}

/// Pull the first text block out of a messages API response.
pub(crate) fn extract_message_text(response: &serde_json::Value) -> Option<String> {
    response["content"]
        .as_array()?
        .iter()
        .find_map(|block| block["text"].as_str())
        .map(|s| s.to_string())
}
