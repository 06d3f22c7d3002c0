//! Embedding provider abstraction.
//!
//! [`Embedder`] is the seam between the pipeline and whatever embedding
//! backend is configured. The OpenAI implementation batches texts into
//! a single API call and retries transient failures with exponential
//! backoff.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::Failure;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. Blank input is rejected.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Failure> {
        if text.trim().is_empty() {
            return Err(Failure::Provider("cannot embed blank text".to_string()));
        }
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| Failure::Provider("provider returned no embedding".to_string()))
    }

    /// Embed a batch of texts, returning one vector per input in input
    /// order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Failure>;
}

/// OpenAI `/v1/embeddings` client.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model is required for openai provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            max_retries: config.max_retries,
        })
    }

    async fn request_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Failure> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Failure::Provider(format!("embedding request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(Failure::Provider(format!(
                "retryable embedding API error: {status}"
            )));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Failure::Provider(format!(
                "embedding API error {status}: {detail}"
            )));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Failure::Provider(format!("invalid embedding response: {e}")))?;

        let data = parsed["data"]
            .as_array()
            .ok_or_else(|| Failure::Provider("embedding response missing data".to_string()))?;

        let mut vectors = Vec::with_capacity(data.len());
        for item in data {
            let values = item["embedding"]
                .as_array()
                .ok_or_else(|| Failure::Provider("embedding entry missing vector".to_string()))?;
            let vector: Vec<f32> = values
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            vectors.push(vector);
        }

        if vectors.len() != texts.len() {
            return Err(Failure::Provider(format!(
                "embedding count mismatch: sent {}, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        Ok(vectors)
    }

    fn is_retryable(error: &Failure) -> bool {
        matches!(error, Failure::Provider(msg)
            if msg.starts_with("retryable") || msg.starts_with("embedding request failed"))
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Failure> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.request_embeddings(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if Self::is_retryable(&e) && attempt < self.max_retries => {
                    let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                    tracing::warn!(
                        attempt,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "embedding request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Placeholder used when no embedding provider is configured. Every
/// call fails, so callers gate on [`EmbeddingConfig::is_enabled`]
/// before reaching it.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, Failure> {
        Err(Failure::Provider(
            "embedding provider is disabled; set embedding.provider in the config".to_string(),
        ))
    }
}

pub fn create_embedder(config: &EmbeddingConfig) -> anyhow::Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        "disabled" => Ok(Box::new(DisabledEmbedder)),
        other => anyhow::bail!("unknown embedding provider: {other}"),
    }
}
