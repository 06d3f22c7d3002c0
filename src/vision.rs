//! Image captioning provider abstraction.
//!
//! Sends the image bytes plus the surrounding note text to the
//! Anthropic messages API and returns a textual description. Single
//! attempt per image; a failed caption counts as an item error
//! upstream.

use async_trait::async_trait;
use base64::Engine;
use std::path::Path;
use std::time::Duration;

use crate::chat::{extract_message_text, ANTHROPIC_API_URL, ANTHROPIC_VERSION};
use crate::config::ChatConfig;
use crate::error::Failure;

const IMAGE_DESCRIPTION_PROMPT: &str = "Describe this image in detail so the description can \
stand in for the image in text search. Mention any visible text, diagrams, charts, or code. \
Use the language of the note context below when it is clear. Keep it under 150 words.\n\n\
Note context:\n";

/// Longest slice of note content sent along with an image.
const MAX_CONTEXT_CHARS: usize = 2000;

#[async_trait]
pub trait VisionCaptioner: Send + Sync {
    /// Describe the image at `image_path`, using the owning note's
    /// content as context.
    async fn describe(&self, image_path: &Path, context: &str) -> Result<String, Failure>;
}

pub struct AnthropicVision {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicVision {
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
impl VisionCaptioner for AnthropicVision {
    async fn describe(&self, image_path: &Path, context: &str) -> Result<String, Failure> {
        let bytes = std::fs::read(image_path)
            .map_err(|e| Failure::Provider(format!("cannot read {}: {e}", image_path.display())))?;
        let data = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let media_type = media_type_for(image_path);

        let truncated: String = context.chars().take(MAX_CONTEXT_CHARS).collect();
        let prompt = format!("{IMAGE_DESCRIPTION_PROMPT}{truncated}");

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": media_type,
                            "data": data,
                        },
                    },
                    { "type": "text", "text": prompt },
                ],
            }],
        });

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| Failure::Provider(format!("vision request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Failure::Provider(format!(
                "vision API error {status}: {detail}"
            )));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Failure::Provider(format!("invalid vision response: {e}")))?;

        extract_message_text(&parsed)
            .ok_or_else(|| Failure::Provider("vision response contained no text".to_string()))
    }
}

fn media_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
