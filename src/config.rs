use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub vault: VaultConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub claim_check: ClaimCheckConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct VaultConfig {
    /// Root directory of the markdown vault.
    pub root: PathBuf,
    /// Directory under the root where embedded images live.
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
}

fn default_image_dir() -> String {
    "img".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Notes per embedding API call.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            batch_size: 10,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    10
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

/// Settings for the Anthropic messages API, shared by the chat and
/// vision providers.
#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_chat_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_chat_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            max_tokens: default_chat_max_tokens(),
            timeout_secs: default_chat_timeout_secs(),
        }
    }
}

fn default_chat_model() -> String {
    "claude-3-5-sonnet-latest".to_string()
}
fn default_chat_max_tokens() -> u32 {
    1024
}
fn default_chat_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Direct semantic hits fetched per question.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Cap on attachment paths returned with an answer.
    #[serde(default = "default_max_attachments")]
    pub max_attachments: usize,
    /// Candidates fetched when analyzing a note for related notes.
    #[serde(default = "default_analyze_candidates")]
    pub analyze_candidates: usize,
    /// Related names returned by note analysis.
    #[serde(default = "default_analyze_limit")]
    pub analyze_limit: usize,
    /// Names returned by `find`.
    #[serde(default = "default_find_limit")]
    pub find_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_attachments: default_max_attachments(),
            analyze_candidates: default_analyze_candidates(),
            analyze_limit: default_analyze_limit(),
            find_limit: default_find_limit(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_max_attachments() -> usize {
    3
}
fn default_analyze_candidates() -> usize {
    6
}
fn default_analyze_limit() -> usize {
    5
}
fn default_find_limit() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClaimCheckConfig {
    /// Seconds a stored result stays retrievable.
    #[serde(default = "default_claim_ttl_secs")]
    pub ttl_secs: i64,
}

impl Default for ClaimCheckConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_claim_ttl_secs(),
        }
    }
}

fn default_claim_ttl_secs() -> i64 {
    3600
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.embedding.batch_size == 0 {
        anyhow::bail!("embedding.batch_size must be > 0");
    }

    if config.embedding.is_enabled() {
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.claim_check.ttl_secs < 1 {
        anyhow::bail!("claim_check.ttl_secs must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [vault]
        root = "/tmp/vault"

        [db]
        path = "/tmp/notegraph.sqlite"
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.vault.image_dir, "img");
        assert_eq!(config.embedding.provider, "disabled");
        assert_eq!(config.embedding.batch_size, 10);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.max_attachments, 3);
        assert_eq!(config.claim_check.ttl_secs, 3600);
    }

    #[test]
    fn enabled_embedding_requires_model_and_dims() {
        let content = r#"
            [vault]
            root = "/tmp/vault"

            [db]
            path = "/tmp/notegraph.sqlite"

            [embedding]
            provider = "openai"
        "#;
        assert!(parse_config(content).is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        let content = r#"
            [vault]
            root = "/tmp/vault"

            [db]
            path = "/tmp/notegraph.sqlite"

            [embedding]
            provider = "cohere"
            model = "embed-v3"
            dims = 1024
        "#;
        assert!(parse_config(content).is_err());
    }

    #[test]
    fn zero_batch_size_rejected() {
        let content = r#"
            [vault]
            root = "/tmp/vault"

            [db]
            path = "/tmp/notegraph.sqlite"

            [embedding]
            batch_size = 0
        "#;
        assert!(parse_config(content).is_err());
    }
}
