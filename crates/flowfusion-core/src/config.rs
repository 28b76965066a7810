use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};
use crate::types::Document;

/// Environment variable consulted when `model.api_key` is not set.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Top-level FlowFusion configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
    #[serde(default)]
    pub embedding: Option<EmbeddingConfig>,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model_id: default_model_id(),
            api_key: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            retry: None,
        }
    }
}

impl ModelConfig {
    /// The credential to send, from config or `OPENAI_API_KEY`.
    ///
    /// Empty strings and `${VAR}` placeholders left unexpanded count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| is_usable_secret(k))
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| is_usable_secret(k)))
    }
}

fn is_usable_secret(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.starts_with("${")
}

fn default_provider() -> String { "openai".to_string() }
fn default_model_id() -> String { "gpt-3.5-turbo".to_string() }
fn default_max_tokens() -> u32 { 1024 }
fn default_temperature() -> f32 { 0.0 }

/// Retry configuration for collaborator requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

fn default_max_retries() -> u32 { 3 }
fn default_initial_backoff() -> u64 { 1000 }
fn default_max_backoff() -> u64 { 30000 }

/// Workflow execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Passages requested per retrieval node.
    #[serde(default = "default_top_k")]
    pub retrieval_top_k: usize,
    #[serde(default = "default_retrieval_timeout")]
    pub retrieval_timeout_secs: u64,
    /// Extra attempts for a retryable retrieval failure.
    #[serde(default = "default_retrieval_retries")]
    pub retrieval_retries: u32,
    /// Delay before the first retrieval retry; doubles per attempt.
    #[serde(default = "default_retrieval_backoff")]
    pub retrieval_backoff_ms: u64,
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_secs: u64,
    /// Overrides the built-in system instruction.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retrieval_top_k: default_top_k(),
            retrieval_timeout_secs: default_retrieval_timeout(),
            retrieval_retries: default_retrieval_retries(),
            retrieval_backoff_ms: default_retrieval_backoff(),
            generation_timeout_secs: default_generation_timeout(),
            system_prompt: None,
        }
    }
}

fn default_top_k() -> usize { 2 }
fn default_retrieval_timeout() -> u64 { 10 }
fn default_retrieval_retries() -> u32 { 1 }
fn default_retrieval_backoff() -> u64 { 500 }
fn default_generation_timeout() -> u64 { 60 }

/// Retrieval corpus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// SQLite file backing the corpus. In-memory when unset.
    #[serde(default)]
    pub path: Option<String>,
    /// Seed the sample passages into an empty corpus.
    #[serde(default = "default_seed_defaults")]
    pub seed_defaults: bool,
    #[serde(default)]
    pub documents: Vec<Document>,
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            seed_defaults: default_seed_defaults(),
            documents: vec![],
        }
    }
}

impl KnowledgeBaseConfig {
    /// Resolve the corpus path (expand ~).
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.as_deref().map(expand_home)
    }
}

fn default_seed_defaults() -> bool { true }

/// Embedding model configuration for semantic retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider name: "openai", "ollama", or any OpenAI-compatible API.
    pub provider: String,
    /// Model name (e.g., "text-embedding-3-small", "nomic-embed-text").
    pub model: String,
    /// Base URL for the embedding API (e.g., "http://localhost:11434/v1").
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_embedding_dims")]
    pub dimensions: usize,
}

fn default_embedding_dims() -> usize { 1536 }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String { "127.0.0.1:8000".to_string() }

impl AppConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| FlowError::ConfigNotFound(path.display().to_string()))?;

        Self::from_toml_str(&content)
    }

    /// Parse config text, expanding `${ENV_VAR}` references first.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| FlowError::Config(e.to_string()))
    }

    /// Copy with every secret replaced, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if config.model.api_key.is_some() {
            config.model.api_key = Some("<redacted>".to_string());
        }
        if let Some(ref mut embedding) = config.embedding {
            if embedding.api_key.is_some() {
                embedding.api_key = Some("<redacted>".to_string());
            }
        }
        config
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                // Keep original if env var not set
                Err(_) => result.push_str(&format!("${{{}}}", var_name)),
            }
        } else {
            result.push(c);
        }
    }
    result
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}
