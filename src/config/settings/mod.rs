
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::RagError;
use crate::embeddings::chunking::ChunkingConfig;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly AI assistant who will help user create a JSON schema based on the user's input. If you do not know the answer, you can ask for more information but do not make up information. Make sure you evaluate the user's input and ask for clarification if needed. Also, check the validators schema correct or not. For example, every validator should have a type, a message, and active property. You don't need to write explanations.";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Remote API used to turn text into vectors
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    OpenAi,
    Mistral,
}

/// Remote API used for streamed chat completions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChatBackend {
    #[default]
    Claude,
    Mistral,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingBackend,
    pub model: String,
    pub batch_size: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::OpenAi,
            model: "text-embedding-3-small".to_string(),
            batch_size: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatConfig {
    pub provider: ChatBackend,
    pub mistral_model: String,
    pub claude_model: String,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: ChatBackend::Claude,
            mistral_model: "mistral-large-latest".to_string(),
            claude_model: "claude-3-opus-20240229".to_string(),
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub collection: String,
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            collection: "openai_collections".to_string(),
            top_k: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConversationConfig {
    pub system_prompt: String,
    /// Upper bound on non-system messages sent with each request
    pub max_history_messages: usize,
    /// Record the assistant's replies in the transcript
    pub remember_replies: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_history_messages: 20,
            remember_replies: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub timeout_seconds: u64,
    pub turn_timeout_seconds: u64,
    pub retry_attempts: u32,
    pub openai_base_url: Url,
    pub mistral_base_url: Url,
    pub anthropic_base_url: Url,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            turn_timeout_seconds: 300,
            retry_attempts: 3,
            openai_base_url: default_url("https://api.openai.com"),
            mistral_base_url: default_url("https://api.mistral.ai"),
            anthropic_base_url: default_url("https://api.anthropic.com"),
        }
    }
}

#[expect(clippy::unwrap_used, reason = "only called with literal URLs")]
fn default_url(url: &str) -> Url {
    Url::parse(url).unwrap()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid protocol in {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid batch size: {0} (must be between 1 and 2048)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid max tokens: {0} (must be between 1 and 8192)")]
    InvalidMaxTokens(u32),
    #[error("Invalid collection name: {0:?} (use letters, digits, '_', '-' or '.')")]
    InvalidCollection(String),
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("System prompt cannot be empty")]
    EmptySystemPrompt,
    #[error("Invalid history limit: {0} (must be between 2 and 1000)")]
    InvalidHistoryLimit(usize),
    #[error("Invalid chunk size: {0} (must be between 100 and 8000)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid timeout: {0} seconds (must be between 1 and {1})")]
    InvalidTimeout(u64, u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Missing credential: set the {0} environment variable")]
    MissingCredential(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl From<ConfigError> for RagError {
    #[inline]
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::MissingCredential(var) => Self::MissingCredential(var.to_string()),
            other => Self::Config(other.to_string()),
        }
    }
}

impl Config {
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.chat.validate()?;
        self.retrieval.validate()?;
        self.conversation.validate()?;
        self.validate_chunking_config()?;
        self.network.validate()?;
        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let config = &self.chunking;

        if !(100..=8000).contains(&config.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(config.chunk_size));
        }

        if config.chunk_overlap >= config.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                config.chunk_overlap,
                config.chunk_size,
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Directory holding the LanceDB collections
    #[inline]
    pub fn vector_database_path(&self) -> PathBuf {
        self.get_base_dir().join("vectors")
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 2048 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 2048 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }
}

impl ChatConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for model in [&self.mistral_model, &self.claude_model] {
            if model.trim().is_empty() {
                return Err(ConfigError::InvalidModel(model.clone()));
            }
        }

        if self.max_tokens == 0 || self.max_tokens > 8192 {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens));
        }

        Ok(())
    }

    /// Model identifier for the given backend
    pub fn model_for(&self, backend: ChatBackend) -> &str {
        match backend {
            ChatBackend::Claude => &self.claude_model,
            ChatBackend::Mistral => &self.mistral_model,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_name = !self.collection.is_empty()
            && self
                .collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid_name {
            return Err(ConfigError::InvalidCollection(self.collection.clone()));
        }

        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        Ok(())
    }

    pub fn set_top_k(&mut self, top_k: usize) -> Result<(), ConfigError> {
        if !(1..=100).contains(&top_k) {
            return Err(ConfigError::InvalidTopK(top_k));
        }
        self.top_k = top_k;
        Ok(())
    }
}

impl ConversationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.system_prompt.trim().is_empty() {
            return Err(ConfigError::EmptySystemPrompt);
        }

        if !(2..=1000).contains(&self.max_history_messages) {
            return Err(ConfigError::InvalidHistoryLimit(self.max_history_messages));
        }

        Ok(())
    }

    pub fn set_max_history_messages(&mut self, limit: usize) -> Result<(), ConfigError> {
        if !(2..=1000).contains(&limit) {
            return Err(ConfigError::InvalidHistoryLimit(limit));
        }
        self.max_history_messages = limit;
        Ok(())
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, url) in [
            ("openai_base_url", &self.openai_base_url),
            ("mistral_base_url", &self.mistral_base_url),
            ("anthropic_base_url", &self.anthropic_base_url),
        ] {
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::InvalidProtocol(name.to_string()));
            }
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds, 600));
        }

        if !(1..=3600).contains(&self.turn_timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.turn_timeout_seconds, 3600));
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        Ok(())
    }

    /// Base URL of the embeddings endpoint for the given backend
    pub fn embedding_base_url(&self, backend: EmbeddingBackend) -> &Url {
        match backend {
            EmbeddingBackend::OpenAi => &self.openai_base_url,
            EmbeddingBackend::Mistral => &self.mistral_base_url,
        }
    }

    pub fn set_retry_attempts(&mut self, attempts: u32) -> Result<(), ConfigError> {
        if !(1..=10).contains(&attempts) {
            return Err(ConfigError::InvalidRetryAttempts(attempts));
        }
        self.retry_attempts = attempts;
        Ok(())
    }
}
