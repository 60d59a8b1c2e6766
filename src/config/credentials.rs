use std::env;
use std::fmt;

use super::{ChatBackend, ConfigError, EmbeddingBackend};

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const MISTRAL_API_KEY: &str = "MISTRAL_API_KEY";
pub const CLAUDE_API_KEY: &str = "CLAUDE_API_KEY";
/// Accepted when `CLAUDE_API_KEY` is not set
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";

/// API keys read from the process environment at startup
#[derive(Clone, Default)]
pub struct Credentials {
    openai: Option<String>,
    mistral: Option<String>,
    claude: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("openai", &redact(&self.openai))
            .field("mistral", &redact(&self.mistral))
            .field("claude", &redact(&self.claude))
            .finish()
    }
}

impl Credentials {
    #[inline]
    pub fn from_env() -> Self {
        Self {
            openai: read_var(OPENAI_API_KEY),
            mistral: read_var(MISTRAL_API_KEY),
            claude: read_var(CLAUDE_API_KEY).or_else(|| read_var(ANTHROPIC_API_KEY)),
        }
    }

    #[inline]
    pub fn new(openai: Option<String>, mistral: Option<String>, claude: Option<String>) -> Self {
        Self {
            openai,
            mistral,
            claude,
        }
    }

    #[inline]
    pub fn embedding_key(&self, backend: EmbeddingBackend) -> Result<&str, ConfigError> {
        match backend {
            EmbeddingBackend::OpenAi => self
                .openai
                .as_deref()
                .ok_or(ConfigError::MissingCredential(OPENAI_API_KEY)),
            EmbeddingBackend::Mistral => self
                .mistral
                .as_deref()
                .ok_or(ConfigError::MissingCredential(MISTRAL_API_KEY)),
        }
    }

    #[inline]
    pub fn chat_key(&self, backend: ChatBackend) -> Result<&str, ConfigError> {
        match backend {
            ChatBackend::Claude => self
                .claude
                .as_deref()
                .ok_or(ConfigError::MissingCredential(CLAUDE_API_KEY)),
            ChatBackend::Mistral => self
                .mistral
                .as_deref()
                .ok_or(ConfigError::MissingCredential(MISTRAL_API_KEY)),
        }
    }
}

fn read_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
