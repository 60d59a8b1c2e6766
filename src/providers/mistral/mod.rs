
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{ChatProvider, SseEvent, StreamFrame, StreamRequest, TextStream, open_event_stream};
use crate::chat::ChatMessage;
use crate::config::{ChatBackend, Config, Credentials};
use crate::http::HttpClient;
use crate::{RagError, Result};

const DONE_MARKER: &str = "[DONE]";

/// Mistral chat completions with `stream: true`
#[derive(Debug, Clone)]
pub struct MistralProvider {
    http: HttpClient,
    endpoint: Url,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorChunk {
    object: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<serde_json::Value>,
    choices: Option<serde_json::Value>,
}

impl ErrorChunk {
    /// Tagged error objects, or bare `{message, type}` payloads carrying no choices
    fn is_error(&self) -> bool {
        self.object.as_deref() == Some("error")
            || (self.choices.is_none() && (self.message.is_some() || self.kind.is_some()))
    }

    fn describe(&self) -> String {
        match (&self.message, &self.kind) {
            (Some(serde_json::Value::String(message)), _) => message.clone(),
            (Some(message), _) => message.to_string(),
            (None, Some(kind)) => kind.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

impl MistralProvider {
    #[inline]
    pub fn new(config: &Config, credentials: &Credentials) -> Result<Self> {
        let api_key = credentials.chat_key(ChatBackend::Mistral)?.to_string();
        let endpoint = config
            .network
            .mistral_base_url
            .join("v1/chat/completions")
            .map_err(|e| RagError::Config(format!("Invalid Mistral URL: {}", e)))?;

        Ok(Self {
            http: HttpClient::streaming(
                Duration::from_secs(config.network.timeout_seconds),
                config.network.retry_attempts,
            ),
            endpoint,
            model: config.chat.model_for(ChatBackend::Mistral).to_string(),
            api_key,
        })
    }

    #[inline]
    pub fn with_http_client(mut self, http: HttpClient) -> Self {
        self.http = http;
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, messages: &[ChatMessage]) -> Result<String> {
        serde_json::to_string(&CompletionRequest {
            model: &self.model,
            messages,
            stream: true,
        })
        .map_err(|e| RagError::Provider(format!("Failed to serialize request: {}", e)))
    }
}

#[async_trait]
impl ChatProvider for MistralProvider {
    fn name(&self) -> &str {
        "mistral"
    }

    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        debug!(
            "Streaming {} messages to Mistral model {}",
            messages.len(),
            self.model
        );

        let request = StreamRequest {
            http: self.http.clone(),
            url: self.endpoint.clone(),
            headers: vec![
                ("Authorization", format!("Bearer {}", self.api_key)),
                ("Accept", "text/event-stream".to_string()),
            ],
            body: self.request_body(messages)?,
        };

        open_event_stream(request, parse_event).await
    }
}

/// Interpret one event of a completions stream
fn parse_event(event: &SseEvent) -> Result<StreamFrame> {
    let data = event.data.trim();
    if data == DONE_MARKER {
        return Ok(StreamFrame::Done);
    }
    if data.is_empty() {
        return Ok(StreamFrame::Skip);
    }

    if let Ok(error) = serde_json::from_str::<ErrorChunk>(data) {
        if error.is_error() {
            return Err(RagError::Provider(format!("Mistral error: {}", error.describe())));
        }
    }

    let chunk: CompletionChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            warn!("Skipping malformed stream chunk: {}", e);
            return Ok(StreamFrame::Skip);
        }
    };

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty())
        .map_or(StreamFrame::Skip, StreamFrame::Text))
}
