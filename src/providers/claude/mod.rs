
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{ChatProvider, SseEvent, StreamFrame, StreamRequest, TextStream, open_event_stream};
use crate::chat::{ChatMessage, Role};
use crate::config::{ChatBackend, Config, Credentials};
use crate::http::HttpClient;
use crate::{RagError, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API with `stream: true`
#[derive(Debug, Clone)]
pub struct ClaudeProvider {
    http: HttpClient,
    endpoint: Url,
    model: String,
    max_tokens: u32,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
    stream: bool,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

/// The subset of stream events that carry text or end the stream
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: BlockDelta },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

impl ClaudeProvider {
    #[inline]
    pub fn new(config: &Config, credentials: &Credentials) -> Result<Self> {
        let api_key = credentials.chat_key(ChatBackend::Claude)?.to_string();
        let endpoint = config
            .network
            .anthropic_base_url
            .join("v1/messages")
            .map_err(|e| RagError::Config(format!("Invalid Anthropic URL: {}", e)))?;

        Ok(Self {
            http: HttpClient::streaming(
                Duration::from_secs(config.network.timeout_seconds),
                config.network.retry_attempts,
            ),
            endpoint,
            model: config.chat.model_for(ChatBackend::Claude).to_string(),
            max_tokens: config.chat.max_tokens,
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
        let (system, messages) = split_system(messages);
        serde_json::to_string(&MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages,
            stream: true,
        })
        .map_err(|e| RagError::Provider(format!("Failed to serialize request: {}", e)))
    }
}

/// Move system messages into the top-level `system` field and merge
/// consecutive messages from the same role, which the API rejects.
fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<ApiMessage>) {
    let mut system: Vec<&str> = Vec::new();
    let mut turns: Vec<ApiMessage> = Vec::with_capacity(messages.len());

    for message in messages {
        let role = match message.role {
            Role::System => {
                system.push(&message.content);
                continue;
            }
            Role::User => "user",
            Role::Assistant => "assistant",
        };

        match turns.last_mut() {
            Some(last) if last.role == role => {
                last.content.push_str("\n\n");
                last.content.push_str(&message.content);
            }
            _ => turns.push(ApiMessage {
                role,
                content: message.content.clone(),
            }),
        }
    }

    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, turns)
}

#[async_trait]
impl ChatProvider for ClaudeProvider {
    fn name(&self) -> &str {
        "claude"
    }

    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<TextStream> {
        debug!(
            "Streaming {} messages to Claude model {}",
            messages.len(),
            self.model
        );

        let request = StreamRequest {
            http: self.http.clone(),
            url: self.endpoint.clone(),
            headers: vec![
                ("x-api-key", self.api_key.clone()),
                ("anthropic-version", ANTHROPIC_VERSION.to_string()),
                ("Accept", "text/event-stream".to_string()),
            ],
            body: self.request_body(messages)?,
        };

        open_event_stream(request, parse_event).await
    }
}

/// Interpret one event of a Messages stream
fn parse_event(event: &SseEvent) -> Result<StreamFrame> {
    let parsed: StreamEvent = match serde_json::from_str(&event.data) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(
                "Skipping malformed {} event: {}",
                event.event.as_deref().unwrap_or("unnamed"),
                e
            );
            return Ok(StreamFrame::Skip);
        }
    };

    match parsed {
        StreamEvent::ContentBlockDelta {
            delta: BlockDelta::TextDelta { text },
        } if !text.is_empty() => Ok(StreamFrame::Text(text)),
        StreamEvent::MessageStop => Ok(StreamFrame::Done),
        StreamEvent::Error { error } => Err(RagError::Provider(format!(
            "Claude {}: {}",
            error.kind, error.message
        ))),
        StreamEvent::ContentBlockDelta { .. } | StreamEvent::Other => Ok(StreamFrame::Skip),
    }
}
