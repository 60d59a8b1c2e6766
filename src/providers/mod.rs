// Streaming chat providers
// Each backend turns an ordered message list into a stream of text fragments

pub mod claude;
pub mod mistral;
pub mod sse;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use futures::stream;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;

pub use claude::ClaudeProvider;
pub use mistral::MistralProvider;
pub use sse::{SseDecoder, SseEvent, StreamFrame};

use crate::chat::ChatMessage;
use crate::config::{ChatBackend, Config, Credentials};
use crate::http::HttpClient;
use crate::{RagError, Result};

/// Fragments buffered between the blocking reader and the consumer
const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Lazy, finite stream of reply fragments. It cannot be restarted.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Human-readable backend name for logs
    fn name(&self) -> &str;

    /// Send the messages and stream back the reply as it is generated
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<TextStream>;
}

/// Build the provider selected for this run
#[inline]
pub fn build_provider(
    config: &Config,
    backend: ChatBackend,
    credentials: &Credentials,
) -> Result<Arc<dyn ChatProvider>> {
    let provider: Arc<dyn ChatProvider> = match backend {
        ChatBackend::Claude => Arc::new(ClaudeProvider::new(config, credentials)?),
        ChatBackend::Mistral => Arc::new(MistralProvider::new(config, credentials)?),
    };
    debug!("Using {} chat provider", provider.name());
    Ok(provider)
}

/// A prepared streaming request: everything needed to POST it from a worker thread
struct StreamRequest {
    http: HttpClient,
    url: Url,
    headers: Vec<(&'static str, String)>,
    body: String,
}

/// POST the request and decode its SSE body on a blocking worker.
///
/// Returns once the response head has arrived, so HTTP failures surface
/// here rather than as the first stream item. Dropping the returned stream
/// stops the worker at its next event.
async fn open_event_stream<F>(request: StreamRequest, parse: F) -> Result<TextStream>
where
    F: Fn(&SseEvent) -> Result<StreamFrame> + Send + 'static,
{
    let StreamRequest {
        http,
        url,
        headers,
        body,
    } = request;

    let reader = tokio::task::spawn_blocking(move || http.post_stream(&url, &headers, &body))
        .await
        .map_err(|e| RagError::Provider(format!("Request task failed: {}", e)))??;

    let (tx, rx) = mpsc::channel::<Result<String>>(STREAM_CHANNEL_CAPACITY);
    tokio::task::spawn_blocking(move || {
        for event in SseDecoder::new(reader) {
            let item = match event {
                Ok(event) => match parse(&event) {
                    Ok(StreamFrame::Text(text)) => Ok(text),
                    Ok(StreamFrame::Skip) => continue,
                    Ok(StreamFrame::Done) => return,
                    Err(e) => Err(e),
                },
                Err(e) => Err(RagError::Network(format!("Failed to read stream: {}", e))),
            };

            let failed = item.is_err();
            if tx.blocking_send(item).is_err() {
                debug!("Stream consumer went away, stopping reader");
                return;
            }
            if failed {
                return;
            }
        }
        warn!("Stream ended without a completion marker");
        let truncated = RagError::Provider("Stream ended before completion".to_string());
        if tx.blocking_send(Err(truncated)).is_err() {
            debug!("Stream consumer went away before the truncation was reported");
        }
    });

    Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })))
}
