use std::io::Write;
use std::sync::Arc;

use futures::StreamExt;
use tracing::debug;

use super::ChatMessage;
use crate::Result;
use crate::providers::ChatProvider;

/// Writes a provider's reply to the terminal as it streams in
pub struct StreamingResponder {
    provider: Arc<dyn ChatProvider>,
}

impl StreamingResponder {
    #[inline]
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    #[inline]
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Stream a reply for `messages` into `out`, one write per fragment
    /// followed by a single newline. Returns the full reply text.
    ///
    /// If the stream fails part way, the line is still terminated so the
    /// error report starts on a fresh line.
    #[inline]
    pub async fn respond<W: Write + Send>(
        &self,
        messages: &[ChatMessage],
        out: &mut W,
    ) -> Result<String> {
        let mut stream = self.provider.stream_chat(messages).await?;
        let mut reply = String::new();

        while let Some(fragment) = stream.next().await {
            let fragment = match fragment {
                Ok(fragment) => fragment,
                Err(e) => {
                    if !reply.is_empty() {
                        out.write_all(b"\n")?;
                        out.flush()?;
                    }
                    return Err(e);
                }
            };
            if fragment.is_empty() {
                continue;
            }

            out.write_all(fragment.as_bytes())?;
            out.flush()?;
            reply.push_str(&fragment);
        }

        out.write_all(b"\n")?;
        out.flush()?;

        debug!(
            "{} reply complete ({} chars)",
            self.provider.name(),
            reply.chars().count()
        );
        Ok(reply)
    }
}
