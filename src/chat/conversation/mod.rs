
use serde::{Deserialize, Serialize};

use crate::config::ConversationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Compose the user message sent for one turn
#[inline]
pub fn build_user_prompt(context: &str, input: &str) -> String {
    format!("context: {} - Question: {}", context, input)
}

/// Append-only chat transcript, seeded with one system message.
///
/// Requests are built from a window over the transcript: the system message
/// followed by at most `max_history` messages, the newest of which is the
/// pending user prompt. The window always starts on a user message.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    max_history: usize,
    remember_replies: bool,
}

impl Conversation {
    #[inline]
    pub fn new(system_prompt: impl Into<String>, max_history: usize, remember_replies: bool) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
            max_history: max_history.max(1),
            remember_replies,
        }
    }

    #[inline]
    pub fn from_config(config: &ConversationConfig) -> Self {
        Self::new(
            config.system_prompt.as_str(),
            config.max_history_messages,
            config.remember_replies,
        )
    }

    /// Full transcript, system message first
    #[inline]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when nothing but the system message has been recorded
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }

    /// Messages to send for a new user prompt. Does not modify the transcript.
    #[inline]
    pub fn request_for(&self, prompt: &str) -> Vec<ChatMessage> {
        let Some((system, history)) = self.messages.split_first() else {
            return vec![ChatMessage::user(prompt)];
        };

        let room = self.max_history.saturating_sub(1);
        let tail_start = history.len().saturating_sub(room);
        let start = history
            .iter()
            .skip(tail_start)
            .position(|message| message.role == Role::User)
            .map_or(history.len(), |offset| tail_start + offset);

        let mut request = Vec::with_capacity(history.len() - start + 2);
        request.push(system.clone());
        request.extend(history.iter().skip(start).cloned());
        request.push(ChatMessage::user(prompt));
        request
    }

    /// Record a completed turn
    #[inline]
    pub fn commit(&mut self, prompt: String, reply: String) {
        self.messages.push(ChatMessage::user(prompt));
        if self.remember_replies {
            self.messages.push(ChatMessage::assistant(reply));
        }
    }
}
