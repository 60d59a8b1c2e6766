
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;

use tokio::signal;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::{Conversation, ContextRetriever, StreamingResponder, build_user_prompt};
use crate::{RagError, Result};

const PROMPT: &str = "You: ";
const EXIT_COMMAND: &str = "exit";
const INPUT_CHANNEL_CAPACITY: usize = 16;

/// Lines of operator input, in the order they were read
pub type InputLines = mpsc::Receiver<io::Result<String>>;

/// Read lines from `reader` on a dedicated thread.
///
/// Blocking reads never hold up the runtime, so the loop can stop on Ctrl-C
/// while a read is still pending. The channel closes at end of input or
/// after the first read error.
#[inline]
pub fn spawn_line_reader<R>(reader: R) -> InputLines
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
    thread::spawn(move || {
        for line in reader.lines() {
            let failed = line.is_err();
            if tx.blocking_send(line).is_err() || failed {
                break;
            }
        }
    });
    rx
}

/// What to do with one line of operator input.
/// Questions are passed on exactly as typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction<'a> {
    /// Blank line: prompt again
    Skip,
    Exit,
    Ask(&'a str),
}

#[inline]
pub fn classify_input(line: &str) -> InputAction<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        InputAction::Skip
    } else if trimmed.eq_ignore_ascii_case(EXIT_COMMAND) {
        InputAction::Exit
    } else {
        InputAction::Ask(line)
    }
}

/// The interactive question/answer loop.
///
/// Turns run one at a time: retrieve context, build the prompt, stream the
/// reply, then record the turn. A failed turn is reported and leaves the
/// conversation untouched.
pub struct ChatSession {
    retriever: ContextRetriever,
    responder: StreamingResponder,
    conversation: Conversation,
    turn_timeout: Duration,
    completed_turns: usize,
}

impl ChatSession {
    #[inline]
    pub fn new(
        retriever: ContextRetriever,
        responder: StreamingResponder,
        conversation: Conversation,
        turn_timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            responder,
            conversation,
            turn_timeout,
            completed_turns: 0,
        }
    }

    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    #[inline]
    pub fn completed_turns(&self) -> usize {
        self.completed_turns
    }

    /// Read questions from `input` until `exit`, end of input or Ctrl-C,
    /// writing prompts and answers to `out`.
    #[inline]
    pub async fn run<W>(&mut self, mut input: InputLines, out: &mut W) -> Result<()>
    where
        W: Write + Send,
    {
        info!(
            "Chat session started with {} provider",
            self.responder.provider_name()
        );

        loop {
            write!(out, "\n{}", PROMPT)?;
            out.flush()?;

            let line = tokio::select! {
                line = input.recv() => line.transpose()?,
                Ok(()) = signal::ctrl_c() => {
                    writeln!(out)?;
                    info!("Interrupted while awaiting input");
                    break;
                }
            };
            let Some(line) = line else {
                writeln!(out)?;
                debug!("Input closed");
                break;
            };

            let question = match classify_input(&line) {
                InputAction::Skip => continue,
                InputAction::Exit => break,
                InputAction::Ask(question) => question,
            };

            if let Err(e) = self.run_turn(question, out).await {
                error!("Turn failed: {}", e);
                if matches!(e, RagError::Interrupted | RagError::Timeout(_)) {
                    writeln!(out)?;
                }
                writeln!(out, "Error: {}", e)?;
                out.flush()?;
            }
        }

        info!(
            "Chat session ended after {} turns",
            self.completed_turns
        );
        Ok(())
    }

    /// One turn, abandoned on Ctrl-C or when the turn timeout expires
    async fn run_turn<W: Write + Send>(&mut self, question: &str, out: &mut W) -> Result<()> {
        let timeout = self.turn_timeout;
        tokio::select! {
            result = tokio::time::timeout(timeout, self.process_turn(question, out)) => {
                result.unwrap_or_else(|_elapsed| Err(RagError::Timeout(timeout.as_secs())))
            }
            Ok(()) = signal::ctrl_c() => Err(RagError::Interrupted),
        }
    }

    async fn process_turn<W: Write + Send>(&mut self, question: &str, out: &mut W) -> Result<()> {
        let context = self.retriever.retrieve(question).await?;
        let prompt = build_user_prompt(&context, question);
        let request = self.conversation.request_for(&prompt);

        debug!("Sending {} messages", request.len());
        let reply = self.responder.respond(&request, out).await?;

        self.conversation.commit(prompt, reply);
        self.completed_turns += 1;
        Ok(())
    }
}
