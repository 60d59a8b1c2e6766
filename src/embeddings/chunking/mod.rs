#[cfg(test)]
mod tests;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Separators tried in order, from the coarsest boundary to single characters
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// Configuration for document splitting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters carried over from the end of one chunk into the next
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 40,
        }
    }
}

/// Split a document into overlapping chunks of at most `chunk_size` characters.
///
/// Paragraph breaks are preferred, then line breaks, then spaces, and only
/// as a last resort individual characters.
#[inline]
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chunks = split_recursive(text, SEPARATORS, config);

    debug!(
        "Split {} characters into {} chunks (avg {} tokens)",
        char_len(text),
        chunks.len(),
        chunks.iter().map(|c| estimate_token_count(c)).sum::<usize>() / chunks.len().max(1)
    );

    chunks
}

fn split_recursive(text: &str, separators: &[&str], config: &ChunkingConfig) -> Vec<String> {
    let position = separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep))
        .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(position).copied().unwrap_or("");
    let remaining = separators.get(position + 1..).unwrap_or(&[]);

    let splits: Vec<&str> = if separator.is_empty() {
        text.split_inclusive(|_: char| true).collect()
    } else {
        text.split(separator).filter(|s| !s.is_empty()).collect()
    };

    let mut chunks = Vec::new();
    let mut fitting = Vec::new();

    for split in splits {
        if char_len(split) < config.chunk_size {
            fitting.push(split);
            continue;
        }

        if !fitting.is_empty() {
            chunks.extend(merge_splits(&fitting, separator, config));
            fitting.clear();
        }

        if remaining.is_empty() {
            chunks.push(split.to_string());
        } else {
            chunks.extend(split_recursive(split, remaining, config));
        }
    }

    if !fitting.is_empty() {
        chunks.extend(merge_splits(&fitting, separator, config));
    }

    chunks
}

/// Greedily pack splits into chunks, keeping up to `chunk_overlap`
/// characters of trailing splits at the start of the next chunk
fn merge_splits(splits: &[&str], separator: &str, config: &ChunkingConfig) -> Vec<String> {
    let separator_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0;

    for split in splits {
        let len = char_len(split);
        let joiner = if window.is_empty() { 0 } else { separator_len };

        if total + len + joiner > config.chunk_size && !window.is_empty() {
            push_joined(&mut chunks, &window, separator);

            while total > config.chunk_overlap
                || (total > 0
                    && total + len + if window.is_empty() { 0 } else { separator_len }
                        > config.chunk_size)
            {
                let Some(front) = window.pop_front() else {
                    break;
                };
                total -= char_len(front) + if window.is_empty() { 0 } else { separator_len };
            }
        }

        let joiner = if window.is_empty() { 0 } else { separator_len };
        window.push_back(split);
        total += len + joiner;
    }

    push_joined(&mut chunks, &window, separator);
    chunks
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Estimate token count using a simple heuristic
/// This is a rough approximation - actual tokenization would be more accurate
#[inline]
pub fn estimate_token_count(text: &str) -> usize {
    // Rough heuristic: 1 token ≈ 0.75 words for English text
    // Add extra tokens for punctuation and special characters
    let word_count = text.split_whitespace().count();
    let punct_count = text.chars().filter(|c| c.is_ascii_punctuation()).count();

    (punct_count as f64).mul_add(0.1, word_count as f64 / 0.75) as usize
}
