// Embeddings module
// Document splitting and the remote embedding API

pub mod chunking;
pub mod client;

use async_trait::async_trait;

pub use chunking::{ChunkingConfig, estimate_token_count, split_text};
pub use client::EmbeddingClient;

use crate::Result;

/// Anything that can turn text into fixed-dimension vectors.
///
/// Implementations return exactly one vector per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;
}
