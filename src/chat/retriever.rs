use std::sync::Arc;

use itertools::Itertools;
use tracing::debug;

use crate::database::SimilaritySearch;
use crate::embeddings::Embedder;
use crate::{RagError, Result};

/// Finds the stored chunks closest to a question
pub struct ContextRetriever {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn SimilaritySearch>,
    top_k: usize,
}

impl ContextRetriever {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn SimilaritySearch>, top_k: usize) -> Self {
        Self {
            embedder,
            store,
            top_k,
        }
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embed `query` and return the `top_k` nearest chunks joined by newlines,
    /// in the store's rank order. Fails if no embedding comes back.
    #[inline]
    pub async fn retrieve(&self, query: &str) -> Result<String> {
        let embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .filter(|vector| !vector.is_empty())
            .ok_or_else(|| RagError::Embedding("No embedding returned for query".to_string()))?;

        let result = self.store.query(&[embedding], self.top_k).await?;
        debug!("Retrieved {} chunks for query", result.len());

        Ok(result.documents.iter().flatten().join("\n"))
    }
}
