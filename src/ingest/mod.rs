// Ingest module
// Splits a document into chunks, embeds them and replaces the stored collection


use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::{ChunkingConfig, Embedder, estimate_token_count, split_text};
use crate::{RagError, Result};

/// Summary of one ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub collection: String,
    pub characters: usize,
    pub chunks: usize,
    pub estimated_tokens: usize,
    pub dimension: usize,
}

/// Loads a document into the vector store, replacing any previous contents
pub struct Ingester {
    embedder: Arc<dyn Embedder>,
    store: VectorStore,
    chunking: ChunkingConfig,
    collection: String,
    batch_size: usize,
    show_progress: bool,
}

impl Ingester {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, store: VectorStore, config: &Config) -> Self {
        Self {
            embedder,
            store,
            chunking: config.chunking.clone(),
            collection: config.retrieval.collection.clone(),
            batch_size: (config.embedding.batch_size as usize).max(1),
            show_progress: console::user_attended_stderr(),
        }
    }

    #[inline]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    #[inline]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Read a UTF-8 file and ingest its contents
    #[inline]
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestStats> {
        info!("Ingesting {}", path.display());
        let text = tokio::fs::read_to_string(path).await?;
        self.ingest_text(&text).await
    }

    /// Split, embed and store `text`. The collection is only reset once every
    /// chunk has been embedded, so a failed run leaves the old contents intact.
    #[inline]
    pub async fn ingest_text(&self, text: &str) -> Result<IngestStats> {
        let chunks = split_text(text, &self.chunking);
        if chunks.is_empty() {
            return Err(RagError::Other(anyhow!("Document contains no text to ingest")));
        }
        debug!("Split document into {} chunks", chunks.len());

        let embeddings = self.embed_chunks(&chunks).await?;
        let dimension = embeddings.first().map_or(0, Vec::len);

        if self
            .store
            .list_collections()
            .await?
            .contains(&self.collection)
        {
            debug!("Replacing existing collection '{}'", self.collection);
            self.store.delete_collection(&self.collection).await?;
        }

        let ids: Vec<String> = (0..chunks.len()).map(|i| i.to_string()).collect();
        let collection = self.store.get_or_create_collection(&self.collection).await?;
        collection.add(&embeddings, &ids, &chunks).await?;

        let stats = IngestStats {
            collection: self.collection.clone(),
            characters: text.chars().count(),
            chunks: chunks.len(),
            estimated_tokens: chunks.iter().map(|c| estimate_token_count(c)).sum(),
            dimension,
        };
        info!(
            "Stored {} chunks ({} dimensions) in '{}'",
            stats.chunks, stats.dimension, stats.collection
        );
        Ok(stats)
    }

    async fn embed_chunks(&self, chunks: &[String]) -> Result<Vec<Vec<f32>>> {
        let bar = if self.show_progress {
            ProgressBar::new(chunks.len() as u64).with_style(
                ProgressStyle::with_template("{bar:40} [{pos}/{len}] Embedding chunks")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut embeddings = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let vectors = self.embedder.embed(batch).await?;
            if vectors.len() != batch.len() {
                bar.abandon();
                return Err(RagError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }
            embeddings.extend(vectors);
            bar.inc(batch.len() as u64);
        }

        bar.finish_and_clear();
        Ok(embeddings)
    }
}
