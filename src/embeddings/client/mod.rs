#[cfg(test)]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use super::Embedder;
use crate::config::{Config, Credentials};
use crate::http::HttpClient;
use crate::{RagError, Result};

/// Client for OpenAI-compatible `/v1/embeddings` endpoints (OpenAI, Mistral)
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    http: HttpClient,
    endpoint: Url,
    model: String,
    batch_size: usize,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl EmbeddingClient {
    #[inline]
    pub fn new(config: &Config, credentials: &Credentials) -> Result<Self> {
        let backend = config.embedding.provider;
        let api_key = credentials.embedding_key(backend)?.to_string();
        let endpoint = config
            .network
            .embedding_base_url(backend)
            .join("v1/embeddings")
            .map_err(|e| RagError::Config(format!("Invalid embedding URL: {}", e)))?;

        let http = HttpClient::new(
            Duration::from_secs(config.network.timeout_seconds),
            config.network.retry_attempts,
        );

        Ok(Self {
            http,
            endpoint,
            model: config.embedding.model.clone(),
            batch_size: config.embedding.batch_size as usize,
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

    /// Generate the embedding for a single text
    #[inline]
    pub fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        self.generate_embeddings(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("Provider returned no embedding".to_string()))
    }

    /// Generate embeddings for many texts, `batch_size` inputs per request
    #[inline]
    pub fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size.max(1)) {
            results.extend(self.generate_single_batch(batch)?);
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }

    fn generate_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::Embedding(format!("Failed to serialize request: {}", e)))?;

        let response_text = self.http.post_json(
            &self.endpoint,
            &[("Authorization", format!("Bearer {}", self.api_key))],
            &request_json,
        )?;

        let response: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Embedding(format!("Failed to parse response: {}", e)))?;

        order_by_index(response.data, texts.len())
    }
}

/// Put vectors back into input order using the index each one is tagged with
fn order_by_index(data: Vec<EmbeddingData>, expected: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(RagError::Embedding(format!(
            "Mismatch between request and response counts: {} vs {}",
            expected,
            data.len()
        )));
    }

    let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
    for item in data {
        let slot = slots.get_mut(item.index).ok_or_else(|| {
            RagError::Embedding(format!("Embedding index {} out of range", item.index))
        })?;
        if slot.is_some() {
            return Err(RagError::Embedding(format!(
                "Duplicate embedding index {}",
                item.index
            )));
        }
        if item.embedding.is_empty() {
            return Err(RagError::Embedding(format!(
                "Empty embedding at index {}",
                item.index
            )));
        }
        *slot = Some(item.embedding);
    }

    // every slot is filled: counts match and indices are unique and in range
    Ok(slots.into_iter().flatten().collect())
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let client = self.clone();
        let inputs = inputs.to_vec();
        tokio::task::spawn_blocking(move || client.generate_embeddings(&inputs))
            .await
            .map_err(|e| RagError::Embedding(format!("Embedding task failed: {}", e)))?
    }
}
