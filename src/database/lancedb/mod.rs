// LanceDB vector database module
// Handles vector storage and similarity search for embedded chunks


pub mod vector_store;

use async_trait::async_trait;

pub use vector_store::{Collection, VectorStore};

use crate::Result;

/// Nearest-neighbour results, one inner list per query embedding, in rank order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub ids: Vec<Vec<String>>,
    pub documents: Vec<Vec<String>>,
    pub distances: Vec<Vec<f32>>,
}

impl QueryResult {
    /// Result with an empty list for each of `queries` query embeddings
    #[inline]
    pub fn empty(queries: usize) -> Self {
        Self {
            ids: vec![Vec::new(); queries],
            documents: vec![Vec::new(); queries],
            distances: vec![Vec::new(); queries],
        }
    }

    #[inline]
    pub fn push_query(&mut self, ids: Vec<String>, documents: Vec<String>, distances: Vec<f32>) {
        self.ids.push(ids);
        self.documents.push(documents);
        self.distances.push(distances);
    }

    /// Total number of documents across all queries
    #[inline]
    pub fn len(&self) -> usize {
        self.documents.iter().map(Vec::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read side of a collection: nearest-neighbour lookup by embedding
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    async fn query(&self, query_embeddings: &[Vec<f32>], n_results: usize) -> Result<QueryResult>;
}
