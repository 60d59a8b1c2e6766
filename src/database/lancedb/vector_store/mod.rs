#[cfg(test)]
mod tests;

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use tracing::{debug, info};

use super::{QueryResult, SimilaritySearch};
use crate::config::Config;
use crate::{RagError, Result};

/// Dimension given to a collection created before any vectors are known.
/// The table is recreated with the real dimension on the first insert.
const PLACEHOLDER_DIMENSION: usize = 1536;

/// Embedded LanceDB database holding named collections
pub struct VectorStore {
    connection: Connection,
}

/// A named table of `{id, vector, document}` rows
#[derive(Clone)]
pub struct Collection {
    connection: Connection,
    name: String,
}

impl VectorStore {
    /// Open (or create) the database under `<base_dir>/vectors`
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        let db_path = config.vector_database_path();
        debug!("Opening LanceDB at {}", db_path.display());

        std::fs::create_dir_all(&db_path).map_err(|e| {
            RagError::Database(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self { connection })
    }

    /// Names of all collections in the database
    #[inline]
    pub async fn list_collections(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to list tables: {}", e)))
    }

    /// Open a collection, creating an empty one if it does not exist
    #[inline]
    pub async fn get_or_create_collection(&self, name: &str) -> Result<Collection> {
        if !self.list_collections().await?.iter().any(|t| t == name) {
            info!("Creating collection '{}'", name);
            self.connection
                .create_empty_table(name, create_schema(PLACEHOLDER_DIMENSION)?)
                .execute()
                .await
                .map_err(|e| RagError::Database(format!("Failed to create table: {}", e)))?;
        }

        Ok(self.collection_handle(name))
    }

    /// Open an existing collection
    #[inline]
    pub async fn get_collection(&self, name: &str) -> Result<Collection> {
        if !self.list_collections().await?.iter().any(|t| t == name) {
            return Err(RagError::Database(format!(
                "Collection '{}' does not exist; run the ingest command first",
                name
            )));
        }

        Ok(self.collection_handle(name))
    }

    /// Drop a collection and all of its rows
    #[inline]
    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        info!("Deleting collection '{}'", name);
        self.connection
            .drop_table(name)
            .await
            .map_err(|e| RagError::Database(format!("Failed to drop table '{}': {}", name, e)))
    }

    fn collection_handle(&self, name: &str) -> Collection {
        Collection {
            connection: self.connection.clone(),
            name: name.to_string(),
        }
    }
}

impl Collection {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(&self.name)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to open table '{}': {}", self.name, e)))
    }

    /// Number of rows stored in the collection
    #[inline]
    pub async fn count(&self) -> Result<usize> {
        self.open()
            .await?
            .count_rows(None)
            .await
            .map_err(|e| RagError::Database(format!("Failed to count rows: {}", e)))
    }

    /// Vector dimension of the collection's schema
    #[inline]
    pub async fn dimension(&self) -> Result<usize> {
        let schema = self
            .open()
            .await?
            .schema()
            .await
            .map_err(|e| RagError::Database(format!("Failed to get table schema: {}", e)))?;

        let field = schema
            .field_with_name("vector")
            .map_err(|e| RagError::Database(format!("Missing vector column: {}", e)))?;

        match field.data_type() {
            DataType::FixedSizeList(_, size) => usize::try_from(*size)
                .map_err(|e| RagError::Database(format!("Invalid vector dimension: {}", e))),
            other => Err(RagError::Database(format!(
                "Vector column has unexpected type {:?}",
                other
            ))),
        }
    }

    /// Add rows to the collection. The three inputs are parallel lists.
    #[inline]
    pub async fn add(
        &self,
        embeddings: &[Vec<f32>],
        ids: &[String],
        documents: &[String],
    ) -> Result<()> {
        let dimension = validate_rows(embeddings, ids, documents)?;
        let Some(dimension) = dimension else {
            debug!("No rows to add to '{}'", self.name);
            return Ok(());
        };

        let current = self.dimension().await?;
        if current != dimension {
            if self.count().await? > 0 {
                return Err(RagError::Database(format!(
                    "Collection '{}' stores {}-dimensional vectors, got {}",
                    self.name, current, dimension
                )));
            }
            info!(
                "Recreating empty collection '{}' with dimension {}",
                self.name, dimension
            );
            self.connection
                .drop_table(&self.name)
                .await
                .map_err(|e| RagError::Database(format!("Failed to drop table: {}", e)))?;
            self.connection
                .create_empty_table(&self.name, create_schema(dimension)?)
                .execute()
                .await
                .map_err(|e| RagError::Database(format!("Failed to create table: {}", e)))?;
        }

        let batch = create_record_batch(embeddings, ids, documents, dimension)?;
        let schema = batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(batch)), schema);

        self.open()
            .await?
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to insert rows: {}", e)))?;

        info!("Added {} rows to '{}'", ids.len(), self.name);
        Ok(())
    }

    async fn query_one(
        &self,
        embedding: &[f32],
        n_results: usize,
    ) -> Result<(Vec<String>, Vec<String>, Vec<f32>)> {
        let results = self
            .open()
            .await?
            .vector_search(embedding)
            .map_err(|e| RagError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .limit(n_results)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to execute search: {}", e)))?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .map_err(|e| RagError::Database(format!("Failed to read result stream: {}", e)))?;

        let mut ids = Vec::new();
        let mut documents = Vec::new();
        let mut distances = Vec::new();
        for batch in &batches {
            parse_search_batch(batch, &mut ids, &mut documents, &mut distances)?;
        }

        Ok((ids, documents, distances))
    }
}

#[async_trait]
impl SimilaritySearch for Collection {
    async fn query(&self, query_embeddings: &[Vec<f32>], n_results: usize) -> Result<QueryResult> {
        if n_results == 0 || self.count().await? == 0 {
            return Ok(QueryResult::empty(query_embeddings.len()));
        }

        let dimension = self.dimension().await?;
        let mut result = QueryResult::default();
        for embedding in query_embeddings {
            if embedding.len() != dimension {
                return Err(RagError::Database(format!(
                    "Query vector has dimension {}, collection '{}' stores {}",
                    embedding.len(),
                    self.name,
                    dimension
                )));
            }
            let (ids, documents, distances) = self.query_one(embedding, n_results).await?;
            result.push_query(ids, documents, distances);
        }

        debug!(
            "Query on '{}' returned {} documents",
            self.name,
            result.len()
        );
        Ok(result)
    }
}

/// Arrow list sizes are `i32`
fn list_size(dimension: usize) -> Result<i32> {
    i32::try_from(dimension).map_err(|_| {
        RagError::Database(format!("Vector dimension {} is too large", dimension))
    })
}

fn create_schema(dimension: usize) -> Result<Arc<Schema>> {
    Ok(Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                list_size(dimension)?,
            ),
            false,
        ),
        Field::new("document", DataType::Utf8, false),
    ])))
}

/// Check the parallel inputs line up and return the shared vector dimension
fn validate_rows(
    embeddings: &[Vec<f32>],
    ids: &[String],
    documents: &[String],
) -> Result<Option<usize>> {
    if embeddings.len() != ids.len() || ids.len() != documents.len() {
        return Err(RagError::Database(format!(
            "Mismatched row inputs: {} embeddings, {} ids, {} documents",
            embeddings.len(),
            ids.len(),
            documents.len()
        )));
    }

    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(duplicate) = ids.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(RagError::Database(format!("Duplicate id '{}'", duplicate)));
    }

    let Some(first) = embeddings.first() else {
        return Ok(None);
    };
    let dimension = first.len();
    if dimension == 0 {
        return Err(RagError::Database("Embeddings must not be empty".to_string()));
    }
    if let Some(position) = embeddings.iter().position(|e| e.len() != dimension) {
        return Err(RagError::Database(format!(
            "Embedding {} has dimension {}, expected {}",
            position,
            embeddings.get(position).map_or(0, Vec::len),
            dimension
        )));
    }

    Ok(Some(dimension))
}

fn create_record_batch(
    embeddings: &[Vec<f32>],
    ids: &[String],
    documents: &[String],
    dimension: usize,
) -> Result<RecordBatch> {
    let flat_values: Vec<f32> = embeddings.iter().flatten().copied().collect();
    let field = Arc::new(Field::new("item", DataType::Float32, true));
    let vector_array = FixedSizeListArray::try_new(
        field,
        list_size(dimension)?,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| RagError::Database(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from_iter_values(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from_iter_values(documents)),
    ];

    RecordBatch::try_new(create_schema(dimension)?, arrays)
        .map_err(|e| RagError::Database(format!("Failed to create record batch: {}", e)))
}

fn parse_search_batch(
    batch: &RecordBatch,
    ids: &mut Vec<String>,
    documents: &mut Vec<String>,
    distances: &mut Vec<f32>,
) -> Result<()> {
    let id_column = string_column(batch, "id")?;
    let document_column = string_column(batch, "document")?;
    let distance_column = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    for row in 0..batch.num_rows() {
        ids.push(id_column.value(row).to_string());
        documents.push(document_column.value(row).to_string());
        distances.push(
            distance_column.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) }),
        );
    }

    Ok(())
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}
