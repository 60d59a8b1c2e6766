// Database module
// LanceDB-backed collections of embedded document chunks

pub mod lancedb;

pub use self::lancedb::{Collection, QueryResult, SimilaritySearch, VectorStore};
