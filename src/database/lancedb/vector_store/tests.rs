use super::*;
use tempfile::TempDir;

fn create_test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    (config, temp_dir)
}

fn rows(vectors: &[[f32; 3]]) -> (Vec<Vec<f32>>, Vec<String>, Vec<String>) {
    let embeddings = vectors.iter().map(|v| v.to_vec()).collect();
    let ids = (0..vectors.len()).map(|i| i.to_string()).collect();
    let documents = (0..vectors.len())
        .map(|i| format!("chunk number {}", i))
        .collect();
    (embeddings, ids, documents)
}

#[tokio::test]
async fn store_initialization_creates_directory() {
    let (config, _temp_dir) = create_test_config();

    let store = VectorStore::new(&config)
        .await
        .expect("should open vector store");

    assert!(config.vector_database_path().is_dir());
    assert!(
        store
            .list_collections()
            .await
            .expect("should list collections")
            .is_empty()
    );
}

#[tokio::test]
async fn get_or_create_is_idempotent() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config).await.expect("should open store");

    let first = store
        .get_or_create_collection("openai_collections")
        .await
        .expect("should create collection");
    let second = store
        .get_or_create_collection("openai_collections")
        .await
        .expect("should reopen collection");

    assert_eq!(first.name(), second.name());
    assert_eq!(second.count().await.expect("should count"), 0);
    assert_eq!(
        store.list_collections().await.expect("should list"),
        vec!["openai_collections".to_string()]
    );
}

#[tokio::test]
async fn get_missing_collection_fails() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config).await.expect("should open store");

    let result = store.get_collection("nothing_here").await;
    assert!(matches!(result, Err(RagError::Database(_))));
}

#[tokio::test]
async fn add_and_query_nearest_first() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config).await.expect("should open store");
    let collection = store
        .get_or_create_collection("docs")
        .await
        .expect("should create collection");

    let (embeddings, ids, documents) = rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
    collection
        .add(&embeddings, &ids, &documents)
        .await
        .expect("should add rows");

    assert_eq!(collection.count().await.expect("should count"), 3);
    assert_eq!(collection.dimension().await.expect("should read dim"), 3);

    let result = collection
        .query(&[vec![0.0, 0.9, 0.1]], 2)
        .await
        .expect("should query");

    assert_eq!(result.documents.len(), 1);
    assert_eq!(result.documents[0].len(), 2);
    assert_eq!(result.documents[0][0], "chunk number 1");
    assert_eq!(result.ids[0][0], "1");
    assert!(result.distances[0][0] <= result.distances[0][1]);
}

#[tokio::test]
async fn query_limit_larger_than_collection() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config).await.expect("should open store");
    let collection = store
        .get_or_create_collection("docs")
        .await
        .expect("should create collection");

    let (embeddings, ids, documents) = rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    collection
        .add(&embeddings, &ids, &documents)
        .await
        .expect("should add rows");

    let result = collection
        .query(&[vec![1.0, 0.0, 0.0]], 10)
        .await
        .expect("should query");
    assert_eq!(result.documents[0].len(), 2);
}

#[tokio::test]
async fn query_empty_collection_returns_no_documents() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config).await.expect("should open store");
    let collection = store
        .get_or_create_collection("docs")
        .await
        .expect("should create collection");

    let result = collection
        .query(&[vec![0.5, 0.5, 0.5]], 10)
        .await
        .expect("empty collection should still answer");

    assert_eq!(result, QueryResult::empty(1));
}

#[tokio::test]
async fn query_dimension_mismatch_is_an_error() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config).await.expect("should open store");
    let collection = store
        .get_or_create_collection("docs")
        .await
        .expect("should create collection");

    let (embeddings, ids, documents) = rows(&[[1.0, 0.0, 0.0]]);
    collection
        .add(&embeddings, &ids, &documents)
        .await
        .expect("should add rows");

    let result = collection.query(&[vec![1.0, 0.0]], 10).await;
    assert!(matches!(result, Err(RagError::Database(_))));
}

#[tokio::test]
async fn add_rejects_inconsistent_rows() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config).await.expect("should open store");
    let collection = store
        .get_or_create_collection("docs")
        .await
        .expect("should create collection");

    let (embeddings, ids, _) = rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    let short_documents = vec!["only one".to_string()];
    assert!(
        collection
            .add(&embeddings, &ids, &short_documents)
            .await
            .is_err()
    );

    let duplicate_ids = vec!["7".to_string(), "7".to_string()];
    let documents = vec!["a".to_string(), "b".to_string()];
    assert!(
        collection
            .add(&embeddings, &duplicate_ids, &documents)
            .await
            .is_err()
    );

    let ragged = vec![vec![1.0, 0.0, 0.0], vec![1.0]];
    assert!(collection.add(&ragged, &ids, &documents).await.is_err());

    assert_eq!(collection.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn add_rejects_dimension_change_on_populated_collection() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config).await.expect("should open store");
    let collection = store
        .get_or_create_collection("docs")
        .await
        .expect("should create collection");

    let (embeddings, ids, documents) = rows(&[[1.0, 0.0, 0.0]]);
    collection
        .add(&embeddings, &ids, &documents)
        .await
        .expect("should add rows");

    let result = collection
        .add(&[vec![1.0, 2.0]], &["9".to_string()], &["other".to_string()])
        .await;
    assert!(matches!(result, Err(RagError::Database(_))));
    assert_eq!(collection.count().await.expect("should count"), 1);
}

#[tokio::test]
async fn delete_collection_then_recreate_is_empty() {
    let (config, _temp_dir) = create_test_config();
    let store = VectorStore::new(&config).await.expect("should open store");
    let collection = store
        .get_or_create_collection("docs")
        .await
        .expect("should create collection");

    let (embeddings, ids, documents) = rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
    collection
        .add(&embeddings, &ids, &documents)
        .await
        .expect("should add rows");

    store
        .delete_collection("docs")
        .await
        .expect("should delete collection");
    assert!(store.get_collection("docs").await.is_err());

    let recreated = store
        .get_or_create_collection("docs")
        .await
        .expect("should recreate collection");
    assert_eq!(recreated.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn rows_survive_reopening_the_store() {
    let (config, _temp_dir) = create_test_config();
    {
        let store = VectorStore::new(&config).await.expect("should open store");
        let collection = store
            .get_or_create_collection("docs")
            .await
            .expect("should create collection");
        let (embeddings, ids, documents) = rows(&[[1.0, 0.0, 0.0]]);
        collection
            .add(&embeddings, &ids, &documents)
            .await
            .expect("should add rows");
    }

    let store = VectorStore::new(&config).await.expect("should reopen store");
    let collection = store
        .get_collection("docs")
        .await
        .expect("collection should persist");
    assert_eq!(collection.count().await.expect("should count"), 1);
}

#[test]
fn oversized_dimension_is_rejected() {
    assert_eq!(list_size(1536).expect("should fit"), 1536);

    let oversized = usize::try_from(i32::MAX).expect("i32::MAX fits in usize") + 1;
    assert!(matches!(list_size(oversized), Err(RagError::Database(_))));
    assert!(matches!(create_schema(oversized), Err(RagError::Database(_))));
}
