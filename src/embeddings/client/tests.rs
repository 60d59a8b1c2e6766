use super::*;
use crate::config::EmbeddingBackend;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(server_uri: &str, batch_size: u32) -> Config {
    let mut config = Config::default();
    config.embedding.batch_size = batch_size;
    config.network.openai_base_url = Url::parse(server_uri).expect("mock url should parse");
    config.network.mistral_base_url = Url::parse(server_uri).expect("mock url should parse");
    config
}

fn test_credentials() -> Credentials {
    Credentials::new(
        Some("sk-openai".to_string()),
        Some("sk-mistral".to_string()),
        None,
    )
}

fn test_client(config: &Config) -> EmbeddingClient {
    EmbeddingClient::new(config, &test_credentials())
        .expect("client should build")
        .with_http_client(
            HttpClient::new(Duration::from_secs(5), 2).with_backoff_unit(Duration::ZERO),
        )
}

#[test]
fn client_configuration() {
    let config = test_config("http://localhost:9999", 32);
    let client = test_client(&config);

    assert_eq!(client.model(), "text-embedding-3-small");
    assert_eq!(client.batch_size, 32);
    assert_eq!(client.endpoint.as_str(), "http://localhost:9999/v1/embeddings");
    assert_eq!(client.api_key, "sk-openai");
}

#[test]
fn mistral_backend_uses_mistral_key() {
    let mut config = test_config("http://localhost:9999", 32);
    config.embedding.provider = EmbeddingBackend::Mistral;
    config.embedding.model = "mistral-embed".to_string();

    let client = test_client(&config);
    assert_eq!(client.api_key, "sk-mistral");
    assert_eq!(client.model(), "mistral-embed");
}

#[test]
fn missing_key_fails_fast() {
    let config = Config::default();
    let result = EmbeddingClient::new(&config, &Credentials::default());
    assert!(matches!(result, Err(RagError::MissingCredential(ref var)) if var == "OPENAI_API_KEY"));
}

#[test]
fn order_by_index_restores_input_order() {
    let data = vec![
        EmbeddingData {
            embedding: vec![2.0],
            index: 1,
        },
        EmbeddingData {
            embedding: vec![1.0],
            index: 0,
        },
    ];

    let ordered = order_by_index(data, 2).expect("indices are valid");
    assert_eq!(ordered, vec![vec![1.0], vec![2.0]]);
}

#[test]
fn order_by_index_rejects_bad_responses() {
    let duplicate = vec![
        EmbeddingData {
            embedding: vec![1.0],
            index: 0,
        },
        EmbeddingData {
            embedding: vec![1.0],
            index: 0,
        },
    ];
    assert!(order_by_index(duplicate, 2).is_err());

    let out_of_range = vec![EmbeddingData {
        embedding: vec![1.0],
        index: 3,
    }];
    assert!(order_by_index(out_of_range, 1).is_err());

    let empty_vector = vec![EmbeddingData {
        embedding: vec![],
        index: 0,
    }];
    assert!(order_by_index(empty_vector, 1).is_err());

    assert!(order_by_index(Vec::new(), 1).is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn embeds_query_through_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer sk-openai"))
        .and(body_partial_json(json!({
            "model": "text-embedding-3-small",
            "input": ["What fields does a validator need?"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3]}],
            "model": "text-embedding-3-small"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&test_config(&server.uri(), 16));
    let vectors = client
        .embed(&["What fields does a validator need?".to_string()])
        .await
        .expect("embedding should succeed");

    assert_eq!(vectors, vec![vec![0.1, 0.2, 0.3]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn splits_inputs_into_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({"input": ["a", "b"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [2.0, 2.0]},
                {"index": 0, "embedding": [1.0, 1.0]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({"input": ["c"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [3.0, 3.0]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&test_config(&server.uri(), 2));
    let inputs = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let vectors = client.embed(&inputs).await.expect("embedding should succeed");

    assert_eq!(
        vectors,
        vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_data_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let client = test_client(&test_config(&server.uri(), 16));
    let result = client.embed(&["question".to_string()]).await;

    assert!(matches!(result, Err(RagError::Embedding(_))));
}

#[tokio::test]
async fn empty_input_makes_no_request() {
    let client = test_client(&test_config("http://127.0.0.1:9", 16));
    let vectors = client.embed(&[]).await.expect("nothing to embed");
    assert!(vectors.is_empty());
}
