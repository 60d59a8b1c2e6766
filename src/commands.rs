use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::chat::{
    ChatSession, ContextRetriever, Conversation, StreamingResponder, spawn_line_reader,
};
use crate::config::{ChatBackend, Config, Credentials};
use crate::database::{SimilaritySearch, VectorStore};
use crate::embeddings::{Embedder, EmbeddingClient};
use crate::ingest::Ingester;
use crate::providers::build_provider;

/// Split, embed and store a document, replacing the configured collection
#[inline]
pub async fn ingest_document(config_dir: &Path, path: &Path) -> Result<()> {
    let config = Config::load(config_dir)?;
    let credentials = Credentials::from_env();

    let embedder = EmbeddingClient::new(&config, &credentials)?;
    let store = VectorStore::new(&config)
        .await
        .context("Failed to open vector store")?;

    let stats = Ingester::new(Arc::new(embedder), store, &config)
        .ingest_file(path)
        .await
        .with_context(|| format!("Failed to ingest {}", path.display()))?;

    println!(
        "Ingested {} ({} characters) into '{}'",
        path.display(),
        stats.characters,
        stats.collection
    );
    println!("  Chunks stored: {}", stats.chunks);
    println!("  Estimated tokens: {}", stats.estimated_tokens);
    println!("  Vector dimension: {}", stats.dimension);

    Ok(())
}

/// Run the interactive chat loop on stdin/stdout
#[inline]
pub async fn run_chat(config_dir: &Path, provider: Option<ChatBackend>) -> Result<()> {
    let config = Config::load(config_dir)?;
    let credentials = Credentials::from_env();
    let backend = provider.unwrap_or(config.chat.provider);

    // resolve every credential before touching the store so a missing key fails fast
    let embedder = EmbeddingClient::new(&config, &credentials)?;
    let provider = build_provider(&config, backend, &credentials)?;

    let store = VectorStore::new(&config)
        .await
        .context("Failed to open vector store")?;
    let collection = store
        .get_collection(&config.retrieval.collection)
        .await?;
    let chunks = collection.count().await?;
    if chunks == 0 {
        println!(
            "Collection '{}' is empty; answers will have no retrieved context.",
            collection.name()
        );
    }
    info!(
        "Chatting over {} chunks in '{}'",
        chunks,
        collection.name()
    );

    let retriever = ContextRetriever::new(
        Arc::new(embedder) as Arc<dyn Embedder>,
        Arc::new(collection) as Arc<dyn SimilaritySearch>,
        config.retrieval.top_k,
    );
    let mut session = ChatSession::new(
        retriever,
        StreamingResponder::new(provider),
        Conversation::from_config(&config.conversation),
        Duration::from_secs(config.network.turn_timeout_seconds),
    );

    println!(
        "Chatting with {} ({}). Type 'exit' to quit.",
        backend_label(backend),
        config.chat.model_for(backend)
    );

    let input = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
    let mut stdout = std::io::stdout();
    session.run(input, &mut stdout).await?;

    Ok(())
}

/// Print the configured collection and how many chunks it holds
#[inline]
pub async fn show_status(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir)?;
    let store = VectorStore::new(&config)
        .await
        .context("Failed to open vector store")?;

    println!("Configuration: {}", config.config_file_path().display());
    println!("Vector store: {}", config.vector_database_path().display());
    println!(
        "Embeddings: {:?} ({})",
        config.embedding.provider, config.embedding.model
    );
    println!(
        "Chat: {} ({})",
        backend_label(config.chat.provider),
        config.chat.model_for(config.chat.provider)
    );

    let collections = store.list_collections().await?;
    if collections.contains(&config.retrieval.collection) {
        let collection = store.get_collection(&config.retrieval.collection).await?;
        println!(
            "Collection '{}': {} chunks, {} dimensions",
            collection.name(),
            collection.count().await?,
            collection.dimension().await?
        );
    } else {
        println!(
            "Collection '{}' has not been created yet. Run 'schema-rag ingest' first.",
            config.retrieval.collection
        );
    }

    let others: Vec<&String> = collections
        .iter()
        .filter(|name| **name != config.retrieval.collection)
        .collect();
    if !others.is_empty() {
        println!("Other collections: {}", itertools::join(others, ", "));
    }

    Ok(())
}

fn backend_label(backend: ChatBackend) -> &'static str {
    match backend {
        ChatBackend::Claude => "Claude",
        ChatBackend::Mistral => "Mistral",
    }
}
