
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{ChatBackend, Config, Credentials, EmbeddingBackend};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Schema RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Embeddings").bold().yellow());
    eprintln!("Choose the API used to embed documents and questions.");
    eprintln!();
    configure_embedding(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Chat").bold().yellow());
    configure_chat(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Checking credentials...").yellow());
    report_credentials(&config, &Credentials::from_env());

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embeddings:").bold().yellow());
    eprintln!(
        "  Provider: {}",
        style(format!("{:?}", config.embedding.provider)).cyan()
    );
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());

    eprintln!();
    eprintln!("{}", style("Chat:").bold().yellow());
    eprintln!(
        "  Provider: {}",
        style(format!("{:?}", config.chat.provider)).cyan()
    );
    eprintln!(
        "  Model: {}",
        style(config.chat.model_for(config.chat.provider)).cyan()
    );
    eprintln!("  Max Tokens: {}", style(config.chat.max_tokens).cyan());

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!("  Collection: {}", style(&config.retrieval.collection).cyan());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  History Limit: {} messages",
        style(config.conversation.max_history_messages).cyan()
    );

    eprintln!();
    report_credentials(&config, &Credentials::from_env());

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            Ok(Config {
                base_dir: config_dir.to_path_buf(),
                ..Config::default()
            })
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_embedding(config: &mut Config) -> Result<()> {
    let providers = &["openai", "mistral"];
    let default_index = match config.embedding.provider {
        EmbeddingBackend::OpenAi => 0,
        EmbeddingBackend::Mistral => 1,
    };

    let provider_index = Select::new()
        .with_prompt("Embedding provider")
        .default(default_index)
        .items(providers)
        .interact()?;

    let provider = if provider_index == 0 {
        EmbeddingBackend::OpenAi
    } else {
        EmbeddingBackend::Mistral
    };

    let default_model = if provider == config.embedding.provider {
        config.embedding.model.clone()
    } else {
        default_embedding_model(provider).to_string()
    };

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(default_model)
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(config.embedding.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 2048 {
                Err("Batch size must be 2048 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.embedding.provider = provider;
    config.embedding.set_model(model)?;
    config.embedding.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_chat(config: &mut Config) -> Result<()> {
    let providers = &["claude", "mistral"];
    let default_index = match config.chat.provider {
        ChatBackend::Claude => 0,
        ChatBackend::Mistral => 1,
    };

    let provider_index = Select::new()
        .with_prompt("Chat provider")
        .default(default_index)
        .items(providers)
        .interact()?;

    config.chat.provider = if provider_index == 0 {
        ChatBackend::Claude
    } else {
        ChatBackend::Mistral
    };

    let top_k: usize = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(config.retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=100).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 100")
            }
        })
        .interact_text()?;

    let history: usize = Input::new()
        .with_prompt("Messages of history sent with each question")
        .default(config.conversation.max_history_messages)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (2..=1000).contains(input) {
                Ok(())
            } else {
                Err("Must be between 2 and 1000")
            }
        })
        .interact_text()?;

    config.retrieval.set_top_k(top_k)?;
    config.conversation.set_max_history_messages(history)?;

    Ok(())
}

fn default_embedding_model(provider: EmbeddingBackend) -> &'static str {
    match provider {
        EmbeddingBackend::OpenAi => "text-embedding-3-small",
        EmbeddingBackend::Mistral => "mistral-embed",
    }
}

fn report_credentials(config: &Config, credentials: &Credentials) {
    let checks = [
        (
            "Embedding API key",
            credentials.embedding_key(config.embedding.provider).err(),
        ),
        (
            "Chat API key",
            credentials.chat_key(config.chat.provider).err(),
        ),
    ];

    for (label, missing) in checks {
        match missing {
            None => eprintln!("  {}: {}", label, style("✓ set").green()),
            Some(e) => eprintln!("  {}: {}", label, style(format!("⚠ {}", e)).yellow()),
        }
    }
}
