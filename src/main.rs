use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use schema_rag::commands::{ingest_document, run_chat, show_status};
use schema_rag::config::{ChatBackend, default_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "schema-rag")]
#[command(about = "Chat with a JSON-schema design assistant grounded in your own documentation")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the vector store (default: ~/.schema-rag)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure embedding and chat providers
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Split, embed and store a document, replacing the collection
    Ingest {
        /// Path of the document to ingest
        #[arg(default_value = "doc.md")]
        path: PathBuf,
    },
    /// Start the interactive chat loop
    Chat {
        /// Chat provider for this session, overriding the configured one
        #[arg(long, value_enum)]
        provider: Option<ChatBackend>,
    },
    /// Show the configured collection and how many chunks it holds
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => default_config_dir()?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Ingest { path } => {
            ingest_document(&config_dir, &path).await?;
        }
        Commands::Chat { provider } => {
            run_chat(&config_dir, provider).await?;
        }
        Commands::Status => {
            show_status(&config_dir).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["schema-rag", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Status));
            assert_eq!(parsed.config_dir, None);
        }
    }

    #[test]
    fn ingest_defaults_to_doc_md() {
        let parsed = Cli::try_parse_from(["schema-rag", "ingest"]).expect("should parse");
        if let Commands::Ingest { path } = parsed.command {
            assert_eq!(path, PathBuf::from("doc.md"));
        } else {
            panic!("expected ingest command");
        }
    }

    #[test]
    fn ingest_with_path() {
        let parsed =
            Cli::try_parse_from(["schema-rag", "ingest", "docs/schema.md"]).expect("should parse");
        if let Commands::Ingest { path } = parsed.command {
            assert_eq!(path, PathBuf::from("docs/schema.md"));
        } else {
            panic!("expected ingest command");
        }
    }

    #[test]
    fn chat_provider_override() {
        let parsed = Cli::try_parse_from(["schema-rag", "chat", "--provider", "mistral"])
            .expect("should parse");
        if let Commands::Chat { provider } = parsed.command {
            assert_eq!(provider, Some(ChatBackend::Mistral));
        } else {
            panic!("expected chat command");
        }

        let parsed = Cli::try_parse_from(["schema-rag", "chat"]).expect("should parse");
        assert!(matches!(parsed.command, Commands::Chat { provider: None }));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let cli = Cli::try_parse_from(["schema-rag", "chat", "--provider", "gpt"]);
        assert!(matches!(cli, Err(ref err) if err.kind() == ErrorKind::InvalidValue));
    }

    #[test]
    fn global_config_dir() {
        let parsed = Cli::try_parse_from(["schema-rag", "status", "--config-dir", "/tmp/rag"])
            .expect("should parse");
        assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/rag")));
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["schema-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["schema-rag", "serve"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["schema-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
