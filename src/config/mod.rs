// Configuration management module
// TOML settings, credentials from the environment, and the interactive editor

pub mod credentials;
pub mod interactive;
pub mod settings;

pub use credentials::Credentials;
pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    ChatBackend, ChatConfig, Config, ConfigError, ConversationConfig, EmbeddingBackend,
    EmbeddingConfig, NetworkConfig, RetrievalConfig,
};

/// Default configuration directory (`~/.schema-rag`)
#[inline]
pub fn default_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(".schema-rag"))
        .or({
            #[cfg(windows)]
            {
                dirs::data_dir().map(|data| data.join("schema-rag"))
            }
            #[cfg(not(windows))]
            {
                None
            }
        })
        .ok_or(ConfigError::DirectoryError)
}
