//! Configuration error types.

use std::path::PathBuf;

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while reading, editing or writing `client.yaml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid client config YAML.
    #[error("invalid client config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A context was named that the file does not define.
    #[error("no context named '{name}' (known: {known})")]
    ContextNotFound { name: String, known: String },

    /// Neither `EXPENSA_CONFIG_DIR` nor a platform config dir is available.
    #[error("cannot determine the expensa config directory; set EXPENSA_CONFIG_DIR")]
    NoConfigDir,
}

impl ConfigError {
    pub(crate) fn context_not_found(name: &str, known: &[&str]) -> Self {
        let known = if known.is_empty() {
            "none".to_string()
        } else {
            known.join(", ")
        };
        Self::ContextNotFound {
            name: name.to_string(),
            known,
        }
    }
}
