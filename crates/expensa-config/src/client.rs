//! The `client.yaml` file: named backend contexts plus shared defaults.
//!
//! ```yaml
//! current-context: local
//!
//! contexts:
//!   - name: local
//!     server: http://localhost:8080/api/v1
//!   - name: staging
//!     server: https://expensa.staging.example.com/api/v1
//!     timeout: 60
//!     refresh-timeout: 5
//!
//! defaults:
//!   timeout: 30
//!   refresh-timeout: 10
//! ```
//!
//! Timeouts are whole seconds. A context's own value wins over `defaults`,
//! which win over the built-in values. Zero counts as unset.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Server used when no context is selected.
pub const DEFAULT_SERVER: &str = "http://localhost:8080/api/v1";

/// Built-in request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Built-in session refresh timeout, in seconds.
pub const DEFAULT_REFRESH_TIMEOUT_SECS: u64 = 10;

/// Parsed `client.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_context: Option<String>,

    #[serde(default)]
    pub contexts: Vec<Context>,

    #[serde(default)]
    pub defaults: ClientDefaults,
}

/// Connection settings with every fallback applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    /// `None` when no context was selected.
    pub name: Option<String>,
    pub server: String,
    pub timeout: Duration,
    pub refresh_timeout: Duration,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// The selected context. A dangling `current-context` counts as none.
    pub fn current(&self) -> Option<&Context> {
        self.get_context(self.current_context.as_deref()?)
    }

    pub fn get_context(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == name)
    }

    /// Insert `context`, replacing any context with the same name in place.
    pub fn set_context(&mut self, context: Context) {
        match self.contexts.iter_mut().find(|c| c.name == context.name) {
            Some(slot) => *slot = context,
            None => self.contexts.push(context),
        }
    }

    /// Remove a context, unselecting it if it was current.
    pub fn remove_context(&mut self, name: &str) -> Option<Context> {
        let index = self.contexts.iter().position(|c| c.name == name)?;
        if self.current_context.as_deref() == Some(name) {
            self.current_context = None;
        }
        Some(self.contexts.remove(index))
    }

    /// Select `name` as the current context.
    pub fn use_context(&mut self, name: &str) -> Result<()> {
        if self.get_context(name).is_none() {
            return Err(ConfigError::context_not_found(name, &self.context_names()));
        }
        self.current_context = Some(name.to_string());
        Ok(())
    }

    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.iter().map(|c| c.name.as_str()).collect()
    }

    /// Settings for `name`, or for the current context when `name` is `None`.
    ///
    /// Naming an unknown context is an error; having no current context is
    /// not, and yields the built-in server.
    pub fn resolve(&self, name: Option<&str>) -> Result<ResolvedContext> {
        let context = match name {
            Some(name) => Some(
                self.get_context(name)
                    .ok_or_else(|| ConfigError::context_not_found(name, &self.context_names()))?,
            ),
            None => self.current(),
        };

        let secs = |own: Option<u64>, default: u64, builtin: u64| {
            let positive = |s: &u64| *s > 0;
            Duration::from_secs(
                own.filter(positive)
                    .or(Some(default).filter(positive))
                    .unwrap_or(builtin),
            )
        };
        let timeout = |own| secs(own, self.defaults.timeout, DEFAULT_TIMEOUT_SECS);
        let refresh_timeout = |own| {
            secs(
                own,
                self.defaults.refresh_timeout,
                DEFAULT_REFRESH_TIMEOUT_SECS,
            )
        };
        Ok(match context {
            Some(context) => ResolvedContext {
                name: Some(context.name.clone()),
                server: context.server.clone(),
                timeout: timeout(context.timeout),
                refresh_timeout: refresh_timeout(context.refresh_timeout),
            },
            None => ResolvedContext {
                name: None,
                server: DEFAULT_SERVER.to_string(),
                timeout: timeout(None),
                refresh_timeout: refresh_timeout(None),
            },
        })
    }
}

/// One named backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Context {
    pub name: String,

    /// Base URL including the API prefix, e.g. `http://host:8080/api/v1`.
    pub server: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_timeout: Option<u64>,
}

impl Context {
    pub fn new(name: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server: server.into(),
            timeout: None,
            refresh_timeout: None,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Some(secs);
        self
    }

    pub fn with_refresh_timeout(mut self, secs: u64) -> Self {
        self.refresh_timeout = Some(secs);
        self
    }
}

/// Values for contexts that don't set their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientDefaults {
    pub timeout: u64,
    pub refresh_timeout: u64,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT_SECS,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT_SECS,
        }
    }
}

/// Load `client.yaml` from the config directory.
///
/// A missing file, or no config directory at all, yields an empty config.
pub fn load_client_config() -> Result<ClientConfig> {
    load_client_config_from(crate::client_config_path().as_deref())
}

/// Load a client config file; `None` or a missing file yields an empty config.
pub fn load_client_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let Some(path) = path else {
        return Ok(ClientConfig::new());
    };

    match std::fs::read_to_string(path) {
        Ok(yaml) => ClientConfig::from_yaml(&yaml),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(ClientConfig::new()),
        Err(source) => Err(ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write `client.yaml` in the config directory and return its path.
pub fn save_client_config(config: &ClientConfig) -> Result<PathBuf> {
    let path = crate::client_config_path().ok_or(ConfigError::NoConfigDir)?;
    save_client_config_to(config, &path)?;
    Ok(path)
}

/// Write a client config file, creating its directory.
///
/// The file is written beside the target and renamed over it, so readers
/// never observe a half-written config.
pub fn save_client_config_to(config: &ClientConfig, path: &Path) -> Result<()> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ConfigError::WriteFile { path, source }
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err(parent))?;
    }

    let staging = path.with_extension("yaml.tmp");
    std::fs::write(&staging, config.to_yaml()?).map_err(write_err(&staging))?;
    std::fs::rename(&staging, path).map_err(write_err(path))?;

    Ok(())
}
