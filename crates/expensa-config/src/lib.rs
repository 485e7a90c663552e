//! Client configuration for Expensa.
//!
//! Kubeconfig-style YAML with named contexts:
//! - Each context names a backend server plus timeout overrides
//! - `current-context` selects the default
//! - `defaults` apply to every context that doesn't override them
//!
//! Files live in the XDG config directory (`~/.config/expensa`), which can be
//! relocated with `EXPENSA_CONFIG_DIR`.

pub mod client;
pub mod error;
pub mod paths;

pub use client::{
    ClientConfig, ClientDefaults, Context, DEFAULT_REFRESH_TIMEOUT_SECS, DEFAULT_SERVER,
    DEFAULT_TIMEOUT_SECS, ResolvedContext, load_client_config, load_client_config_from,
    save_client_config, save_client_config_to,
};
pub use error::{ConfigError, Result};
pub use paths::{
    CONFIG_DIR_ENV, client_config_path, cookie_file_path, log_dir, session_file_path,
    xdg_config_dir,
};
