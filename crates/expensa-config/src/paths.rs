//! Well-known file locations.

use std::path::PathBuf;

/// Application directory name under the platform config dir.
const APP_NAME: &str = "expensa";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "EXPENSA_CONFIG_DIR";

const CLIENT_CONFIG_FILE: &str = "client.yaml";
const SESSION_FILE: &str = "session.json";
const COOKIE_FILE: &str = "cookies.json";
const LOG_DIR: &str = "logs";

/// The expensa config directory.
///
/// Resolution order:
/// 1. `EXPENSA_CONFIG_DIR` (when non-empty)
/// 2. `<platform config dir>/expensa`
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Path of the client config file.
pub fn client_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(CLIENT_CONFIG_FILE))
}

/// Path of the persisted session.
pub fn session_file_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(SESSION_FILE))
}

/// Path of the saved credential cookies.
pub fn cookie_file_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(COOKIE_FILE))
}

/// Directory for rolling log files.
pub fn log_dir() -> PathBuf {
    xdg_config_dir()
        .map(|d| d.join(LOG_DIR))
        .unwrap_or_else(|| PathBuf::from(LOG_DIR))
}
