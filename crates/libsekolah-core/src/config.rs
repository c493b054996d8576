use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SekolahError;

/// Backend endpoint, required
pub const ENV_BACKEND_URL: &str = "SEKOLAH_BACKEND_URL";
/// Backend credential, required
pub const ENV_BACKEND_KEY: &str = "SEKOLAH_BACKEND_KEY";
/// Session bootstrap timeout override, milliseconds
pub const ENV_SESSION_TIMEOUT_MS: &str = "SEKOLAH_SESSION_TIMEOUT_MS";
/// Autosave debounce override, milliseconds
pub const ENV_AUTOSAVE_DEBOUNCE_MS: &str = "SEKOLAH_AUTOSAVE_DEBOUNCE_MS";

/// Upper bound on the initial session check before the client proceeds
/// as signed out
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 8000;
/// Delay between the last local edit and the autosave flush
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 1000;

/// Client configuration. The two backend values are required; everything
/// else has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub backend_url: String,
    pub backend_key: String,
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    #[serde(default = "default_autosave_debounce_ms")]
    pub autosave_debounce_ms: u64,
    /// Directory for persisted client stores; defaults to the platform
    /// data dir
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_session_timeout_ms() -> u64 {
    DEFAULT_SESSION_TIMEOUT_MS
}

fn default_autosave_debounce_ms() -> u64 {
    DEFAULT_AUTOSAVE_DEBOUNCE_MS
}

impl ClientConfig {
    pub fn new(backend_url: impl Into<String>, backend_key: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            backend_key: backend_key.into(),
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            autosave_debounce_ms: DEFAULT_AUTOSAVE_DEBOUNCE_MS,
            data_dir: None,
        }
    }

    /// Read configuration from the environment. A missing required value
    /// is fatal at startup; the diagnostic names the variable.
    pub fn from_env() -> Result<Self, SekolahError> {
        let backend_url = require_env(ENV_BACKEND_URL)?;
        let backend_key = require_env(ENV_BACKEND_KEY)?;

        let mut config = Self::new(backend_url, backend_key);
        if let Some(ms) = optional_env_ms(ENV_SESSION_TIMEOUT_MS)? {
            config.session_timeout_ms = ms;
        }
        if let Some(ms) = optional_env_ms(ENV_AUTOSAVE_DEBOUNCE_MS)? {
            config.autosave_debounce_ms = ms;
        }
        Ok(config)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    /// Directory holding the persisted session and UI stores
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("sekolah"),
        }
    }

    pub fn session_store_path(&self) -> PathBuf {
        self.data_dir().join("session.json")
    }

    pub fn ui_store_path(&self) -> PathBuf {
        self.data_dir().join("ui.json")
    }
}

fn require_env(name: &str) -> Result<String, SekolahError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(SekolahError::Config(format!(
            "required environment variable {} is not set; the client cannot reach the backend without it",
            name
        ))),
    }
}

fn optional_env_ms(name: &str) -> Result<Option<u64>, SekolahError> {
    match std::env::var(name) {
        Ok(value) => value.parse::<u64>().map(Some).map_err(|_| {
            SekolahError::Config(format!("{} must be an integer number of milliseconds", name))
        }),
        Err(_) => Ok(None),
    }
}

/// Load client config from a TOML file, if present
pub fn load_client_config(path: &Path) -> Result<Option<ClientConfig>, SekolahError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let config: ClientConfig = toml::from_str(&content)?;
    Ok(Some(config))
}

/// Save client config to a TOML file, creating parent directories
pub fn save_client_config(path: &Path, config: &ClientConfig) -> Result<(), SekolahError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    // from_env tests mutate process-wide state
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_from_env_missing_url_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var(ENV_BACKEND_URL);
        std::env::remove_var(ENV_BACKEND_KEY);

        let err = ClientConfig::from_env().unwrap_err();
        assert_eq!(err.error_code(), "config_error");
        assert!(err.to_string().contains(ENV_BACKEND_URL));
    }

    #[test]
    fn test_from_env_reads_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(ENV_BACKEND_URL, "https://school.example");
        std::env::set_var(ENV_BACKEND_KEY, "anon-key");
        std::env::set_var(ENV_SESSION_TIMEOUT_MS, "2500");
        std::env::remove_var(ENV_AUTOSAVE_DEBOUNCE_MS);

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.backend_url, "https://school.example");
        assert_eq!(config.session_timeout(), Duration::from_millis(2500));
        assert_eq!(
            config.autosave_debounce(),
            Duration::from_millis(DEFAULT_AUTOSAVE_DEBOUNCE_MS)
        );

        std::env::remove_var(ENV_BACKEND_URL);
        std::env::remove_var(ENV_BACKEND_KEY);
        std::env::remove_var(ENV_SESSION_TIMEOUT_MS);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = ClientConfig::new("https://school.example", "anon-key");
        config.autosave_debounce_ms = 500;
        save_client_config(&path, &config).unwrap();

        let loaded = load_client_config(&path).unwrap().unwrap();
        assert_eq!(loaded.backend_url, config.backend_url);
        assert_eq!(loaded.autosave_debounce_ms, 500);
    }

    #[test]
    fn test_load_missing_config_is_none() {
        let dir = tempdir().unwrap();
        let loaded = load_client_config(&dir.path().join("absent.toml")).unwrap();
        assert!(loaded.is_none());
    }
}
