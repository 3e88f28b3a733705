//! Client settings: defaults, optional TOML file, then environment

use crate::error::ConfigError;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment prefix; `EXAMDESK__API__BASE_URL` overrides `api.base_url`
pub const ENV_PREFIX: &str = "EXAMDESK";

/// Top-level client settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Remote API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every endpoint path is appended to
    pub base_url: String,

    /// Request timeout in seconds (0 disables the timeout)
    pub timeout_secs: u64,

    pub user_agent: Option<String>,
}

/// Where the session's key-value store lives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// JSON file holding the token pair; defaults to the platform data dir
    pub path: Option<PathBuf>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed, an environment value
    /// has the wrong type, or the base URL is not a valid URL
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let defaults = ApiSettings::default();

        let mut builder = config::Config::builder()
            .set_default("api.base_url", defaults.base_url)?
            .set_default("api.timeout_secs", defaults.timeout_secs)?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }

        let settings: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.api.base_url)
            .map_err(|e| ConfigError::invalid(format!("api.base_url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(format!(
                "api.base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }
        Ok(())
    }

    /// Resolved path of the session store file
    pub fn storage_path(&self) -> PathBuf {
        self.storage.path.clone().unwrap_or_else(default_storage_path)
    }
}

fn default_storage_path() -> PathBuf {
    ProjectDirs::from("edu", "Examdesk", "examdesk").map_or_else(
        || PathBuf::from(".examdesk").join("session.json"),
        |dirs| dirs.data_dir().join("session.json"),
    )
}
