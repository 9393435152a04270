use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const CONFIG_ENV_VAR: &str = "TETHER_WINDOW_CONFIG";

const DEFAULT_TITLE: &str = "Tether App";
const DEFAULT_INVOKE_FUNCTION: &str = "external.invoke";
const DEFAULT_RESULT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read window config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse window URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Settings for the correlation channel and the engine-side helpers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Engine-side function that feeds a payload back into the host callback.
    pub invoke_function: String,
    /// How long a value-returning submission may wait for a deferred result.
    pub result_timeout_ms: u64,
}

impl BridgeConfig {
    pub fn result_timeout(&self) -> Duration {
        Duration::from_millis(self.result_timeout_ms)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            invoke_function: DEFAULT_INVOKE_FUNCTION.to_string(),
            result_timeout_ms: DEFAULT_RESULT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    /// Empty means a blank document.
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    pub debug: bool,
    pub bridge: BridgeConfig,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            url: String::new(),
            width: 800,
            height: 600,
            resizable: true,
            debug: false,
            bridge: BridgeConfig::default(),
        }
    }
}

impl WindowConfig {
    /// Load a config file, falling back to defaults when no path is given or
    /// the file does not exist.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config = match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                Self::from_yaml_str(&contents)?
            }
            _ => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn parsed_url(&self) -> Result<Option<Url>, ConfigError> {
        let trimmed = self.url.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Ok(Some(Url::parse(trimmed)?))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.parsed_url().map(|_| ())
    }
}
