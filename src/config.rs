// Application configuration
// Defaults, then an optional TOML file, then environment variables

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR_NAME: &str = "com.deepcompose.app";

const ENV_CONFIG_PATH: &str = "DEEPCOMPOSE_CONFIG_PATH";
const ENV_API_BASE: &str = "DEEPCOMPOSE_API_BASE";
const ENV_MODEL: &str = "DEEPCOMPOSE_MODEL";
const ENV_TEMPERATURE: &str = "DEEPCOMPOSE_TEMPERATURE";
const ENV_TIMEOUT_SECS: &str = "DEEPCOMPOSE_TIMEOUT_SECS";
const ENV_API_KEY: &str = "DEEPCOMPOSE_API_KEY";

const DEFAULT_API_BASE: &str = "https://api.deepseek.com";
const DEFAULT_MODEL: &str = "deepseek-chat";
const DEFAULT_TEMPERATURE: f32 = 0.6;
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{name} has an invalid value '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Runtime settings for the generation backend and sequencer
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    api_base_url: String,
    model: String,
    temperature: f32,
    request_timeout_secs: u64,
    api_key: Option<String>,
}

impl AppConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> ConfigResult<Self> {
        let mut config = Self::default();

        let path = match env::var_os(ENV_CONFIG_PATH).filter(|v| !v.is_empty()) {
            Some(value) => Some(PathBuf::from(value)),
            None => Self::default_config_path(),
        };

        if let Some(path) = path.filter(|p| p.is_file()) {
            let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            config.apply_partial(parse_partial(&contents, &path)?);
            log::info!("Loaded config from {}", path.display());
        }

        config.apply_env()?;
        Ok(config)
    }

    /// `<config_dir>/com.deepcompose.app/config.toml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Per-request timeout; `None` when disabled
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(url) = partial.api_base_url.filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(model) = partial.model.filter(|v| !v.trim().is_empty()) {
            self.model = model;
        }
        if let Some(temperature) = partial.temperature {
            self.temperature = temperature;
        }
        if let Some(secs) = partial.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(key) = partial.api_key.filter(|v| !v.trim().is_empty()) {
            self.api_key = Some(key);
        }
    }

    fn apply_env(&mut self) -> ConfigResult<()> {
        let partial = PartialConfig {
            api_base_url: env_value(ENV_API_BASE),
            model: env_value(ENV_MODEL),
            temperature: env_value(ENV_TEMPERATURE)
                .map(|v| parse_env(ENV_TEMPERATURE, v))
                .transpose()?,
            request_timeout_secs: env_value(ENV_TIMEOUT_SECS)
                .map(|v| parse_env(ENV_TIMEOUT_SECS, v))
                .transpose()?,
            api_key: env_value(ENV_API_KEY),
        };
        self.apply_partial(partial);
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PartialConfig {
    api_base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    request_timeout_secs: Option<u64>,
    api_key: Option<String>,
}

fn parse_partial(contents: &str, path: &Path) -> ConfigResult<PartialConfig> {
    toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api_base_url(), "https://api.deepseek.com");
        assert_eq!(config.model(), "deepseek-chat");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(300)));
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_partial_file_overrides_some_fields() {
        let partial = parse_partial(
            "model = \"gpt-4o-mini\"\nrequest_timeout_secs = 0\napi_key = \"\"\n",
            Path::new("config.toml"),
        )
        .unwrap();

        let mut config = AppConfig::default();
        config.apply_partial(partial);

        assert_eq!(config.model(), "gpt-4o-mini");
        assert_eq!(config.api_base_url(), "https://api.deepseek.com");
        assert_eq!(config.request_timeout(), None);
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let err = parse_partial("temperature = \"hot\"", Path::new("/etc/dc/config.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("/etc/dc/config.toml"));
    }

    #[test]
    fn test_parse_env_number() {
        let secs: u64 = parse_env(ENV_TIMEOUT_SECS, " 45 ".to_string()).unwrap();
        assert_eq!(secs, 45);

        let err = parse_env::<u64>(ENV_TIMEOUT_SECS, "soon".to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { name: ENV_TIMEOUT_SECS, .. }));
    }

    #[test]
    fn test_builders() {
        let config = AppConfig::default()
            .with_api_base_url("http://localhost:11434/v1")
            .with_request_timeout_secs(5);
        assert_eq!(config.api_base_url(), "http://localhost:11434/v1");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
    }
}
