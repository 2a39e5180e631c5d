//! Configuration loader and validator for the homework status bot.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const PRACTICUM_TOKEN_ENV: &str = "PRACTICUM_TOKEN";
pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_TOKEN";
pub const TELEGRAM_CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";

const DEFAULT_ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub app: App,
    pub practicum: Practicum,
    pub telegram: Telegram,
}

/// Loop timing and logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct App {
    pub retry_period_secs: u64,
    pub initial_cursor: i64,
    pub request_timeout_secs: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for App {
    fn default() -> Self {
        Self {
            retry_period_secs: 600,
            initial_cursor: 1_667_322_796,
            request_timeout_secs: 30,
            log_file: None,
        }
    }
}

/// Homework status API settings.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Practicum {
    pub token: String,
    pub endpoint: String,
}

impl Default for Practicum {
    fn default() -> Self {
        Self {
            token: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl fmt::Debug for Practicum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Practicum")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Telegram bot settings.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Telegram {
    pub bot_token: String,
    pub chat_id: String,
}

impl fmt::Debug for Telegram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Telegram")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl App {
    pub fn retry_period(&self) -> Duration {
        Duration::from_secs(self.retry_period_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Override secrets with values from the environment (non-empty values only).
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = non_empty(PRACTICUM_TOKEN_ENV) {
            self.practicum.token = token;
        }
        if let Some(token) = non_empty(TELEGRAM_TOKEN_ENV) {
            self.telegram.bot_token = token;
        }
        if let Some(chat_id) = non_empty(TELEGRAM_CHAT_ID_ENV) {
            self.telegram.chat_id = chat_id;
        }
    }

    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.practicum.endpoint)
            .map_err(|_| ConfigError::Invalid("practicum.endpoint must be a valid URL"))
    }
}

/// Load configuration from a YAML file, apply environment overrides and validate.
/// - If `path` is None, uses `config.yaml` in the current working directory.
/// - A missing file is not an error: every key has a default and the secrets
///   may come from the environment alone.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut cfg = read_file(path)?;
    cfg.apply_env_with(|key| std::env::var(key).ok());
    validate(&cfg)?;
    Ok(cfg)
}

/// Read the YAML file without environment overrides or validation.
pub fn read_file(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    match fs::read_to_string(path) {
        Ok(content) => Ok(serde_yaml::from_str(&content)?),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Config::default()),
        Err(err) => Err(err.into()),
    }
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.practicum.token.trim().is_empty() {
        return Err(ConfigError::Invalid("practicum.token must be non-empty"));
    }
    if cfg.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::Invalid("telegram.bot_token must be non-empty"));
    }
    if cfg.telegram.chat_id.trim().is_empty() {
        return Err(ConfigError::Invalid("telegram.chat_id must be non-empty"));
    }
    if cfg.app.retry_period_secs == 0 {
        return Err(ConfigError::Invalid("app.retry_period_secs must be > 0"));
    }
    if cfg.app.request_timeout_secs == 0 {
        return Err(ConfigError::Invalid("app.request_timeout_secs must be > 0"));
    }
    cfg.endpoint_url()?;
    Ok(())
}

/// Returns the example YAML content.
pub fn example() -> &'static str {
    r#"app:
  retry_period_secs: 600
  initial_cursor: 1667322796
  request_timeout_secs: 30
  log_file: "program.log"

practicum:
  token: "YOUR_PRACTICUM_OAUTH_TOKEN"
  endpoint: "https://practicum.yandex.ru/api/user_api/homework_statuses/"

telegram:
  bot_token: "YOUR_TELEGRAM_BOT_TOKEN"
  chat_id: "123456789"
"#
}
