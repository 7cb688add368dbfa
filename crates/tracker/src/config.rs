use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level tracker configuration, loaded from
/// `~/.config/tempo/config.toml`. Every field has a default so a missing
/// file or a partial file both work.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrackerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub identity: IdentitySettings,
    #[serde(default)]
    pub tracker: TrackerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            api_key: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentitySettings {
    /// Authenticated user the sessions belong to
    #[serde(default)]
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// Reconciliation poll cadence. A tunable, not a correctness knob;
    /// it only bounds how fast a session started elsewhere shows up here.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            tick_interval_ms: default_tick_interval(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl TrackerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.tracker.poll_interval_secs.max(1))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tracker.tick_interval_ms.max(100))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs.max(1))
    }
}

fn default_server_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_poll_interval() -> u64 {
    3
}

fn default_tick_interval() -> u64 {
    1000
}

fn default_event_capacity() -> usize {
    64
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHome,
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("failed to write config at {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Config directory (`~/.config/tempo`).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| ConfigError::NoHome)?;
    Ok(PathBuf::from(home).join(".config").join("tempo"))
}

pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load config from disk; defaults when the file is absent.
pub fn load_config() -> Result<TrackerConfig, ConfigError> {
    load_config_from(&config_path()?)
}

/// Persist config, creating the directory if needed.
pub fn save_config(config: &TrackerConfig) -> Result<(), ConfigError> {
    let path = config_path()?;
    let write_err = |source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    let content = toml::to_string_pretty(config).map_err(|e| ConfigError::Write {
        path: path.display().to_string(),
        source: std::io::Error::other(e),
    })?;
    std::fs::write(&path, content).map_err(write_err)
}

pub fn load_config_from(path: &std::path::Path) -> Result<TrackerConfig, ConfigError> {
    if !path.exists() {
        return Ok(TrackerConfig::default());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}
