//! Console configuration.
//!
//! Settings are layered: built-in defaults, then the JSON file at
//! `$ANVIL_CONSOLE_CONFIG` (or `<config_dir>/anvil-console/config.json`),
//! then the `ANVIL_RPC_URL` / `ANVIL_RPC_TIMEOUT_SECS` environment variables.
//! Command-line flags are applied on top by the binary.

use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use dirs_next::{config_dir, home_dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "ANVIL_CONSOLE_CONFIG";
/// Environment variable overriding the node endpoint.
pub const RPC_URL_ENV: &str = "ANVIL_RPC_URL";
/// Environment variable overriding the request timeout, in seconds.
pub const RPC_TIMEOUT_ENV: &str = "ANVIL_RPC_TIMEOUT_SECS";

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid RPC URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid value for {name}: '{value}'")]
    InvalidEnv { name: &'static str, value: String },
}

/// Effective configuration for talking to a node and saving artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// JSON-RPC endpoint of the node.
    pub rpc_url: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Where downloaded artifacts are written; `None` means the working directory.
    pub artifact_dir: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            artifact_dir: None,
        }
    }
}

impl ConsoleConfig {
    /// Load the file layer (if any) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_config_path();
        let mut config = load_file(&path)?;
        config.apply_env()?;
        config.rpc_endpoint()?;
        Ok(config)
    }

    /// Overlay `ANVIL_RPC_URL` and `ANVIL_RPC_TIMEOUT_SECS` when set.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var(RPC_URL_ENV)
            && !url.trim().is_empty()
        {
            self.rpc_url = url.trim().to_string();
        }
        if let Ok(raw) = env::var(RPC_TIMEOUT_ENV)
            && !raw.trim().is_empty()
        {
            self.timeout_secs = raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: RPC_TIMEOUT_ENV,
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    /// Parsed form of [`ConsoleConfig::rpc_url`].
    pub fn rpc_endpoint(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.rpc_url).map_err(|source| ConfigError::InvalidUrl {
            url: self.rpc_url.clone(),
            source,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Directory artifacts are saved to, with `~` expanded.
    pub fn artifact_dir(&self) -> PathBuf {
        match &self.artifact_dir {
            Some(dir) => expand_tilde(&dir.to_string_lossy()),
            None => PathBuf::from("."),
        }
    }
}

/// Location of the config file, honouring [`CONFIG_PATH_ENV`].
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("anvil-console")
        .join("config.json")
}

fn load_file(path: &Path) -> Result<ConsoleConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(config) => {
                debug!(path = %path.display(), "loaded console config");
                Ok(config)
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "failed to parse console config; using defaults");
                Ok(ConsoleConfig::default())
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(ConsoleConfig::default()),
        Err(error) => Err(ConfigError::Io(error)),
    }
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("~"));
    if trimmed == "~" {
        return home();
    }
    match trimmed.strip_prefix("~/").or_else(|| trimmed.strip_prefix("~\\")) {
        Some(rest) => home().join(rest),
        None => PathBuf::from(trimmed),
    }
}
