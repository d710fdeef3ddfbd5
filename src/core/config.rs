//! Configuration loading and defaults.
//!
//! The config file is optional TOML at the platform config directory. Every
//! field has a code default; CLI flags override the file.

use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::core::constants::{
    DEFAULT_ANONYMOUS_SEND_LIMIT, DEFAULT_BASE_URL, DEFAULT_CHAR_DELAY_MS, DEFAULT_REVEAL_BATCH,
};
use crate::core::reveal::RevealConfig;

/// Errors that can occur when loading configuration from disk.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config at {}: {}", path.display(), source)
            }
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Root of the chat service; endpoints are joined onto it.
    pub base_url: Option<String>,
    /// API token. Presence makes the session authenticated.
    pub token: Option<String>,
    /// Minimum milliseconds between two revealed characters.
    pub char_delay_ms: Option<u64>,
    /// Revealed characters buffered before a display flush.
    pub batch_size: Option<usize>,
    /// Free sends per session for anonymous users.
    pub anonymous_send_limit: Option<u32>,
    /// Append the transcript to this file.
    pub log_file: Option<String>,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "permacommons", "patter")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn load() -> Result<Self, Box<dyn StdError>> {
        match Self::config_path() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// A missing file is not an error; the defaults apply.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<dyn StdError>> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn reveal(&self) -> RevealConfig {
        RevealConfig {
            char_delay: Duration::from_millis(self.char_delay_ms.unwrap_or(DEFAULT_CHAR_DELAY_MS)),
            batch_size: self.batch_size.unwrap_or(DEFAULT_REVEAL_BATCH).max(1),
        }
    }

    pub fn send_limit(&self) -> u32 {
        self.anonymous_send_limit
            .unwrap_or(DEFAULT_ANONYMOUS_SEND_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().expect("tempdir");
        let config = Config::load_from_path(&dir.path().join("absent.toml")).unwrap();
        assert!(config.base_url.is_none());
        assert_eq!(config.resolved_base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.send_limit(), DEFAULT_ANONYMOUS_SEND_LIMIT);
        assert_eq!(
            config.reveal().char_delay,
            Duration::from_millis(DEFAULT_CHAR_DELAY_MS)
        );
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "base_url = \"https://chat.example.invalid/api\"\nchar_delay_ms = 25\nbatch_size = 8\nanonymous_send_limit = 5\n",
        )
        .expect("write config");

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(
            config.resolved_base_url(),
            "https://chat.example.invalid/api"
        );
        assert_eq!(config.reveal().char_delay, Duration::from_millis(25));
        assert_eq!(config.reveal().batch_size, 8);
        assert_eq!(config.send_limit(), 5);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let config = Config {
            batch_size: Some(0),
            ..Config::default()
        };
        assert_eq!(config.reveal().batch_size, 1);
    }

    #[test]
    fn invalid_toml_reports_a_parse_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = [not toml").expect("write config");

        let error = Config::load_from_path(&path).unwrap_err();
        assert!(error.to_string().contains("Failed to parse config"));
    }
}
