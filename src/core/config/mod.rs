//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. `$DUSK_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/dusk/config.toml`
//! 3. `~/.dusk/config.toml` (canonical write location)
//!
//! # Example
//!
//! ```no_run
//! use dusk::core::config::Config;
//!
//! let config = Config::load().unwrap();
//!
//! println!("Model: {}", config.default_model());
//! println!("Branch: {}", config.default_branch().unwrap());
//! println!("Interactive: {}", config.interactive());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, ModelEntry, ProviderConfig};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::types::BranchName;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "DUSK_CONFIG";

/// Model used when neither the command nor the config names one.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Default branch name when not configured.
pub const DEFAULT_BRANCH: &str = "main";

/// Provider timeout when not configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Loaded configuration with defaults applied by the accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Path to the config file (if loaded)
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// fails validation. A missing file is not an error (defaults are used).
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::locate(|key| std::env::var(key).ok(), dirs::home_dir());
        match path {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load and validate a specific config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let global = Self::read_config(path)?;
        global.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Self {
            global,
            path: Some(path.to_path_buf()),
        })
    }

    /// Find the first existing config file.
    ///
    /// `env` looks up environment variables; `home` is the user's home.
    pub fn locate(
        env: impl Fn(&str) -> Option<String>,
        home: Option<PathBuf>,
    ) -> Option<PathBuf> {
        // 1. $DUSK_CONFIG
        if let Some(path) = env(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. $XDG_CONFIG_HOME/dusk/config.toml
        if let Some(xdg_home) = env("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("dusk/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. ~/.dusk/config.toml
        home.map(|h| h.join(".dusk/config.toml"))
            .filter(|p| p.exists())
    }

    fn read_config(path: &Path) -> Result<GlobalConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the canonical path for the config file.
    ///
    /// Returns `$DUSK_CONFIG` when set, else `~/.dusk/config.toml`.
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".dusk/config.toml"))
    }

    /// Write the config back where it was loaded from, or to the canonical
    /// location.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => Self::config_path()?,
        };
        Self::write_config_atomic(&path, &self.global)?;
        Ok(path)
    }

    /// Write a config file atomically.
    ///
    /// Creates parent directories if needed.
    pub fn write_config_atomic(path: &Path, config: &GlobalConfig) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Get the default model.
    ///
    /// Defaults to "gpt-4" if not configured.
    pub fn default_model(&self) -> &str {
        self.global
            .default_model
            .as_deref()
            .unwrap_or(DEFAULT_MODEL)
    }

    /// Get the default branch.
    ///
    /// Defaults to "main" if not configured.
    pub fn default_branch(&self) -> Result<BranchName, ConfigError> {
        let name = self
            .global
            .default_branch
            .as_deref()
            .unwrap_or(DEFAULT_BRANCH);
        BranchName::new(name).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    /// Configured data directory, if any.
    pub fn data_dir(&self) -> Option<&Path> {
        self.global.data_dir.as_deref()
    }

    /// Check if interactive mode is enabled by default.
    ///
    /// Defaults to `true` if not configured.
    pub fn interactive(&self) -> bool {
        self.global.interactive.unwrap_or(true)
    }

    /// Get the provider kind.
    ///
    /// Defaults to "command" when a command is configured, else "echo".
    pub fn provider_kind(&self) -> &str {
        let provider = self.global.provider.as_ref();
        match provider.and_then(|p| p.kind.as_deref()) {
            Some(kind) => kind,
            None if provider.and_then(|p| p.command.as_ref()).is_some() => "command",
            None => "echo",
        }
    }

    /// Executable and arguments for the command provider.
    pub fn provider_command(&self) -> Option<(&str, &[String])> {
        let provider = self.global.provider.as_ref()?;
        let command = provider.command.as_deref()?;
        Some((command, provider.args.as_deref().unwrap_or(&[])))
    }

    /// Per-call provider timeout.
    ///
    /// Defaults to 120 seconds if not configured.
    pub fn provider_timeout(&self) -> Duration {
        let secs = self
            .global
            .provider
            .as_ref()
            .and_then(|p| p.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    /// Known models.
    ///
    /// Defaults to a built-in catalog if not configured.
    pub fn models(&self) -> Vec<ModelEntry> {
        match &self.global.models {
            Some(models) => models.clone(),
            None => vec![
                ModelEntry::remote("gpt-4", "OpenAI"),
                ModelEntry::remote("gpt-4-turbo", "OpenAI"),
                ModelEntry::remote("gpt-3.5-turbo", "OpenAI"),
                ModelEntry::remote("claude-3-opus", "Anthropic"),
                ModelEntry::remote("claude-3-sonnet", "Anthropic"),
                ModelEntry::local("llama-2-7b"),
                ModelEntry::local("llama-2-13b"),
                ModelEntry::local("mistral-7b"),
            ],
        }
    }

    /// Get the path to the loaded config file.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
