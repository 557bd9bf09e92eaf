//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Location
//!
//! Searched in order:
//! 1. `$DUSK_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/dusk/config.toml`
//! 3. `~/.dusk/config.toml` (canonical write location)
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., the default branch must be a valid branch name).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// default_model = "gpt-4"
/// default_branch = "main"
/// interactive = true
///
/// [provider]
/// kind = "command"
/// command = "llm"
/// args = ["--no-stream"]
/// timeout_secs = 120
///
/// [[models]]
/// name = "gpt-4"
/// vendor = "OpenAI"
///
/// [[models]]
/// name = "llama-2-7b"
/// local = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Model used when a command does not name one
    pub default_model: Option<String>,

    /// Branch that runs without a named ancestor belong to
    pub default_branch: Option<String>,

    /// Ledger data directory
    pub data_dir: Option<PathBuf>,

    /// Default interactive mode
    pub interactive: Option<bool>,

    /// Model provider settings
    pub provider: Option<ProviderConfig>,

    /// Known models, listed by `dusk models`
    pub models: Option<Vec<ModelEntry>>,
}

impl GlobalConfig {
    /// Keys accepted by `dusk config get|set`.
    pub const KEYS: &'static [&'static str] = &[
        "default_model",
        "default_branch",
        "data_dir",
        "interactive",
        "provider.kind",
        "provider.command",
        "provider.args",
        "provider.timeout_secs",
    ];

    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(model) = &self.default_model {
            if model.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "default_model cannot be empty".to_string(),
                ));
            }
        }

        if let Some(branch) = &self.default_branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid default_branch: {}", e))
            })?;
        }

        if let Some(provider) = &self.provider {
            provider.validate()?;
        }

        if let Some(models) = &self.models {
            let mut seen = std::collections::HashSet::new();
            for model in models {
                if model.name.trim().is_empty() {
                    return Err(ConfigError::InvalidValue(
                        "model name cannot be empty".to_string(),
                    ));
                }
                if !seen.insert(model.name.as_str()) {
                    return Err(ConfigError::InvalidValue(format!(
                        "model '{}' is listed twice",
                        model.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Read a single key as display text.
    ///
    /// Returns `Ok(None)` for a known key that is not set.
    pub fn get_key(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let provider = self.provider.as_ref();
        let value = match key {
            "default_model" => self.default_model.clone(),
            "default_branch" => self.default_branch.clone(),
            "data_dir" => self.data_dir.as_ref().map(|p| p.display().to_string()),
            "interactive" => self.interactive.map(|b| b.to_string()),
            "provider.kind" => provider.and_then(|p| p.kind.clone()),
            "provider.command" => provider.and_then(|p| p.command.clone()),
            "provider.args" => provider.and_then(|p| p.args.as_ref()).map(|a| a.join(" ")),
            "provider.timeout_secs" => {
                provider.and_then(|p| p.timeout_secs).map(|t| t.to_string())
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        };
        Ok(value)
    }

    /// Set a single key from text, then validate.
    ///
    /// `provider.args` is split on whitespace.
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "default_model" => self.default_model = Some(value.to_string()),
            "default_branch" => self.default_branch = Some(value.to_string()),
            "data_dir" => self.data_dir = Some(PathBuf::from(value)),
            "interactive" => self.interactive = Some(parse_bool(key, value)?),
            "provider.kind" => self.provider_mut().kind = Some(value.to_string()),
            "provider.command" => self.provider_mut().command = Some(value.to_string()),
            "provider.args" => {
                self.provider_mut().args =
                    Some(value.split_whitespace().map(str::to_string).collect())
            }
            "provider.timeout_secs" => {
                let secs = value.parse::<u64>().map_err(|_| {
                    ConfigError::InvalidValue(format!("{key} must be a number of seconds"))
                })?;
                self.provider_mut().timeout_secs = Some(secs);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        self.validate()
    }

    fn provider_mut(&mut self) -> &mut ProviderConfig {
        self.provider.get_or_insert_with(ProviderConfig::default)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "{key} must be true or false"
        ))),
    }
}

/// Model provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Provider kind ("command" or "echo")
    pub kind: Option<String>,

    /// Executable for the command provider
    pub command: Option<String>,

    /// Extra arguments for the command provider
    pub args: Option<Vec<String>>,

    /// Per-call timeout
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// Validate the provider configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(kind) = &self.kind {
            let valid_kinds = crate::provider::valid_provider_names();
            if !valid_kinds.contains(&kind.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid provider kind '{}', must be one of: {}",
                    kind,
                    valid_kinds.join(", ")
                )));
            }
        }
        if let Some(command) = &self.command {
            if command.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "provider.command cannot be empty".to_string(),
                ));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "provider.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// A model listed by `dusk models`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ModelEntry {
    pub name: String,

    /// Vendor shown next to remote models
    #[serde(default)]
    pub vendor: Option<String>,

    /// Runs on this machine
    #[serde(default)]
    pub local: bool,
}

impl ModelEntry {
    pub fn remote(name: &str, vendor: &str) -> Self {
        Self {
            name: name.to_string(),
            vendor: Some(vendor.to_string()),
            local: false,
        }
    }

    pub fn local(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vendor: None,
            local: true,
        }
    }
}
