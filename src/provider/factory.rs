//! provider::factory
//!
//! Provider selection and creation.
//!
//! # Design
//!
//! Commands use `create_provider()` instead of constructing specific
//! providers, so the choice lives in configuration (`[provider] kind`).

use std::sync::Arc;

use super::command::CommandProvider;
use super::echo::EchoProvider;
use super::traits::{ModelProvider, ProviderError};
use crate::core::config::Config;

/// Supported provider kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Runs a configured executable
    Command,
    /// Offline echo
    Echo,
}

impl ProviderKind {
    /// Get all available kinds.
    pub fn all() -> &'static [ProviderKind] {
        &[ProviderKind::Command, ProviderKind::Echo]
    }

    /// The kind name as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Command => "command",
            ProviderKind::Echo => "echo",
        }
    }

    /// Parse a kind from a string.
    ///
    /// # Example
    ///
    /// ```
    /// use dusk::provider::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::parse("echo"), Some(ProviderKind::Echo));
    /// assert_eq!(ProviderKind::parse("http"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "command" => Some(ProviderKind::Command),
            "echo" => Some(ProviderKind::Echo),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Create the provider described by `config`.
///
/// # Errors
///
/// - `ProviderError::Unavailable` for an unknown kind, or a command provider
///   without a configured command
pub fn create_provider(config: &Config) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    let name = config.provider_kind();
    let kind = ProviderKind::parse(name).ok_or_else(|| {
        ProviderError::Unavailable(format!(
            "unknown provider kind '{}'. Available kinds: {}",
            name,
            valid_provider_names().join(", ")
        ))
    })?;

    tracing::debug!(kind = %kind, "creating provider");
    match kind {
        ProviderKind::Command => {
            let (command, args) = config.provider_command().ok_or_else(|| {
                ProviderError::Unavailable(
                    "provider.command is not set; run 'dusk config set provider.command <program>'"
                        .to_string(),
                )
            })?;
            Ok(Arc::new(CommandProvider::new(
                command,
                args.to_vec(),
                config.provider_timeout(),
            )))
        }
        ProviderKind::Echo => Ok(Arc::new(EchoProvider::new())),
    }
}

/// Valid provider kind names for configuration validation.
pub fn valid_provider_names() -> &'static [&'static str] {
    &["command", "echo"]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{GlobalConfig, ProviderConfig};

    fn config_with(provider: ProviderConfig) -> Config {
        let mut config = Config::default();
        config.global = GlobalConfig {
            provider: Some(provider),
            ..Default::default()
        };
        config
    }

    #[test]
    fn kind_names_roundtrip() {
        for kind in ProviderKind::all() {
            assert_eq!(ProviderKind::parse(kind.name()), Some(*kind));
            assert!(valid_provider_names().contains(&kind.name()));
        }
    }

    #[test]
    fn default_is_echo() {
        let provider = create_provider(&Config::default()).unwrap();
        assert_eq!(provider.name(), "echo");
    }

    #[test]
    fn command_from_config() {
        let provider = create_provider(&config_with(ProviderConfig {
            command: Some("llm".to_string()),
            ..Default::default()
        }))
        .unwrap();
        assert_eq!(provider.name(), "command");
    }

    #[test]
    fn command_kind_requires_command() {
        let result = create_provider(&config_with(ProviderConfig {
            kind: Some("command".to_string()),
            ..Default::default()
        }));
        assert!(matches!(result, Err(ProviderError::Unavailable(_))));
    }
}
