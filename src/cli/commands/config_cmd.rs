//! config command - Get, set, or list configuration values

use anyhow::{Context as _, Result};

use super::{load_config, verbosity};
use crate::core::config::GlobalConfig;
use crate::engine::Context;
use crate::ui::output;

/// Get a configuration value.
///
/// A known key that is not set prints nothing.
pub fn get(_ctx: &Context, key: &str) -> Result<()> {
    let config = load_config()?;
    if let Some(value) = config.global.get_key(key)? {
        output::result(value);
    }
    Ok(())
}

/// Set a configuration value and write the config file.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let mut config = load_config()?;
    config
        .global
        .set_key(key, value)
        .with_context(|| format!("Cannot set {}", key))?;
    let path = config.save().context("Failed to write config")?;

    output::print(format!("Set {} = {}", key, value), verbosity(ctx));
    output::debug(format!("wrote {}", path.display()), verbosity(ctx));
    Ok(())
}

/// List all configuration values.
pub fn list(ctx: &Context) -> Result<()> {
    let config = load_config()?;

    match config.loaded_from() {
        Some(path) => output::print(format!("# {}", path.display()), verbosity(ctx)),
        None => output::print("# (no config file, using defaults)", verbosity(ctx)),
    }
    for key in GlobalConfig::KEYS {
        let value = config.global.get_key(key)?;
        output::result(format!(
            "{} = {}",
            key,
            value.as_deref().unwrap_or("(not set)")
        ));
    }
    Ok(())
}
