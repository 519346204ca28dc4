//! `pagewatch-config`: PageWatch runtime configuration management.
//!
//! Provides:
//! - Typed config schema (client, signals, overlay strategies, collector, logging)
//! - YAML read/write with atomic replace
//! - `${ENV_VAR}` substitution and `PAGEWATCH_*` overrides
//! - Default value application
//! - Validation with errors and warnings

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use schema::{
    ClientConfig, CollectorConfig, LoggingConfig, OverlayConfig, OverlayStrategyConfig,
    PageWatchConfig, PollConfig, SignalsConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load, apply env substitution and overrides, apply defaults, and validate.
///
/// This is the main entry point for loading a config at runtime. Validation
/// errors are fatal; warnings are logged.
pub async fn load_and_prepare(path: &Path) -> Result<PageWatchConfig> {
    let raw_config = load_config(path).await?;

    let value: Value =
        serde_json::to_value(&raw_config).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    let config: PageWatchConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides(config)?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.into_iter().next() {
        bail!(first);
    }

    Ok(config)
}
