//! Environment handling for config values.
//!
//! Two layers: `${VAR_NAME}` references inside string values are substituted at
//! load time (`$${VAR}` keeps a literal `${VAR}`), and a fixed set of
//! `PAGEWATCH_*` variables override individual settings afterwards.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::schema::{ClientConfig, CollectorConfig, LoggingConfig, PageWatchConfig};

/// `${VAR}` with an optional leading `$` escape.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern"));

pub const ENV_ENDPOINT: &str = "PAGEWATCH_ENDPOINT";
pub const ENV_BIND: &str = "PAGEWATCH_BIND";
pub const ENV_PORT: &str = "PAGEWATCH_PORT";
pub const ENV_LOG_DIR: &str = "PAGEWATCH_LOG_DIR";
pub const ENV_RUST_LOG: &str = "RUST_LOG";

#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references across a config value tree using the process
/// environment. Unset or empty variables are an error.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute env vars using a provided map.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                let child = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                out.insert(k.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(v) if !v.is_empty() => v.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Apply `PAGEWATCH_*` and `RUST_LOG` overrides from the process environment.
pub fn apply_env_overrides(config: PageWatchConfig) -> Result<PageWatchConfig> {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

pub fn apply_env_overrides_with(
    mut config: PageWatchConfig,
    env: &HashMap<String, String>,
) -> Result<PageWatchConfig> {
    let get = |name: &str| env.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(endpoint) = get(ENV_ENDPOINT) {
        debug!(var = ENV_ENDPOINT, "Overriding client endpoint");
        config.client.get_or_insert_with(ClientConfig::default).endpoint = Some(endpoint.to_string());
    }
    if let Some(bind) = get(ENV_BIND) {
        config.collector.get_or_insert_with(CollectorConfig::default).bind_address =
            Some(bind.to_string());
    }
    if let Some(port) = get(ENV_PORT) {
        let port: u16 = port
            .parse()
            .with_context(|| format!("{ENV_PORT} must be a port number, got '{port}'"))?;
        config.collector.get_or_insert_with(CollectorConfig::default).port = Some(port);
    }
    if let Some(dir) = get(ENV_LOG_DIR) {
        config.collector.get_or_insert_with(CollectorConfig::default).log_dir = Some(dir.into());
    }
    if let Some(level) = get(ENV_RUST_LOG) {
        config.logging.get_or_insert_with(LoggingConfig::default).level = Some(level.to_string());
    }
    Ok(config)
}
