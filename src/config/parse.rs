use super::types::*;
use crate::config::{expand_env_vars, expand_tilde, unexpanded_env_vars};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })
}

/// Parses and validates config text, expanding `$env{VAR}` references first.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml)?;

    let mut config: Config = serde_yaml::from_str(&yaml)?;

    if let StorageConfig::Filesystem { path } = &mut config.storage {
        *path = expand_tilde(path);
    }

    validate_config(&config)?;
    Ok(config)
}

fn check_unexpanded_vars(yaml: &str) -> Result<(), ConfigError> {
    let mut vars = unexpanded_env_vars(yaml);
    if vars.is_empty() {
        return Ok(());
    }
    vars.sort();
    vars.dedup();

    let message = if vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             Set it before running (export {0}=...) or replace the reference in the config file.",
            vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             Set them before running or replace the references in the config file.",
            vars.join(", ")
        )
    };

    Err(ConfigError::Validation(message))
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.credentials.tenant_id.trim().is_empty() {
        errors.push("credentials.tenant_id must not be empty".to_string());
    }
    if config.credentials.client_id.trim().is_empty() {
        errors.push("credentials.client_id must not be empty".to_string());
    }
    if config.credentials.client_secret.is_empty() {
        errors.push("credentials.client_secret must not be empty".to_string());
    }

    match &config.storage {
        StorageConfig::Azure { account, .. } => {
            if !is_valid_account_name(account) {
                errors.push(format!(
                    "storage.account '{}' must be 3-24 lowercase letters or digits",
                    account
                ));
            }
        }
        StorageConfig::Filesystem { path } => {
            if path.as_os_str().is_empty() {
                errors.push("storage.path must not be empty".to_string());
            }
        }
    }

    if !(1..=999).contains(&config.feed.page_size) {
        errors.push(format!(
            "feed.page_size must be between 1 and 999, got {}",
            config.feed.page_size
        ));
    }

    if config.retry.max_attempts == Some(0) {
        errors.push("retry.max_attempts must be at least 1 when set".to_string());
    }

    if config.streams.is_empty() {
        errors.push("at least one stream must be configured".to_string());
    }

    let mut ids = HashSet::new();
    let mut destinations = HashSet::new();
    for stream in &config.streams {
        if stream.id.trim().is_empty() {
            errors.push("stream id must not be empty".to_string());
        } else if !ids.insert(stream.id.as_str()) {
            errors.push(format!("duplicate stream id '{}'", stream.id));
        }

        if !is_valid_container_name(&stream.destination) {
            errors.push(format!(
                "stream '{}': destination '{}' is not a valid container name \
                 (3-63 lowercase letters, digits or single hyphens)",
                stream.id, stream.destination
            ));
        }
        // Checkpoints live in destination metadata, one stream per destination
        if !destinations.insert(stream.destination.as_str()) {
            errors.push(format!(
                "stream '{}': destination '{}' is already used by another stream",
                stream.id, stream.destination
            ));
        }

        if let Some(field) = &stream.cursor_field {
            if field.trim().is_empty() {
                errors.push(format!("stream '{}': cursor_field must not be empty", stream.id));
            }
        }
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(ConfigError::Validation(errors.remove(0))),
        _ => Err(ConfigError::ValidationList(errors)),
    }
}

fn is_valid_container_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    (3..=63).contains(&bytes.len())
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && bytes[0] != b'-'
        && bytes[bytes.len() - 1] != b'-'
        && !name.contains("--")
}

fn is_valid_account_name(name: &str) -> bool {
    (3..=24).contains(&name.len())
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}
