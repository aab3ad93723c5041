use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::registry::{DbKey, KeySpace};

const MAX_INDENT: usize = 16;

/// Settings that stay fixed for one translation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// `build` attribute on the document root.
    pub build: u32,
    /// `update_package_version` attribute on the document root.
    pub update_package_version: u32,
    /// Lowest key the registry hands out.
    pub db_key_start: DbKey,
    /// `broadcast` attribute written on every subnet.
    pub default_broadcast: bool,
    pub key_space: KeySpace,
    /// Spaces per nesting level in the emitted document.
    pub indent: usize,
    pub xml_declaration: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            build: 11575,
            update_package_version: 1773,
            db_key_start: 1195,
            default_broadcast: true,
            key_space: KeySpace::PerNamespace,
            indent: 4,
            xml_declaration: false,
        }
    }
}

/// Errors returned when loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid config {path}: {reason}")]
    Invalid { path: String, reason: String },
}

/// Load a configuration file. Keys missing from the file keep their defaults.
pub fn load_config(path: &Path) -> Result<ConvertConfig, ConfigLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_config(&raw, path.display().to_string())
}

/// Built-in configuration shipped with the binary.
pub fn default_config() -> ConvertConfig {
    let embedded = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml"));
    parse_config(embedded, "embedded config".to_string()).unwrap_or_default()
}

fn parse_config(raw: &str, path: String) -> Result<ConvertConfig, ConfigLoadError> {
    let config: ConvertConfig = toml::from_str(raw).map_err(|source| ConfigLoadError::Parse {
        path: path.clone(),
        source,
    })?;
    validate(&config).map_err(|reason| ConfigLoadError::Invalid { path, reason })?;
    Ok(config)
}

fn validate(config: &ConvertConfig) -> Result<(), String> {
    if config.db_key_start == 0 {
        return Err("db_key_start must be at least 1".to_string());
    }
    if config.indent > MAX_INDENT {
        return Err(format!("indent must be at most {MAX_INDENT}"));
    }
    Ok(())
}
