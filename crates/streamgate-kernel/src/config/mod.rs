//! Configuration loading
//!
//! Loads [`SimulationConfig`] (or any deserializable type) from YAML, TOML,
//! JSON, INI, RON or JSON5 files.
//!
//! ## Features
//!
//! - Auto-detection of format from file extension
//! - Environment variable substitution (`${VAR}` and `$VAR` syntax)
//! - Layering of multiple sources, later ones winning
//! - `STREAMGATE_*` environment overrides via [`load_with_env`]

mod simulation;

pub use simulation::{SimulationConfig, ENV_PREFIX};

use config::{Config as Cfg, Environment, File, FileFormat};
use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Configuration loading and validation error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A value failed validation (non-positive capacity, malformed range, ...).
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Detect configuration format from file extension
///
/// # Supported Extensions
///
/// - YAML: `.yaml`, `.yml`
/// - TOML: `.toml`
/// - JSON: `.json`
/// - INI: `.ini`
/// - RON: `.ron`
/// - JSON5: `.json5`
pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        "ini" => Ok(FileFormat::Ini),
        "ron" => Ok(FileFormat::Ron),
        "json5" => Ok(FileFormat::Json5),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Substitute environment variables in a string
///
/// `${VAR_NAME}` is resolved first, then bare `$VAR_NAME`. References to
/// unset variables are left untouched.
///
/// # Example
///
/// ```rust,ignore
/// use streamgate_kernel::config::substitute_env_vars;
///
/// std::env::set_var("CLIENTS", "120");
/// let result = substitute_env_vars("num_clients = ${CLIENTS}")?;
/// assert_eq!(result, "num_clients = 120");
/// ```
pub fn substitute_env_vars(content: &str) -> ConfigResult<String> {
    let re_braced = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    let result = re_braced
        .replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string();

    let re_simple = Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b")
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    let result = re_simple
        .replace_all(&result, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string();

    Ok(result)
}

fn build<T>(builder: config::ConfigBuilder<config::builder::DefaultState>) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    builder
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

/// Load configuration from a file
///
/// The format is detected from the extension and environment variables are
/// substituted before parsing.
pub fn load_config<T>(path: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let format = detect_format(path)?;
    let content = substitute_env_vars(&std::fs::read_to_string(path)?)?;
    tracing::debug!(path, ?format, "loading config file");

    build(Cfg::builder().add_source(File::from_str(&content, format)))
}

/// Load configuration from a string with explicit format
///
/// # Example
///
/// ```rust,ignore
/// use streamgate_kernel::config::{from_str, FileFormat, SimulationConfig};
///
/// let config: SimulationConfig = from_str("num_clients = 10", FileFormat::Toml)?;
/// assert_eq!(config.num_clients, 10);
/// ```
pub fn from_str<T>(content: &str, format: FileFormat) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let content = substitute_env_vars(content)?;
    build(Cfg::builder().add_source(File::from_str(&content, format)))
}

/// Merge multiple configuration sources
///
/// Later sources override earlier ones (defaults -> site -> local).
pub fn merge_configs<T>(sources: &[(&str, FileFormat)]) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let mut builder = Cfg::builder();
    for (content, format) in sources {
        let substituted = substitute_env_vars(content)?;
        builder = builder.add_source(File::from_str(&substituted, *format));
    }
    build(builder)
}

/// Load configuration with environment variable overrides
///
/// Environment variables are prefixed with `env_prefix` and use `__` for
/// nesting: `STREAMGATE_NUM_CLIENTS=80` overrides `num_clients`, and
/// `STREAMGATE_NETWORK_LATENCY_RANGE_SEC__MAX=0.5` overrides the range's upper bound.
pub fn load_with_env<T>(path: &str, env_prefix: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let format = detect_format(path)?;
    let content = substitute_env_vars(&std::fs::read_to_string(path)?)?;
    tracing::debug!(path, env_prefix, "loading config file with env overrides");

    build(
        Cfg::builder()
            .add_source(File::from_str(&content, format))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            ),
    )
}

/// Start from serialized `defaults` and apply environment overrides only.
///
/// Used when no config file is given.
pub fn defaults_with_env<T>(defaults: &T, env_prefix: &str) -> ConfigResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let base = Cfg::try_from(defaults).map_err(|e| ConfigError::Serialization(e.to_string()))?;
    build(
        Cfg::builder().add_source(base).add_source(
            Environment::with_prefix(env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        ),
    )
}
