//! Command implementations

pub mod config_cmd;
pub mod run;

use crate::CliError;
use std::path::Path;
use streamgate_kernel::config::{ENV_PREFIX, SimulationConfig, defaults_with_env, load_with_env};

/// The config loader takes `&str` paths.
fn path_str(path: Option<&Path>) -> Result<Option<&str>, CliError> {
    path.map(|p| {
        p.to_str().ok_or_else(|| {
            CliError::ConfigError(format!("config path is not UTF-8: {}", p.display()))
        })
    })
    .transpose()
}

/// Load the effective configuration without validating it.
///
/// `path` wins over defaults and `STREAMGATE_*` variables win over both.
pub(crate) fn load_effective(path: Option<&Path>) -> Result<SimulationConfig, CliError> {
    let config = match path_str(path)? {
        Some(path) => load_with_env(path, ENV_PREFIX)?,
        None => defaults_with_env(&SimulationConfig::default(), ENV_PREFIX)?,
    };
    tracing::debug!(?path, num_clients = config.num_clients, "configuration loaded");
    Ok(config)
}

/// Load and validate, keeping the loader's context on failure.
pub(crate) fn load_validated(path: Option<&Path>) -> Result<SimulationConfig, CliError> {
    Ok(SimulationConfig::load(path_str(path)?)?)
}
