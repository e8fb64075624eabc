use streamgate_kernel::KernelError;
use streamgate_kernel::config::ConfigError;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigError(e.to_string())
    }
}

impl From<error_stack::Report<KernelError>> for CliError {
    fn from(report: error_stack::Report<KernelError>) -> Self {
        // Debug rendering keeps the attached context lines
        CliError::ConfigError(format!("{report:?}"))
    }
}

impl From<String> for CliError {
    fn from(s: String) -> Self {
        CliError::Other(s)
    }
}
