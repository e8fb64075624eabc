//! Crate-level error types for `streamgate-kernel`.
//!
//! [`KernelError`] composes the sub-module errors (config, session) and is
//! carried inside an [`error_stack::Report`] so callers can attach context
//! as the error propagates.
//!
//! # Usage
//!
//! ```rust,ignore
//! use streamgate_kernel::config::SimulationConfig;
//!
//! // Attaches the path and the failing step to the report.
//! let config = SimulationConfig::load("sim.toml")?;
//! ```

use thiserror::Error;

/// Crate-level error type for `streamgate-kernel`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KernelError {
    /// A configuration error (requires the `config` feature).
    #[cfg(feature = "config")]
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// A fault raised inside a client session.
    #[error("Session error: {0}")]
    Session(#[from] crate::session::SessionError),
}

/// Convenience result alias using [`error_stack::Report`].
pub type KernelResult<T> = Result<T, error_stack::Report<KernelError>>;
