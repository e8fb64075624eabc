//! streamgate kernel
//!
//! Contracts shared by the admission engine and its callers: resource
//! vectors and pool snapshots, the [`AdmissionPolicy`](admission::AdmissionPolicy)
//! trait, per-client outcomes, the session collaborator traits and the
//! configuration loader.

// admission module
pub mod admission;
pub use admission::{
    AdmissionPolicy, ClientRequest, PoolSnapshot, RejectionReason, ResourceKind, ResourceVector,
};

// outcome module
pub mod outcome;
pub use outcome::{SessionStatus, SessionTiming, SimulationOutcome, SimulationSummary};

// session module
pub mod session;
pub use session::{
    LatencyRange, LatencySource, NullSink, OutcomeSink, SessionDelay, SessionError,
    SessionResult,
};

// config module
#[cfg(feature = "config")]
pub mod config;

// error module
pub mod error;
pub use error::{KernelError, KernelResult};
