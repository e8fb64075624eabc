//! Session kernel contract: the collaborators a client session depends on.
//!
//! # Architecture
//!
//! - **Trait definitions** live here in `streamgate-kernel`.
//! - **Concrete implementations** (`UniformLatency`, `TokioDelay`, the sinks)
//!   live in `streamgate-foundation`.
//!
//! Each collaborator is injected rather than reached through a global. Tests
//! can therefore pin latency draws, run delays on paused time, or force a
//! fault in the middle of a session.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::outcome::{SimulationOutcome, SimulationSummary};

// ---------------------------------------------------------------------------
// LatencyRange
// ---------------------------------------------------------------------------

/// Closed interval `[min, max]` of network latency, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencyRange {
    pub min: f64,
    pub max: f64,
}

impl LatencyRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `0 ≤ min ≤ max`, both finite.
    pub fn is_well_formed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.max >= self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for LatencyRange {
    fn default() -> Self {
        Self {
            min: 0.01,
            max: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// LatencySource
// ---------------------------------------------------------------------------

/// Source of per-session network latency draws.
pub trait LatencySource: Send + Sync {
    /// Draw a latency, in seconds, from `range`.
    fn sample(&self, range: LatencyRange) -> f64;
}

// ---------------------------------------------------------------------------
// SessionDelay
// ---------------------------------------------------------------------------

/// Suspends a session for its simulated processing time.
///
/// This is the only suspension point of a session and it runs outside the
/// pool lock. An `Err` is a fault: the session still releases its
/// reservation and reports a failed outcome.
#[async_trait]
pub trait SessionDelay: Send + Sync {
    async fn wait(&self, client_id: u64, duration: Duration) -> SessionResult<()>;
}

// ---------------------------------------------------------------------------
// OutcomeSink
// ---------------------------------------------------------------------------

/// Observer for simulation results.
///
/// The orchestrator calls `on_outcome` once per client in completion order,
/// then `on_finished` once. Implementations must not block for long; they
/// run on the orchestrator's collection loop.
pub trait OutcomeSink: Send + Sync {
    fn on_outcome(&self, outcome: &SimulationOutcome);

    fn on_finished(&self, _summary: &SimulationSummary) {}
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutcomeSink for NullSink {
    fn on_outcome(&self, _outcome: &SimulationOutcome) {}
}

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Unexpected faults inside a session.
///
/// These never escape the session boundary: they become a failed
/// [`SimulationOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The simulated delay was cut short.
    #[error("simulated delay interrupted for client {client_id}: {reason}")]
    DelayInterrupted { client_id: u64, reason: String },

    /// The session task panicked.
    #[error("session for client {client_id} panicked: {message}")]
    Panicked { client_id: u64, message: String },

    /// A ledger or policy invariant did not hold.
    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
