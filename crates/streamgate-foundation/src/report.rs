//! Run reports and the stock [`OutcomeSink`] implementations.

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use streamgate_kernel::admission::PoolSnapshot;
use streamgate_kernel::outcome::{SessionStatus, SimulationOutcome, SimulationSummary};
use streamgate_kernel::session::OutcomeSink;

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Bandwidth-derived client cap used for the run.
    pub max_clients: usize,
    /// Concurrency bound used for the run.
    pub worker_limit: usize,
    /// One outcome per client, in completion order.
    pub outcomes: Vec<SimulationOutcome>,
    pub summary: SimulationSummary,
    /// Pool state after the last session finished.
    pub final_pool: PoolSnapshot,
}

impl SimulationReport {
    /// Whether every counter is back at zero and capacity was never exceeded.
    pub fn is_balanced(&self) -> bool {
        self.final_pool.is_idle() && self.final_pool.within_capacity()
    }

    /// Outcome for `client_id`, if present.
    pub fn outcome(&self, client_id: u64) -> Option<&SimulationOutcome> {
        self.outcomes.iter().find(|o| o.client_id == client_id)
    }
}

// ============================================================================
// CollectingSink
// ============================================================================

/// Keeps every outcome in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    outcomes: Mutex<Vec<SimulationOutcome>>,
    summary: Mutex<Option<SimulationSummary>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<SimulationOutcome> {
        self.outcomes.lock().clone()
    }

    pub fn summary(&self) -> Option<SimulationSummary> {
        self.summary.lock().clone()
    }
}

impl OutcomeSink for CollectingSink {
    fn on_outcome(&self, outcome: &SimulationOutcome) {
        self.outcomes.lock().push(outcome.clone());
    }

    fn on_finished(&self, summary: &SimulationSummary) {
        *self.summary.lock() = Some(summary.clone());
    }
}

// ============================================================================
// TracingSink
// ============================================================================

/// Emits one `tracing` event per outcome and one for the summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutcomeSink for TracingSink {
    fn on_outcome(&self, outcome: &SimulationOutcome) {
        let total = outcome.timing.map(|t| t.total_time_secs);
        match &outcome.status {
            SessionStatus::Completed => {
                info!(client_id = outcome.client_id, total_time_secs = ?total, "session completed");
            }
            SessionStatus::Rejected { reason } => {
                info!(client_id = outcome.client_id, %reason, "session rejected");
            }
            SessionStatus::Failed { message } => {
                warn!(client_id = outcome.client_id, admitted = outcome.admitted, %message, "session failed");
            }
            _ => info!(client_id = outcome.client_id, status = ?outcome.status, "session ended"),
        }
    }

    fn on_finished(&self, summary: &SimulationSummary) {
        info!(
            total = summary.total,
            admitted = summary.admitted,
            rejected_client_limit = summary.rejected_client_limit,
            rejected_resource_exhausted = summary.rejected_resource_exhausted,
            internal_errors = summary.internal_errors,
            "simulation summary"
        );
    }
}

// ============================================================================
// ChannelSink
// ============================================================================

/// Event forwarded by [`ChannelSink`].
#[derive(Debug, Clone)]
pub enum SimulationEvent {
    Outcome(SimulationOutcome),
    Finished(SimulationSummary),
}

/// Forwards outcomes over an unbounded mpsc channel.
///
/// A closed receiver is ignored; the run carries on.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SimulationEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<SimulationEvent>) -> Self {
        Self { tx }
    }

    /// A sink and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SimulationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl OutcomeSink for ChannelSink {
    fn on_outcome(&self, outcome: &SimulationOutcome) {
        let _ = self.tx.send(SimulationEvent::Outcome(outcome.clone()));
    }

    fn on_finished(&self, summary: &SimulationSummary) {
        let _ = self.tx.send(SimulationEvent::Finished(summary.clone()));
    }
}
