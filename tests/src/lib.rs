//! streamgate testing utilities
//!
//! Test doubles for the session collaborators, so that integration tests
//! can pin latency draws, force faults in the middle of a session and record
//! every outcome without a live clock.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use streamgate_kernel::outcome::{SimulationOutcome, SimulationSummary};
use streamgate_kernel::session::{
    LatencyRange, LatencySource, OutcomeSink, SessionDelay, SessionError, SessionResult,
};

/// Which clients a fault applies to.
#[derive(Debug, Clone)]
enum Target {
    All,
    Clients(HashSet<u64>),
}

impl Target {
    fn hits(&self, client_id: u64) -> bool {
        match self {
            Self::All => true,
            Self::Clients(ids) => ids.contains(&client_id),
        }
    }
}

// ============================================================================
// FixedLatency
// ============================================================================

/// Returns the same latency on every draw and counts the draws.
#[derive(Debug, Default)]
pub struct FixedLatency {
    value: f64,
    draws: AtomicUsize,
}

impl FixedLatency {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            draws: AtomicUsize::new(0),
        }
    }

    /// Number of draws taken so far.
    pub fn draws(&self) -> usize {
        self.draws.load(Ordering::Relaxed)
    }
}

impl LatencySource for FixedLatency {
    fn sample(&self, _range: LatencyRange) -> f64 {
        self.draws.fetch_add(1, Ordering::Relaxed);
        self.value
    }
}

// ============================================================================
// FailingDelay
// ============================================================================

/// Sleeps like the real delay, then fails for the targeted clients.
///
/// Every call is recorded with the duration it was asked to wait.
#[derive(Debug, Clone)]
pub struct FailingDelay {
    target: Target,
    calls: Arc<Mutex<Vec<(u64, Duration)>>>,
}

impl FailingDelay {
    /// Fail every session.
    pub fn always() -> Self {
        Self {
            target: Target::All,
            calls: Arc::default(),
        }
    }

    /// Fail only the listed clients.
    pub fn for_clients(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            target: Target::Clients(ids.into_iter().collect()),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<(u64, Duration)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SessionDelay for FailingDelay {
    async fn wait(&self, client_id: u64, duration: Duration) -> SessionResult<()> {
        self.calls.lock().push((client_id, duration));
        tokio::time::sleep(duration).await;
        if self.target.hits(client_id) {
            tracing::debug!(client_id, "injecting delay fault");
            return Err(SessionError::DelayInterrupted {
                client_id,
                reason: "forced fault".into(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// PanickingDelay
// ============================================================================

/// Sleeps half the requested time, then panics for the targeted clients.
#[derive(Debug, Clone)]
pub struct PanickingDelay {
    target: Target,
}

impl PanickingDelay {
    pub fn always() -> Self {
        Self {
            target: Target::All,
        }
    }

    pub fn for_clients(ids: impl IntoIterator<Item = u64>) -> Self {
        Self {
            target: Target::Clients(ids.into_iter().collect()),
        }
    }
}

#[async_trait]
impl SessionDelay for PanickingDelay {
    async fn wait(&self, client_id: u64, duration: Duration) -> SessionResult<()> {
        if self.target.hits(client_id) {
            tokio::time::sleep(duration / 2).await;
            panic!("forced panic in session {client_id}");
        }
        tokio::time::sleep(duration).await;
        Ok(())
    }
}

// ============================================================================
// RecordingSink
// ============================================================================

/// Records every callback the orchestrator makes.
#[derive(Debug, Default)]
pub struct RecordingSink {
    outcomes: Mutex<Vec<SimulationOutcome>>,
    summaries: Mutex<Vec<SimulationSummary>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<SimulationOutcome> {
        self.outcomes.lock().clone()
    }

    pub fn summaries(&self) -> Vec<SimulationSummary> {
        self.summaries.lock().clone()
    }

    /// Client ids in the order their outcomes arrived.
    pub fn client_ids(&self) -> Vec<u64> {
        self.outcomes.lock().iter().map(|o| o.client_id).collect()
    }
}

impl OutcomeSink for RecordingSink {
    fn on_outcome(&self, outcome: &SimulationOutcome) {
        self.outcomes.lock().push(outcome.clone());
    }

    fn on_finished(&self, summary: &SimulationSummary) {
        self.summaries.lock().push(summary.clone());
    }
}

/// Assert that a pool holds nothing: zero usage, zero active clients and no
/// live reservations.
#[macro_export]
macro_rules! assert_pool_idle {
    ($pool:expr) => {
        let snapshot = $pool.snapshot();
        assert!(
            snapshot.is_idle(),
            "pool not idle: used={:?} active={}",
            snapshot.used,
            snapshot.active_clients
        );
        assert_eq!(
            $pool.live_reservations(),
            0,
            "pool still tracks live reservations"
        );
    };
}
