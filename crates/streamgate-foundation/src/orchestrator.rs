//! Simulation driver.
//!
//! The [`Orchestrator`] launches one [`ClientSession`] per client id
//! `1..=num_clients` and collects one [`SimulationOutcome`] for each.
//!
//! # Architecture
//!
//! A producer task acquires permits from a fair `tokio::sync::Semaphore`
//! sized to the worker limit, in client-id order, and spawns one task per
//! session. Requests beyond the limit wait in FIFO order for a free slot;
//! none are dropped. Finished sessions send their outcome over an mpsc
//! channel, so outcomes are collected in completion order.
//!
//! A panic inside a session task is caught at the task boundary and turned
//! into a failed outcome for that client. It never aborts sibling sessions.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Semaphore, mpsc};
use tracing::{error, info};

use streamgate_kernel::admission::ClientRequest;
use streamgate_kernel::config::{ConfigResult, SimulationConfig};
use streamgate_kernel::outcome::{SimulationOutcome, SimulationSummary};
use streamgate_kernel::session::{
    LatencySource, NullSink, OutcomeSink, SessionDelay, SessionError,
};

use crate::admission::AdmissionController;
use crate::latency::UniformLatency;
use crate::pool::ResourcePool;
use crate::report::SimulationReport;
use crate::session::{ClientSession, SessionContext, TokioDelay, panic_message};

/// Runs a whole simulation against one [`ResourcePool`].
///
/// # Example
///
/// ```rust,ignore
/// use streamgate_foundation::Orchestrator;
/// use streamgate_kernel::config::SimulationConfig;
///
/// let orchestrator = Orchestrator::new(SimulationConfig::default().with_seed(7))?;
/// let report = orchestrator.run().await;
/// assert_eq!(report.summary.total, 50);
/// ```
pub struct Orchestrator {
    config: SimulationConfig,
    pool: Arc<ResourcePool>,
    latency: Arc<dyn LatencySource>,
    delay: Arc<dyn SessionDelay>,
    sink: Arc<dyn OutcomeSink>,
}

impl Orchestrator {
    /// Validate `config` and build an orchestrator with a fresh pool.
    ///
    /// Latency comes from [`UniformLatency`] (seeded if `config.seed` is
    /// set), delays from [`TokioDelay`], and outcomes go nowhere until a
    /// sink is attached.
    pub fn new(config: SimulationConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            pool: Arc::new(ResourcePool::from_config(&config)),
            latency: Arc::new(UniformLatency::from_seed_option(config.seed)),
            delay: Arc::new(TokioDelay),
            sink: Arc::new(NullSink),
            config,
        })
    }

    pub fn with_latency_source(mut self, latency: Arc<dyn LatencySource>) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_delay(mut self, delay: Arc<dyn SessionDelay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The pool sessions reserve from. Shared across runs.
    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    /// Run every client to completion.
    ///
    /// Returns exactly `num_clients` outcomes. Each is forwarded to the sink
    /// as it arrives, then the summary is.
    pub async fn run(&self) -> SimulationReport {
        let num_clients = self.config.num_clients;
        let max_clients = self.config.max_clients();
        let worker_limit = self.config.worker_limit();
        info!(num_clients, max_clients, worker_limit, "simulation starting");

        let controller = AdmissionController::from_config(Arc::clone(&self.pool), &self.config);
        let context = Arc::new(SessionContext::new(
            &self.config,
            controller,
            Arc::clone(&self.latency),
            Arc::clone(&self.delay),
        ));

        let (tx, mut rx) = mpsc::unbounded_channel::<SimulationOutcome>();
        let producer = tokio::spawn(launch_sessions(
            context,
            Arc::new(Semaphore::new(worker_limit.min(Semaphore::MAX_PERMITS))),
            num_clients as u64,
            self.config.per_client_bitrate_mbps,
            tx,
        ));

        let mut outcomes = Vec::with_capacity(num_clients);
        while let Some(outcome) = rx.recv().await {
            self.sink.on_outcome(&outcome);
            outcomes.push(outcome);
        }

        if let Err(e) = producer.await {
            error!(error = %e, "session producer task failed");
        }

        if outcomes.len() < num_clients {
            let seen: HashSet<u64> = outcomes.iter().map(|o| o.client_id).collect();
            for client_id in (1..=num_clients as u64).filter(|id| !seen.contains(id)) {
                error!(client_id, "session produced no outcome");
                let outcome = SimulationOutcome::failed(
                    client_id,
                    false,
                    None,
                    "session produced no outcome",
                );
                self.sink.on_outcome(&outcome);
                outcomes.push(outcome);
            }
        }

        let summary = SimulationSummary::from_outcomes(&outcomes);
        self.sink.on_finished(&summary);

        let final_pool = self.pool.snapshot();
        info!(
            admitted = summary.admitted,
            rejected = summary.rejected(),
            internal_errors = summary.internal_errors,
            peak_active_clients = final_pool.peak_active_clients,
            "simulation finished"
        );

        SimulationReport {
            max_clients,
            worker_limit,
            outcomes,
            summary,
            final_pool,
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

/// Acquire a slot per client in id order and spawn its session.
async fn launch_sessions(
    context: Arc<SessionContext>,
    semaphore: Arc<Semaphore>,
    num_clients: u64,
    bitrate_mbps: f64,
    tx: mpsc::UnboundedSender<SimulationOutcome>,
) {
    for client_id in 1..=num_clients {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            error!(client_id, "worker semaphore closed; no further sessions launched");
            break;
        };

        let session = ClientSession::new(
            ClientRequest::new(client_id, bitrate_mbps),
            Arc::clone(&context),
        );
        let tx = tx.clone();
        tokio::spawn(async move {
            let outcome = match AssertUnwindSafe(session.run()).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let err = SessionError::Panicked {
                        client_id,
                        message: panic_message(payload.as_ref()),
                    };
                    error!(client_id, error = %err, "session task panicked");
                    SimulationOutcome::failed(client_id, false, None, err.to_string())
                }
            };
            let _ = tx.send(outcome);
            drop(permit);
        });
    }
}
