//! One simulated client's lifecycle: admit, serve, release.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{error, warn};

use streamgate_kernel::admission::ClientRequest;
use streamgate_kernel::config::SimulationConfig;
use streamgate_kernel::outcome::{SessionTiming, SimulationOutcome};
use streamgate_kernel::session::{
    LatencyRange, LatencySource, SessionDelay, SessionError, SessionResult,
};

use crate::admission::AdmissionController;

/// Sleeps on the tokio timer.
///
/// Zero durations return immediately without touching the timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl SessionDelay for TokioDelay {
    async fn wait(&self, _client_id: u64, duration: Duration) -> SessionResult<()> {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
        Ok(())
    }
}

/// Everything a session needs besides its own request. Shared by all
/// sessions of a run.
#[derive(Clone)]
pub struct SessionContext {
    pub controller: AdmissionController,
    pub latency: Arc<dyn LatencySource>,
    pub delay: Arc<dyn SessionDelay>,
    pub latency_range: LatencyRange,
    /// Fixed part of the processing delay, in seconds.
    pub processing_delay_base_secs: f64,
    pub cpu_speed_ghz: f64,
    pub time_scale: f64,
}

impl SessionContext {
    pub fn new(
        config: &SimulationConfig,
        controller: AdmissionController,
        latency: Arc<dyn LatencySource>,
        delay: Arc<dyn SessionDelay>,
    ) -> Self {
        Self {
            controller,
            latency,
            delay,
            latency_range: config.network_latency_range_sec,
            processing_delay_base_secs: config.processing_delay_base_sec,
            cpu_speed_ghz: config.cpu_speed_ghz,
            time_scale: config.time_scale,
        }
    }

    /// `base_delay + cpu_needed / cpu_speed`.
    pub fn processing_delay_secs(&self) -> f64 {
        self.processing_delay_base_secs + self.controller.cpu_per_client_ghz() / self.cpu_speed_ghz
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("controller", &self.controller)
            .field("latency_range", &self.latency_range)
            .field("processing_delay_base_secs", &self.processing_delay_base_secs)
            .field("cpu_speed_ghz", &self.cpu_speed_ghz)
            .field("time_scale", &self.time_scale)
            .finish_non_exhaustive()
    }
}

/// A single client attempting to stream.
#[derive(Debug)]
pub struct ClientSession {
    request: ClientRequest,
    context: Arc<SessionContext>,
}

impl ClientSession {
    pub fn new(request: ClientRequest, context: Arc<SessionContext>) -> Self {
        Self { request, context }
    }

    pub fn request(&self) -> &ClientRequest {
        &self.request
    }

    /// Run the session to completion and report how it ended.
    ///
    /// Never fails: rejections and faults are both reported as outcomes.
    /// Once admitted, the reservation is released before this returns,
    /// whether serving succeeded, returned an error or panicked.
    pub async fn run(self) -> SimulationOutcome {
        let client_id = self.request.id;
        let mut guard = match self.context.controller.try_admit(&self.request) {
            Ok(guard) => guard,
            Err(reason) => return SimulationOutcome::rejected(client_id, reason),
        };

        let mut timing = None;
        let served = AssertUnwindSafe(self.serve(&mut timing))
            .catch_unwind()
            .await;

        if !guard.release() {
            warn!(client_id, "reservation was already released");
        }

        match served {
            Ok(Ok(())) => match timing {
                Some(timing) => SimulationOutcome::completed(client_id, timing),
                None => SimulationOutcome::failed(
                    client_id,
                    true,
                    None,
                    SessionError::Invariant("served session has no timing".into()).to_string(),
                ),
            },
            Ok(Err(err)) => {
                warn!(client_id, error = %err, "session fault; reservation released");
                SimulationOutcome::failed(client_id, true, timing, err.to_string())
            }
            Err(payload) => {
                let err = SessionError::Panicked {
                    client_id,
                    message: panic_message(payload.as_ref()),
                };
                error!(client_id, error = %err, "session panicked; reservation released");
                SimulationOutcome::failed(client_id, true, timing, err.to_string())
            }
        }
    }

    /// Draw the latency, compute timings and wait. `timing` is filled in
    /// before the wait so a failed wait still reports it.
    async fn serve(&self, timing: &mut Option<SessionTiming>) -> SessionResult<()> {
        let ctx = &self.context;
        let latency = ctx.latency.sample(ctx.latency_range);
        if !latency.is_finite() || !ctx.latency_range.contains(latency) {
            return Err(SessionError::Invariant(format!(
                "latency {latency} outside [{}, {}]",
                ctx.latency_range.min, ctx.latency_range.max
            )));
        }

        let drawn = SessionTiming::new(latency, ctx.processing_delay_secs());
        *timing = Some(drawn);

        ctx.delay
            .wait(self.request.id, drawn.scaled_duration(ctx.time_scale))
            .await
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
