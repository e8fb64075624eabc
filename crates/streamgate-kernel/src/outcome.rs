//! Per-client outcomes and their aggregate summary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::admission::RejectionReason;

/// Timing of one admitted session, in seconds of simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionTiming {
    /// Uniform draw from the configured latency range.
    pub network_latency_secs: f64,
    /// `base_delay + cpu_needed / cpu_speed`.
    pub processing_delay_secs: f64,
    /// `processing_delay + network_latency`.
    pub total_time_secs: f64,
}

impl SessionTiming {
    pub fn new(network_latency_secs: f64, processing_delay_secs: f64) -> Self {
        Self {
            network_latency_secs,
            processing_delay_secs,
            total_time_secs: processing_delay_secs + network_latency_secs,
        }
    }

    /// Total time as a [`Duration`], scaled by `time_scale`.
    ///
    /// Non-finite or negative products collapse to zero.
    pub fn scaled_duration(&self, time_scale: f64) -> Duration {
        Duration::try_from_secs_f64(self.total_time_secs * time_scale).unwrap_or_default()
    }
}

/// How a client's session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionStatus {
    /// Admitted, served and released.
    Completed,
    /// Refused by admission control.
    Rejected { reason: RejectionReason },
    /// An unexpected fault inside the session.
    #[serde(rename = "internal_error")]
    Failed { message: String },
}

/// The single record produced for each client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutcome {
    pub client_id: u64,
    /// Whether the client obtained a reservation.
    pub admitted: bool,
    /// Present once the session was admitted and its timing was drawn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<SessionTiming>,
    #[serde(flatten)]
    pub status: SessionStatus,
}

impl SimulationOutcome {
    /// An admitted session that ran to completion.
    pub fn completed(client_id: u64, timing: SessionTiming) -> Self {
        Self {
            client_id,
            admitted: true,
            timing: Some(timing),
            status: SessionStatus::Completed,
        }
    }

    /// A request refused by admission control.
    pub fn rejected(client_id: u64, reason: RejectionReason) -> Self {
        Self {
            client_id,
            admitted: false,
            timing: None,
            status: SessionStatus::Rejected { reason },
        }
    }

    /// A session that hit an internal fault.
    pub fn failed(
        client_id: u64,
        admitted: bool,
        timing: Option<SessionTiming>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            client_id,
            admitted,
            timing,
            status: SessionStatus::Failed {
                message: message.into(),
            },
        }
    }

    /// The rejection reason, if the client was refused.
    pub fn rejection(&self) -> Option<&RejectionReason> {
        match &self.status {
            SessionStatus::Rejected { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SessionStatus::Failed { .. })
    }
}

/// Aggregate counts over a run's outcomes.
///
/// `admitted + rejected() == total` always holds. Failed sessions are
/// counted under `internal_errors` and, depending on when they failed,
/// under `admitted` too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub total: usize,
    pub admitted: usize,
    pub rejected_client_limit: usize,
    pub rejected_resource_exhausted: usize,
    pub internal_errors: usize,
    /// Mean total time over outcomes that carry a timing.
    pub mean_total_time_secs: Option<f64>,
    pub max_total_time_secs: Option<f64>,
}

impl SimulationSummary {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a SimulationOutcome>) -> Self {
        let mut summary = Self::default();
        let mut timed = 0usize;
        let mut sum = 0.0;
        let mut max: Option<f64> = None;

        for outcome in outcomes {
            summary.total += 1;
            if outcome.admitted {
                summary.admitted += 1;
            }
            match &outcome.status {
                SessionStatus::Completed => {}
                SessionStatus::Rejected { reason } if reason.is_client_limit() => {
                    summary.rejected_client_limit += 1;
                }
                SessionStatus::Rejected { .. } => summary.rejected_resource_exhausted += 1,
                SessionStatus::Failed { .. } => summary.internal_errors += 1,
            }
            if let Some(timing) = outcome.timing {
                timed += 1;
                sum += timing.total_time_secs;
                max = Some(max.map_or(timing.total_time_secs, |m| m.max(timing.total_time_secs)));
            }
        }

        if timed > 0 {
            summary.mean_total_time_secs = Some(sum / timed as f64);
        }
        summary.max_total_time_secs = max;
        summary
    }

    /// Outcomes without a reservation, whatever the cause.
    pub fn rejected(&self) -> usize {
        self.total - self.admitted
    }
}
