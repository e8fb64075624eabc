//! Simulation parameters and their validation.

use serde::{Deserialize, Serialize};

use error_stack::{Report, ResultExt};

use super::{ConfigError, ConfigResult};
use crate::admission::ResourceVector;
use crate::error::{KernelError, KernelResult};
use crate::session::LatencyRange;

/// Prefix for environment overrides (`STREAMGATE_NUM_CLIENTS=...`).
pub const ENV_PREFIX: &str = "STREAMGATE";

/// Capacities, per-client demand and run parameters for one simulation.
///
/// Every field has a default, so a config file only needs the keys it
/// changes. Call [`validate`](Self::validate) before handing the config to
/// the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of clients attempting to connect.
    pub num_clients: usize,
    /// Video bitrate per client, in Mbps.
    pub per_client_bitrate_mbps: f64,
    /// Server uplink, in Mbps.
    pub bandwidth_capacity_mbps: f64,
    pub cpu_cores: u32,
    /// Clock speed per core, in GHz.
    pub cpu_speed_ghz: f64,
    pub memory_capacity_gb: f64,
    /// Storage read/write throughput, in MB/s.
    pub storage_capacity_mbps: f64,
    /// Fixed processing time per admitted request, in seconds.
    pub processing_delay_base_sec: f64,
    /// Network latency drawn uniformly per session, in seconds.
    pub network_latency_range_sec: LatencyRange,
    /// Concurrent sessions in flight. Defaults to the client limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_concurrency_limit: Option<usize>,
    /// Share of one core a client consumes, in `(0, 1]`.
    pub cpu_fraction_per_client: f64,
    /// RAM held by each client, in GB.
    pub memory_per_client_gb: f64,
    /// Seed for latency draws. Unset means entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Multiplier applied to wall-clock sleeps; reported timings are unscaled.
    pub time_scale: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_clients: 50,
            per_client_bitrate_mbps: 5.0,
            bandwidth_capacity_mbps: 1000.0,
            cpu_cores: 4,
            cpu_speed_ghz: 2.5,
            memory_capacity_gb: 16.0,
            storage_capacity_mbps: 500.0,
            processing_delay_base_sec: 0.05,
            network_latency_range_sec: LatencyRange::default(),
            worker_concurrency_limit: None,
            cpu_fraction_per_client: 0.1,
            memory_per_client_gb: 0.1,
            seed: None,
            time_scale: 1.0,
        }
    }
}

fn require_positive(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be a finite value > 0, got {value}"),
        ))
    }
}

fn require_non_negative(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            field,
            format!("must be a finite value >= 0, got {value}"),
        ))
    }
}

impl SimulationConfig {
    /// Load from `path` (or defaults when `None`), apply `STREAMGATE_*`
    /// overrides and validate.
    pub fn load(path: Option<&str>) -> KernelResult<Self> {
        let config: Self = match path {
            Some(path) => super::load_with_env(path, ENV_PREFIX)
                .map_err(|e| Report::new(KernelError::from(e)))
                .attach(format!("loading simulation config from {path}"))?,
            None => super::defaults_with_env(&Self::default(), ENV_PREFIX)
                .map_err(|e| Report::new(KernelError::from(e)))
                .attach("applying environment overrides to defaults")?,
        };

        config
            .validate()
            .map_err(|e| Report::new(KernelError::from(e)))
            .attach("validating simulation config")?;

        tracing::debug!(
            num_clients = config.num_clients,
            max_clients = config.max_clients(),
            worker_limit = config.worker_limit(),
            "simulation config loaded"
        );
        Ok(config)
    }

    pub fn with_num_clients(mut self, num_clients: usize) -> Self {
        self.num_clients = num_clients;
        self
    }

    pub fn with_worker_limit(mut self, limit: usize) -> Self {
        self.worker_concurrency_limit = Some(limit);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    pub fn with_latency_range(mut self, min: f64, max: f64) -> Self {
        self.network_latency_range_sec = LatencyRange::new(min, max);
        self
    }

    /// Check every value before a run starts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        require_positive("per_client_bitrate_mbps", self.per_client_bitrate_mbps)?;
        require_positive("bandwidth_capacity_mbps", self.bandwidth_capacity_mbps)?;
        if self.cpu_cores == 0 {
            return Err(ConfigError::invalid("cpu_cores", "must be > 0"));
        }
        require_positive("cpu_speed_ghz", self.cpu_speed_ghz)?;
        require_positive("memory_capacity_gb", self.memory_capacity_gb)?;
        require_positive("storage_capacity_mbps", self.storage_capacity_mbps)?;
        require_non_negative("processing_delay_base_sec", self.processing_delay_base_sec)?;

        let range = self.network_latency_range_sec;
        if !range.is_well_formed() {
            return Err(ConfigError::invalid(
                "network_latency_range_sec",
                format!(
                    "expected 0 <= min <= max, got [{}, {}]",
                    range.min, range.max
                ),
            ));
        }

        if self.worker_concurrency_limit == Some(0) {
            return Err(ConfigError::invalid("worker_concurrency_limit", "must be > 0"));
        }

        require_positive("cpu_fraction_per_client", self.cpu_fraction_per_client)?;
        if self.cpu_fraction_per_client > 1.0 {
            return Err(ConfigError::invalid(
                "cpu_fraction_per_client",
                format!("must be <= 1, got {}", self.cpu_fraction_per_client),
            ));
        }
        require_positive("memory_per_client_gb", self.memory_per_client_gb)?;
        require_non_negative("time_scale", self.time_scale)?;

        Ok(())
    }

    /// `floor(bandwidth / per-client bitrate)`.
    pub fn max_clients(&self) -> usize {
        let ratio = self.bandwidth_capacity_mbps / self.per_client_bitrate_mbps;
        if ratio.is_finite() && ratio > 0.0 {
            ratio.floor() as usize
        } else {
            0
        }
    }

    /// Configured worker limit, or the client limit (at least 1).
    pub fn worker_limit(&self) -> usize {
        self.worker_concurrency_limit
            .unwrap_or_else(|| self.max_clients())
            .max(1)
    }

    /// `cores × speed`, in GHz.
    pub fn cpu_capacity_ghz(&self) -> f64 {
        f64::from(self.cpu_cores) * self.cpu_speed_ghz
    }

    /// Pool capacities in micro-units.
    pub fn capacity(&self) -> ResourceVector {
        ResourceVector::from_units(
            self.cpu_capacity_ghz(),
            self.memory_capacity_gb,
            self.storage_capacity_mbps,
        )
    }

    /// CPU one client needs, in GHz.
    pub fn cpu_per_client_ghz(&self) -> f64 {
        self.cpu_fraction_per_client * self.cpu_speed_ghz
    }

    /// Demand of a client streaming at `bitrate_mbps`, in micro-units.
    pub fn demand_for(&self, bitrate_mbps: f64) -> ResourceVector {
        ResourceVector::client_demand(
            self.cpu_per_client_ghz(),
            self.memory_per_client_gb,
            bitrate_mbps,
        )
    }
}
