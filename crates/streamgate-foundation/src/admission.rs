//! Admission control for incoming client streams.
//!
//! [`AdmissionController`] turns a [`ClientRequest`] into a per-client demand
//! and asks the pool to reserve it. The decision itself
//! ([`AdmissionPolicy::evaluate`]) runs inside the pool's critical section:
//!
//! 1. the bandwidth-derived client cap is checked first;
//! 2. then every resource is checked for headroom, and all failing resources
//!    are reported together.
//!
//! The decision is a pure function of the snapshot and the demand.

use std::sync::Arc;

use tracing::debug;

use streamgate_kernel::admission::{
    AdmissionPolicy, ClientRequest, PoolSnapshot, RejectionReason, ResourceVector,
};
use streamgate_kernel::config::SimulationConfig;

use crate::pool::{ReservationGuard, ResourcePool};

/// Admits or rejects clients against a shared [`ResourcePool`].
#[derive(Debug, Clone)]
pub struct AdmissionController {
    pool: Arc<ResourcePool>,
    /// CPU each client needs, in GHz.
    cpu_per_client_ghz: f64,
    /// Memory each client needs, in GB.
    memory_per_client_gb: f64,
}

impl AdmissionController {
    pub fn new(pool: Arc<ResourcePool>, cpu_per_client_ghz: f64, memory_per_client_gb: f64) -> Self {
        Self {
            pool,
            cpu_per_client_ghz,
            memory_per_client_gb,
        }
    }

    pub fn from_config(pool: Arc<ResourcePool>, config: &SimulationConfig) -> Self {
        Self::new(pool, config.cpu_per_client_ghz(), config.memory_per_client_gb)
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    /// CPU needed by one client, in GHz.
    pub fn cpu_per_client_ghz(&self) -> f64 {
        self.cpu_per_client_ghz
    }

    /// Demand of `request`, in micro-units.
    pub fn demand_for(&self, request: &ClientRequest) -> ResourceVector {
        ResourceVector::client_demand(
            self.cpu_per_client_ghz,
            self.memory_per_client_gb,
            request.bitrate_mbps,
        )
    }

    /// Reserve resources for `request`, or say why not.
    ///
    /// On success the returned guard holds the reservation and gives it back
    /// when released or dropped. Rejections never modify the pool.
    pub fn try_admit(&self, request: &ClientRequest) -> Result<ReservationGuard, RejectionReason> {
        let demand = self.demand_for(request);
        match self.pool.try_reserve(demand, self) {
            Ok(reservation) => {
                debug!(
                    client_id = request.id,
                    reservation = reservation.id(),
                    "client admitted"
                );
                Ok(ReservationGuard::new(Arc::clone(&self.pool), reservation))
            }
            Err(reason) => {
                debug!(client_id = request.id, %reason, "client rejected");
                Err(reason)
            }
        }
    }
}

impl AdmissionPolicy for AdmissionController {
    fn evaluate(
        &self,
        snapshot: &PoolSnapshot,
        demand: &ResourceVector,
    ) -> Result<(), RejectionReason> {
        if snapshot.active_clients >= snapshot.max_clients {
            return Err(RejectionReason::ClientLimitExceeded {
                active: snapshot.active_clients,
                max: snapshot.max_clients,
            });
        }

        let resources = snapshot.exhausted_by(demand);
        if resources.is_empty() {
            Ok(())
        } else {
            Err(RejectionReason::ResourceExhausted { resources })
        }
    }
}
