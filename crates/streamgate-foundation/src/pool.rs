//! Resource pool ledger.
//!
//! [`ResourcePool`] owns the capacities and the live usage counters of the
//! server. All reads and writes of the counters happen under a single
//! `parking_lot::Mutex`, one critical section per operation:
//!
//! - [`try_reserve`](ResourcePool::try_reserve) evaluates the admission
//!   policy against a snapshot and commits in the same critical section, so
//!   two callers can never both observe room and both commit.
//! - [`release`](ResourcePool::release) returns the amounts the pool
//!   recorded when it committed the [`Reservation`] and retires its id.
//!   Reservations carry the identity of the pool that issued them; a pool
//!   ignores tokens issued by any other pool.
//!
//! The lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn};

use streamgate_kernel::admission::{
    AdmissionPolicy, PoolSnapshot, RejectionReason, ResourceVector,
};
use streamgate_kernel::config::SimulationConfig;

/// Fixed limits of a pool. Never changes during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolCapacity {
    /// CPU, memory and storage capacity, in micro-units.
    pub resources: ResourceVector,
    /// Bandwidth-derived client cap.
    pub max_clients: usize,
}

impl PoolCapacity {
    pub fn new(resources: ResourceVector, max_clients: usize) -> Self {
        Self {
            resources,
            max_clients,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.capacity(), config.max_clients())
    }
}

/// Source of process-unique pool identities.
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(0);

/// Proof of a committed reservation.
///
/// Carries the exact amounts reserved; only the pool can create one, and
/// releasing consumes it.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a reservation holds pool capacity until it is released"]
pub struct Reservation {
    pool: u64,
    id: u64,
    amounts: ResourceVector,
}

impl Reservation {
    /// Pool-unique identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Amounts committed for this reservation.
    pub fn amounts(&self) -> &ResourceVector {
        &self.amounts
    }
}

/// Mutable state behind the pool lock.
#[derive(Debug, Default)]
struct Ledger {
    used: ResourceVector,
    active_clients: usize,
    peak_used: ResourceVector,
    peak_active_clients: usize,
    /// Live reservation ids and the amounts committed for each.
    live: HashMap<u64, ResourceVector>,
    next_id: u64,
}

impl Ledger {
    fn snapshot(&self, capacity: &PoolCapacity) -> PoolSnapshot {
        PoolSnapshot {
            capacity: capacity.resources,
            used: self.used,
            active_clients: self.active_clients,
            max_clients: capacity.max_clients,
            peak_used: self.peak_used,
            peak_active_clients: self.peak_active_clients,
        }
    }
}

/// Synchronized ledger of capacities and current usage.
#[derive(Debug)]
pub struct ResourcePool {
    id: u64,
    capacity: PoolCapacity,
    ledger: Mutex<Ledger>,
}

impl ResourcePool {
    pub fn new(capacity: PoolCapacity) -> Self {
        Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            capacity,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(PoolCapacity::from_config(config))
    }

    pub fn capacity(&self) -> &PoolCapacity {
        &self.capacity
    }

    /// Consistent view of the counters.
    pub fn snapshot(&self) -> PoolSnapshot {
        self.ledger.lock().snapshot(&self.capacity)
    }

    /// Number of reservations not yet released.
    pub fn live_reservations(&self) -> usize {
        self.ledger.lock().live.len()
    }

    /// Evaluate `policy` and, if it admits, commit `demand`.
    ///
    /// Rejection is immediate; there is no waiting variant. Whatever the
    /// policy decides, the pool never commits past its capacity or client
    /// cap.
    pub fn try_reserve<P>(
        &self,
        demand: ResourceVector,
        policy: &P,
    ) -> Result<Reservation, RejectionReason>
    where
        P: AdmissionPolicy + ?Sized,
    {
        let mut ledger = self.ledger.lock();
        let snapshot = ledger.snapshot(&self.capacity);

        policy.evaluate(&snapshot, &demand)?;

        if snapshot.active_clients >= self.capacity.max_clients {
            return Err(RejectionReason::ClientLimitExceeded {
                active: snapshot.active_clients,
                max: self.capacity.max_clients,
            });
        }
        let exhausted = snapshot.exhausted_by(&demand);
        if !exhausted.is_empty() {
            return Err(RejectionReason::ResourceExhausted {
                resources: exhausted,
            });
        }

        // exhausted_by already ruled out overflow
        let Some(used) = ledger.used.checked_add(&demand) else {
            return Err(RejectionReason::ResourceExhausted {
                resources: demand.exceeding(&snapshot.headroom()),
            });
        };

        let id = ledger.next_id;
        ledger.next_id += 1;
        ledger.used = used;
        ledger.active_clients += 1;
        ledger.peak_used = ledger.peak_used.max(&used);
        ledger.peak_active_clients = ledger.peak_active_clients.max(ledger.active_clients);
        ledger.live.insert(id, demand);

        debug!(
            reservation = id,
            active_clients = ledger.active_clients,
            cpu_used = ledger.used.cpu,
            "reservation committed"
        );

        Ok(Reservation {
            pool: self.id,
            id,
            amounts: demand,
        })
    }

    /// Return a reservation's amounts to the pool.
    ///
    /// Subtracts the amounts recorded at commit time. Returns `false`,
    /// leaving the counters untouched, if the reservation was issued by
    /// another pool or is no longer live.
    pub fn release(&self, reservation: Reservation) -> bool {
        if reservation.pool != self.id {
            warn!(
                reservation = reservation.id,
                issuer = reservation.pool,
                pool = self.id,
                "release of reservation issued by another pool ignored"
            );
            return false;
        }

        let mut ledger = self.ledger.lock();
        let Some(recorded) = ledger.live.remove(&reservation.id) else {
            warn!(
                reservation = reservation.id,
                "release of unknown reservation ignored"
            );
            return false;
        };

        ledger.used = ledger.used.saturating_sub(&recorded);
        ledger.active_clients = ledger.active_clients.saturating_sub(1);

        debug!(
            reservation = reservation.id,
            active_clients = ledger.active_clients,
            "reservation released"
        );
        true
    }
}

// ============================================================================
// ReservationGuard
// ============================================================================

/// Holds a [`Reservation`] and releases it exactly once.
///
/// Release happens on the first call to [`release`](Self::release) or, at
/// the latest, when the guard is dropped; this covers early returns and
/// panics unwinding through the holder.
#[derive(Debug)]
pub struct ReservationGuard {
    pool: Arc<ResourcePool>,
    reservation: Option<Reservation>,
}

impl ReservationGuard {
    pub fn new(pool: Arc<ResourcePool>, reservation: Reservation) -> Self {
        Self {
            pool,
            reservation: Some(reservation),
        }
    }

    /// The held reservation, until released.
    pub fn reservation(&self) -> Option<&Reservation> {
        self.reservation.as_ref()
    }

    /// Amounts held; zero once released.
    pub fn amounts(&self) -> ResourceVector {
        self.reservation
            .as_ref()
            .map(|r| *r.amounts())
            .unwrap_or_default()
    }

    pub fn is_released(&self) -> bool {
        self.reservation.is_none()
    }

    /// Release now. Later calls are no-ops returning `false`.
    pub fn release(&mut self) -> bool {
        match self.reservation.take() {
            Some(reservation) => self.pool.release(reservation),
            None => false,
        }
    }
}

impl Drop for ReservationGuard {
    fn drop(&mut self) {
        self.release();
    }
}
