//! Admission contract: demands, rejection reasons, pool snapshots and the
//! policy trait.
//!
//! # Architecture
//!
//! - **Types and the [`AdmissionPolicy`] trait** live here in `streamgate-kernel`.
//! - **The ledger** (`ResourcePool`) and **the policy implementation**
//!   (`AdmissionController`) live in `streamgate-foundation`.
//!
//! The pool evaluates a policy against a [`PoolSnapshot`] while holding its
//! lock, so a policy only ever sees a consistent view of the counters.
//!
//! # Units
//!
//! Resource amounts are stored as integer micro-units (1e-6 of the configured
//! unit: GHz, GB, MB/s). Reserve and release are then exact inverses and the
//! counters return to zero after a run without floating-point residue.

use serde::{Deserialize, Serialize};

/// Number of micro-units in one configured unit.
pub const MICROS_PER_UNIT: f64 = 1_000_000.0;

/// Convert a configured quantity into micro-units.
///
/// Negative, NaN and infinite inputs map to zero; configuration validation
/// rejects them before they can reach the pool.
pub fn to_micros(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        (value * MICROS_PER_UNIT).round() as u64
    } else {
        0
    }
}

/// Convert micro-units back into the configured unit.
pub fn from_micros(units: u64) -> f64 {
    units as f64 / MICROS_PER_UNIT
}

// ---------------------------------------------------------------------------
// ResourceKind
// ---------------------------------------------------------------------------

/// A resource tracked by the pool ledger.
///
/// Bandwidth is not listed: it is enforced through the client limit rather
/// than a usage counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// CPU cycles, in GHz.
    Cpu,
    /// RAM, in GB.
    Memory,
    /// Storage throughput, in MB/s.
    Storage,
}

impl ResourceKind {
    /// Every tracked resource, in evaluation order.
    pub const ALL: [ResourceKind; 3] = [Self::Cpu, Self::Memory, Self::Storage];

    /// Unit label used in human-readable output.
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Cpu => "GHz",
            Self::Memory => "GB",
            Self::Storage => "MB/s",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Memory => write!(f, "memory"),
            Self::Storage => write!(f, "storage"),
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceVector
// ---------------------------------------------------------------------------

/// Per-resource amounts in micro-units. Used for capacities, usage and demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceVector {
    pub cpu: u64,
    pub memory: u64,
    pub storage: u64,
}

impl ResourceVector {
    /// Build a vector from amounts in configured units (GHz, GB, MB/s).
    pub fn from_units(cpu_ghz: f64, memory_gb: f64, storage_mbps: f64) -> Self {
        Self {
            cpu: to_micros(cpu_ghz),
            memory: to_micros(memory_gb),
            storage: to_micros(storage_mbps),
        }
    }

    /// Per-client demand for a stream at `bitrate_mbps`.
    ///
    /// Storage throughput is the bitrate converted from Mbps to MB/s.
    pub fn client_demand(cpu_ghz: f64, memory_gb: f64, bitrate_mbps: f64) -> Self {
        Self::from_units(cpu_ghz, memory_gb, bitrate_mbps / 8.0)
    }

    /// Amount of a single resource.
    pub fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Cpu => self.cpu,
            ResourceKind::Memory => self.memory,
            ResourceKind::Storage => self.storage,
        }
    }

    /// Amount of a single resource in configured units.
    pub fn get_units(&self, kind: ResourceKind) -> f64 {
        from_micros(self.get(kind))
    }

    /// Component-wise sum, or `None` on overflow.
    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        Some(Self {
            cpu: self.cpu.checked_add(other.cpu)?,
            memory: self.memory.checked_add(other.memory)?,
            storage: self.storage.checked_add(other.storage)?,
        })
    }

    /// Component-wise difference clamped at zero.
    pub fn saturating_sub(&self, other: &Self) -> Self {
        Self {
            cpu: self.cpu.saturating_sub(other.cpu),
            memory: self.memory.saturating_sub(other.memory),
            storage: self.storage.saturating_sub(other.storage),
        }
    }

    /// Component-wise maximum.
    pub fn max(&self, other: &Self) -> Self {
        Self {
            cpu: self.cpu.max(other.cpu),
            memory: self.memory.max(other.memory),
            storage: self.storage.max(other.storage),
        }
    }

    /// Resources for which `self` is larger than `limit`.
    pub fn exceeding(&self, limit: &Self) -> Vec<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind) > limit.get(*kind))
            .collect()
    }

    /// Whether every component is zero.
    pub fn is_zero(&self) -> bool {
        self.cpu == 0 && self.memory == 0 && self.storage == 0
    }
}

// ---------------------------------------------------------------------------
// ClientRequest
// ---------------------------------------------------------------------------

/// One client asking to open a stream. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClientRequest {
    /// Client identifier, `1..=num_clients`.
    pub id: u64,
    /// Bitrate the client will stream at, in Mbps.
    pub bitrate_mbps: f64,
}

impl ClientRequest {
    pub fn new(id: u64, bitrate_mbps: f64) -> Self {
        Self { id, bitrate_mbps }
    }
}

// ---------------------------------------------------------------------------
// RejectionReason
// ---------------------------------------------------------------------------

/// Why a client was not admitted.
///
/// Rejections are expected outcomes, returned as data. They are terminal
/// for the client: there is no retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum RejectionReason {
    /// The bandwidth-derived client cap was already reached.
    ClientLimitExceeded {
        /// Active clients when the request was evaluated.
        active: usize,
        /// `floor(bandwidth / per-client bitrate)`.
        max: usize,
    },
    /// One or more resources lacked headroom for the per-client demand.
    ResourceExhausted {
        /// Every resource that failed, in [`ResourceKind::ALL`] order.
        resources: Vec<ResourceKind>,
    },
}

impl RejectionReason {
    /// Whether the rejection came from the client cap.
    pub fn is_client_limit(&self) -> bool {
        matches!(self, Self::ClientLimitExceeded { .. })
    }

    /// Whether the rejection came from resource headroom.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self, Self::ResourceExhausted { .. })
    }

    /// Whether `kind` is among the exhausted resources.
    pub fn exhausted(&self, kind: ResourceKind) -> bool {
        match self {
            Self::ResourceExhausted { resources } => resources.contains(&kind),
            Self::ClientLimitExceeded { .. } => false,
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClientLimitExceeded { active, max } => {
                write!(f, "client limit reached ({active}/{max} active)")
            }
            Self::ResourceExhausted { resources } => {
                let names: Vec<String> = resources.iter().map(ToString::to_string).collect();
                write!(f, "insufficient {} headroom", names.join(", "))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PoolSnapshot
// ---------------------------------------------------------------------------

/// A consistent read of the pool ledger, taken under the pool lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Total capacity per resource.
    pub capacity: ResourceVector,
    /// Amount currently reserved per resource.
    pub used: ResourceVector,
    /// Clients currently holding a reservation.
    pub active_clients: usize,
    /// Bandwidth-derived client cap.
    pub max_clients: usize,
    /// Highest usage observed per resource since the pool was created.
    pub peak_used: ResourceVector,
    /// Highest concurrent client count observed since the pool was created.
    pub peak_active_clients: usize,
}

impl PoolSnapshot {
    /// Remaining capacity per resource.
    pub fn headroom(&self) -> ResourceVector {
        self.capacity.saturating_sub(&self.used)
    }

    /// Resources that could not absorb `demand` on top of current usage.
    pub fn exhausted_by(&self, demand: &ResourceVector) -> Vec<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| {
                self.used
                    .get(*kind)
                    .checked_add(demand.get(*kind))
                    .is_none_or(|total| total > self.capacity.get(*kind))
            })
            .collect()
    }

    /// Whether usage and peaks never went past capacity.
    pub fn within_capacity(&self) -> bool {
        self.used.exceeding(&self.capacity).is_empty()
            && self.peak_used.exceeding(&self.capacity).is_empty()
            && self.active_clients <= self.max_clients
            && self.peak_active_clients <= self.max_clients
    }

    /// Whether nothing is reserved.
    pub fn is_idle(&self) -> bool {
        self.used.is_zero() && self.active_clients == 0
    }
}

// ---------------------------------------------------------------------------
// AdmissionPolicy
// ---------------------------------------------------------------------------

/// Decides whether a demand may be committed against a pool snapshot.
///
/// Implementations must be pure: the same snapshot and demand always yield
/// the same decision. The pool calls `evaluate` inside its critical section
/// and commits only on `Ok(())`.
pub trait AdmissionPolicy: Send + Sync {
    /// Evaluate `demand` against `snapshot`.
    fn evaluate(&self, snapshot: &PoolSnapshot, demand: &ResourceVector)
    -> Result<(), RejectionReason>;
}
