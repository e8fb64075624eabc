//! streamgate foundation
//!
//! Concrete admission engine: the [`ResourcePool`] ledger, the
//! [`AdmissionController`] policy, [`ClientSession`] lifecycles and the
//! [`Orchestrator`] that runs them under a worker limit.

// pool module - capacity ledger with atomic reserve/release
pub mod pool;
pub use pool::{PoolCapacity, Reservation, ReservationGuard, ResourcePool};

// admission module
pub mod admission;
pub use admission::AdmissionController;

// latency module
pub mod latency;
pub use latency::UniformLatency;

// session module - one client's admit/serve/release lifecycle
pub mod session;
pub use session::{ClientSession, SessionContext, TokioDelay};

// report module - run reports and outcome sinks
pub mod report;
pub use report::{ChannelSink, CollectingSink, SimulationEvent, SimulationReport, TracingSink};

// orchestrator module
pub mod orchestrator;
pub use orchestrator::Orchestrator;
