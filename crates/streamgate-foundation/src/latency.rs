//! Network latency sampling.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use streamgate_kernel::session::{LatencyRange, LatencySource};

/// Draws latencies uniformly from `[min, max]`.
///
/// With a seed, the sequence of draws is reproducible. Under concurrency the
/// order in which sessions take draws still depends on scheduling, so only
/// single-worker runs repeat exactly.
#[derive(Debug)]
pub struct UniformLatency {
    rng: Mutex<StdRng>,
}

impl UniformLatency {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seeded when `seed` is set, entropy otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::with_seed)
    }
}

impl Default for UniformLatency {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl LatencySource for UniformLatency {
    fn sample(&self, range: LatencyRange) -> f64 {
        // gen_range panics on empty or non-finite ranges
        if !range.is_well_formed() || range.max == range.min {
            return range.min;
        }
        self.rng.lock().gen_range(range.min..=range.max)
    }
}
