// Random load balancing strategy implementation
use std::sync::Mutex;

use log::debug;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{Selector, check_pool_size};

pub struct Random {
    // StdRng is not Sync; callers take turns.
    rng: Mutex<StdRng>,
}

impl Random {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for Random {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector for Random {
    fn next(&self, pool_size: usize) -> usize {
        check_pool_size(pool_size);

        // Poisoning leaves the generator state intact.
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let idx = rng.gen_range(0..pool_size);
        debug!("Selected backend index: {}", idx);
        idx
    }

    fn name(&self) -> &'static str {
        "random"
    }
}
