use std::fmt;

mod random;
mod round_robin;

pub use random::Random;
pub use round_robin::RoundRobin;

/// Picks the pool position that serves the next connection.
///
/// Implementations are shared by every dispatch task, so `next` takes `&self`
/// and must be safe to call concurrently. `pool_size` is the number of live
/// backends and is never zero once the pool has been bootstrapped; passing
/// zero panics.
pub trait Selector: Send + Sync {
    fn next(&self, pool_size: usize) -> usize;

    fn name(&self) -> &'static str;
}

pub enum LoadBalancing {
    RoundRobin(RoundRobin),
    Random(Random),
}

impl LoadBalancing {
    pub fn from_config(value: &str) -> Result<Self, String> {
        let mode = value.trim().to_lowercase();
        match mode.as_str() {
            "roundrobin" | "round-robin" | "round_robin" | "rr" => {
                Ok(Self::RoundRobin(RoundRobin::new()))
            }
            "random" => Ok(Self::Random(Random::new())),
            _ => Err(format!(
                "unknown algorithm: {value:?} (options: roundrobin, random)"
            )),
        }
    }
}

impl Selector for LoadBalancing {
    fn next(&self, pool_size: usize) -> usize {
        match self {
            LoadBalancing::RoundRobin(rr) => rr.next(pool_size),
            LoadBalancing::Random(rand) => rand.next(pool_size),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            LoadBalancing::RoundRobin(rr) => rr.name(),
            LoadBalancing::Random(rand) => rand.name(),
        }
    }
}

impl fmt::Debug for LoadBalancing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LoadBalancing").field(&self.name()).finish()
    }
}

fn check_pool_size(pool_size: usize) {
    assert!(pool_size > 0, "selection requested from an empty backend pool");
}
