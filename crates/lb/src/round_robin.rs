use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{Selector, check_pool_size};

/// Sequential rotation over the pool.
///
/// Every call claims a distinct counter value, so interleaved callers still
/// walk the indices in strict order modulo the pool size.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl Selector for RoundRobin {
    fn next(&self, pool_size: usize) -> usize {
        check_pool_size(pool_size);
        self.counter.fetch_add(1, Ordering::Relaxed) % pool_size
    }

    fn name(&self) -> &'static str {
        "roundrobin"
    }
}
