//! Running counters of a simulation.

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Bytes held by dirty lines still resident in the cache.
    pub dirty_bytes: u64,
    /// Bytes written back because a dirty line was evicted.
    pub dirty_evictions: u64,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.accesses();
        if total == 0 {
            return 1.0;
        }
        self.hits as f64 / total as f64
    }

    pub fn miss_rate(&self) -> f64 {
        let total = self.accesses();
        if total == 0 {
            return 0.0;
        }
        self.misses as f64 / total as f64
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits:{} misses:{} evictions:{} dirty_bytes_in_cache:{} dirty_bytes_evicted:{}",
            self.hits, self.misses, self.evictions, self.dirty_bytes, self.dirty_evictions
        )
    }
}
