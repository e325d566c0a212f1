use crate::geometry::Geometry;
use crate::memory_access::MemRecord;
use crate::recency::RecencyTracker;
use crate::stats::Statistics;
use crate::store::CacheStore;
use std::error::Error;
use std::fmt;

/// What a single access did to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit,
    /// Filled an empty way.
    Miss,
    /// Replaced the least recently used line of a full set.
    MissEviction { victim_tag: u64, write_back: bool },
}

impl fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessOutcome::Hit => write!(f, "hit"),
            AccessOutcome::Miss => write!(f, "miss"),
            AccessOutcome::MissEviction { write_back, .. } if *write_back => {
                write!(f, "miss eviction (dirty)")
            }
            AccessOutcome::MissEviction { .. } => write!(f, "miss eviction"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    RecencyMismatch { set: usize },
    DuplicateTag { set: usize, tag: u64 },
    DirtyBytesMismatch { counted: u64, resident: u64 },
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyError::RecencyMismatch { set } => {
                write!(f, "set {}: recency order disagrees with occupied ways", set)
            }
            ConsistencyError::DuplicateTag { set, tag } => {
                write!(f, "set {}: tag {:#x} resident more than once", set, tag)
            }
            ConsistencyError::DirtyBytesMismatch { counted, resident } => write!(
                f,
                "dirty_bytes is {} but resident dirty lines hold {} bytes",
                counted, resident
            ),
        }
    }
}

impl Error for ConsistencyError {}

/// A write-back, write-allocate, LRU set-associative cache.
#[derive(Debug)]
pub struct Cache {
    geometry: Geometry,
    store: CacheStore,
    recency: RecencyTracker,
    stats: Statistics,
}

impl Cache {
    pub fn new(geometry: Geometry) -> Self {
        let num_sets = geometry.num_sets();
        let ways = geometry.associativity();
        Cache {
            geometry,
            store: CacheStore::new(num_sets, ways),
            recency: RecencyTracker::new(num_sets, ways),
            stats: Statistics::new(),
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Ways of `set` from most to least recently used.
    pub fn recency_order(&self, set: usize) -> Vec<usize> {
        self.recency.iter(set).collect()
    }

    /// Replays every record in order and returns the final counters.
    pub fn run<I>(&mut self, records: I) -> &Statistics
    where
        I: IntoIterator<Item = MemRecord>,
    {
        for record in records {
            self.access(&record);
        }
        &self.stats
    }

    /// Simulate one access and update the counters.
    pub fn access(&mut self, record: &MemRecord) -> AccessOutcome {
        let (set, tag) = self.geometry.decode(record.address);
        let outcome = if let Some(way) = self.store.lookup(set, tag) {
            self.hit(set, way, record.is_store())
        } else if let Some(way) = self.store.first_empty_way(set) {
            self.fill(set, way, tag, record.is_store())
        } else {
            self.evict_and_fill(set, tag, record.is_store())
        };

        tracing::debug!(
            size = record.size,
            set,
            "{} {:#x}: {}, tag {:#x}",
            record.kind,
            record.address,
            outcome,
            tag
        );
        outcome
    }

    fn hit(&mut self, set: usize, way: usize, is_store: bool) -> AccessOutcome {
        self.stats.hits += 1;
        self.recency.mark_most_recent(set, way);
        if is_store && !self.store.is_dirty(set, way) {
            self.store.set_dirty(set, way, true);
            self.stats.dirty_bytes += self.geometry.block_size();
        }
        AccessOutcome::Hit
    }

    fn fill(&mut self, set: usize, way: usize, tag: u64, dirty: bool) -> AccessOutcome {
        self.stats.misses += 1;
        self.recency.insert_most_recent(set, way);
        self.store.install(set, way, tag, dirty);
        if dirty {
            self.stats.dirty_bytes += self.geometry.block_size();
        }
        AccessOutcome::Miss
    }

    fn evict_and_fill(&mut self, set: usize, tag: u64, dirty: bool) -> AccessOutcome {
        let block_size = self.geometry.block_size();
        self.stats.misses += 1;
        self.stats.evictions += 1;

        let way = self.recency.evict_least_recent(set);
        let victim_tag = match self.store.tag(set, way) {
            Some(victim_tag) => victim_tag,
            None => panic!("set {} evicted empty way {}", set, way),
        };
        let was_dirty = self.store.is_dirty(set, way);

        if was_dirty {
            self.stats.dirty_evictions += block_size;
        }
        match (was_dirty, dirty) {
            (true, false) => self.stats.dirty_bytes -= block_size,
            (false, true) => self.stats.dirty_bytes += block_size,
            _ => {}
        }

        self.store.install(set, way, tag, dirty);
        self.recency.insert_most_recent(set, way);
        AccessOutcome::MissEviction {
            victim_tag,
            write_back: was_dirty,
        }
    }

    /// Checks the bookkeeping the statistics depend on.
    pub fn verify(&self) -> Result<(), ConsistencyError> {
        for set in 0..self.geometry.num_sets() {
            let lines = self.store.set(set);

            let mut occupied: Vec<usize> = lines
                .iter()
                .enumerate()
                .filter(|(_, line)| line.tag.is_some())
                .map(|(way, _)| way)
                .collect();
            let mut tracked = self.recency_order(set);
            tracked.sort_unstable();
            if tracked.len() != self.recency.len(set) || tracked != occupied {
                return Err(ConsistencyError::RecencyMismatch { set });
            }

            occupied.sort_unstable_by_key(|&way| lines[way].tag);
            for pair in occupied.windows(2) {
                if lines[pair[0]].tag == lines[pair[1]].tag {
                    let tag = lines[pair[0]].tag.unwrap_or_default();
                    return Err(ConsistencyError::DuplicateTag { set, tag });
                }
            }
        }

        let resident = self.store.dirty_lines() as u64 * self.geometry.block_size();
        if resident != self.stats.dirty_bytes {
            return Err(ConsistencyError::DirtyBytesMismatch {
                counted: self.stats.dirty_bytes,
                resident,
            });
        }
        Ok(())
    }
}
