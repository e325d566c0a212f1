use std::io::Cursor;
use std::path::Path;

use cache_sim::trace::TraceReader;
use cache_sim::{AccessOutcome, Cache, Geometry, MemRecord, Statistics};

fn replay(s: u32, b: u32, e: usize, trace: &str) -> Cache {
    let mut cache = Cache::new(Geometry::new(s, b, e).unwrap());
    for record in TraceReader::new(Cursor::new(trace)) {
        cache.access(&record.unwrap());
        cache.verify().unwrap();
    }
    cache
}

fn stats(
    hits: u64,
    misses: u64,
    evictions: u64,
    dirty_bytes: u64,
    dirty_evictions: u64,
) -> Statistics {
    Statistics {
        hits,
        misses,
        evictions,
        dirty_bytes,
        dirty_evictions,
    }
}

#[test]
fn empty_trace() {
    let cache = replay(4, 4, 2, "");
    assert_eq!(*cache.stats(), Statistics::default());
}

#[test]
fn repeated_load_is_one_miss_one_hit() {
    let cache = replay(2, 3, 1, "L 40,8\nL 40,8\n");
    assert_eq!(*cache.stats(), stats(1, 1, 0, 0, 0));
}

#[test]
fn lru_victim_is_first_fill() {
    let mut cache = Cache::new(Geometry::new(0, 0, 2).unwrap());
    cache.access(&MemRecord::load(0, 1));
    cache.access(&MemRecord::load(1, 1));
    assert_eq!(
        cache.access(&MemRecord::load(2, 1)),
        AccessOutcome::MissEviction {
            victim_tag: 0,
            write_back: false
        }
    );
    assert_eq!(*cache.stats(), stats(0, 3, 1, 0, 0));
}

#[test]
fn hit_reorders_victim() {
    let mut cache = Cache::new(Geometry::new(0, 0, 2).unwrap());
    for addr in [0, 1, 0] {
        cache.access(&MemRecord::load(addr, 1));
    }
    assert_eq!(
        cache.access(&MemRecord::load(2, 1)),
        AccessOutcome::MissEviction {
            victim_tag: 1,
            write_back: false
        }
    );
    assert_eq!(*cache.stats(), stats(1, 3, 1, 0, 0));
}

#[test]
fn dirty_write_back() {
    let cache = replay(0, 0, 1, "S 0,1\nL 1,1\n");
    assert_eq!(*cache.stats(), stats(0, 2, 1, 0, 1));
}

#[test]
fn store_after_store() {
    let cache = replay(0, 0, 1, "S 0,1\nS 0,1\n");
    assert_eq!(*cache.stats(), stats(1, 1, 0, 1, 0));
}

#[test]
fn run_folds_records() {
    let mut cache = Cache::new(Geometry::new(0, 2, 1).unwrap());
    let records = vec![
        MemRecord::store(0, 4),
        MemRecord::store(4, 4),
        MemRecord::load(8, 4),
    ];
    assert_eq!(*cache.run(records), stats(0, 3, 2, 0, 8));
}

#[test]
fn conflict_stream_thrashes_direct_mapped() {
    // every address maps to set 0 of a 4-set direct mapped cache
    let trace: String = (0..8)
        .map(|i| format!("L {:x},4\n", (i % 2) * 64))
        .collect();
    let cache = replay(2, 4, 1, &trace);
    assert_eq!(*cache.stats(), stats(0, 8, 7, 0, 0));
}

#[test]
fn bundled_trace() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("traces/mixed.trace");
    let mut cache = Cache::new(Geometry::new(1, 2, 2).unwrap());
    let records = TraceReader::open(path)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let result = *cache.run(records);
    cache.verify().unwrap();
    assert_eq!(result, stats(3, 7, 3, 8, 4));
    assert_eq!(
        result.to_string(),
        "hits:3 misses:7 evictions:3 dirty_bytes_in_cache:8 dirty_bytes_evicted:4"
    );
}

#[test]
fn oversized_geometry_is_rejected_before_allocation() {
    assert!(Geometry::new(60, 0, 1).is_err());
    assert!(Geometry::new(0, 63, 1).is_err());
}
