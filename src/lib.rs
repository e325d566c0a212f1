//! Trace-driven simulator of a write-back, write-allocate, LRU set-associative cache.

pub mod cache;
pub mod geometry;
pub mod memory_access;
pub mod recency;
pub mod stats;
pub mod store;
pub mod trace;

pub use cache::{AccessOutcome, Cache};
pub use geometry::Geometry;
pub use memory_access::{AccessKind, MemRecord};
pub use stats::Statistics;
