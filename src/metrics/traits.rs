//! # Metrics Trait Hierarchy
//!
//! ```text
//!                  ┌─────────────────────────────┐
//!                  │     CoreMetricsRecorder     │
//!                  │  hit/miss/insert/clear      │
//!                  └──────────────┬──────────────┘
//!                                 │
//!                ┌────────────────┴────────────────┐
//!                ▼                                 ▼
//!   ┌──────────────────────────┐     ┌──────────────────────────┐
//!   │ MemoTreeMetricsRecorder  │     │ BoundedMetricsRecorder   │
//!   │ race lost, bad key,      │     │ evictions, compute       │
//!   │ sweeps                   │     │ errors                   │
//!   └──────────────────────────┘     └──────────────────────────┘
//!
//!   Consumption (decoupled from recording):
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │    │ MetricsExporter<S>           │
//!   │ (bench/test)                 │    │ (production monitoring)      │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! Recorders only write counters; providers only read/snapshot; exporters
//! only publish.

/// Counters shared by every memo cache.
pub trait CoreMetricsRecorder {
    fn record_hit(&mut self);
    fn record_miss(&mut self);
    fn record_insert(&mut self);
    fn record_compute_error(&mut self);
    fn record_clear(&mut self);
}

/// Identity tree counters.
pub trait MemoTreeMetricsRecorder: CoreMetricsRecorder {
    /// Another writer filled the slot between lookup and insert.
    fn record_insert_race_lost(&mut self);
    fn record_unsupported_key(&mut self);
    fn record_sweep(&mut self, nodes_removed: usize, leaves_removed: usize);
}

/// Identity tree counters for `&self` lookups.
pub trait MemoTreeMetricsReadRecorder {
    fn record_peek_call(&self);
    fn record_peek_found(&self);
}

/// Bounded value cache counters.
pub trait BoundedMetricsRecorder: CoreMetricsRecorder {
    fn record_evicted_entry(&mut self);
}

/// Snapshot provider for bench/testing.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset metrics between tests or benchmark iterations.
pub trait MetricsReset {
    fn reset_metrics(&mut self);
}

/// Export/publish metrics to production monitoring backends.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
