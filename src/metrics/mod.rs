//! Optional counters for memoization caches (feature `metrics`).
//!
//! Recording, snapshotting and exporting are split into separate traits (see
//! [`traits`]) so cache code only ever writes counters.

pub mod cell;
pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;
