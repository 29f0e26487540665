use crate::metrics::cell::MetricsCell;
use crate::metrics::traits::{
    BoundedMetricsRecorder, CoreMetricsRecorder, MemoTreeMetricsReadRecorder,
    MemoTreeMetricsRecorder,
};

#[derive(Debug, Default)]
pub struct MemoTreeMetrics {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub compute_errors: u64,
    pub insert_races_lost: u64,
    pub unsupported_keys: u64,
    pub sweeps: u64,
    pub swept_nodes: u64,
    pub swept_leaves: u64,
    pub peek_calls: MetricsCell,
    pub peek_found: MetricsCell,
}

impl CoreMetricsRecorder for MemoTreeMetrics {
    fn record_hit(&mut self) {
        self.hits += 1;
    }

    fn record_miss(&mut self) {
        self.misses += 1;
    }

    fn record_insert(&mut self) {
        self.inserts += 1;
    }

    fn record_compute_error(&mut self) {
        self.compute_errors += 1;
    }

    fn record_clear(&mut self) {
        // counters survive a clear; gauges are read live
    }
}

impl MemoTreeMetricsRecorder for MemoTreeMetrics {
    fn record_insert_race_lost(&mut self) {
        self.insert_races_lost += 1;
    }

    fn record_unsupported_key(&mut self) {
        self.unsupported_keys += 1;
    }

    fn record_sweep(&mut self, nodes_removed: usize, leaves_removed: usize) {
        self.sweeps += 1;
        self.swept_nodes += nodes_removed as u64;
        self.swept_leaves += leaves_removed as u64;
    }
}

impl MemoTreeMetricsReadRecorder for &MemoTreeMetrics {
    fn record_peek_call(&self) {
        self.peek_calls.incr();
    }

    fn record_peek_found(&self) {
        self.peek_found.incr();
    }
}

impl MemoTreeMetrics {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default)]
pub struct BoundedMetrics {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub compute_errors: u64,
    pub evicted_entries: u64,
}

impl CoreMetricsRecorder for BoundedMetrics {
    fn record_hit(&mut self) {
        self.hits += 1;
    }

    fn record_miss(&mut self) {
        self.misses += 1;
    }

    fn record_insert(&mut self) {
        self.inserts += 1;
    }

    fn record_compute_error(&mut self) {
        self.compute_errors += 1;
    }

    fn record_clear(&mut self) {}
}

impl BoundedMetricsRecorder for BoundedMetrics {
    fn record_evicted_entry(&mut self) {
        self.evicted_entries += 1;
    }
}

impl BoundedMetrics {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_sweep_accumulates() {
        let mut metrics = MemoTreeMetrics::default();
        metrics.record_sweep(3, 1);
        metrics.record_sweep(2, 2);
        assert_eq!(metrics.sweeps, 2);
        assert_eq!(metrics.swept_nodes, 5);
        assert_eq!(metrics.swept_leaves, 3);
    }

    #[test]
    fn read_recorder_counts_through_shared_ref() {
        let metrics = MemoTreeMetrics::default();
        (&metrics).record_peek_call();
        (&metrics).record_peek_found();
        assert_eq!(metrics.peek_calls.get(), 1);
        assert_eq!(metrics.peek_found.get(), 1);
    }

    #[test]
    fn reset_zeroes_counters() {
        let mut metrics = BoundedMetrics::default();
        metrics.record_hit();
        metrics.record_evicted_entry();
        metrics.reset();
        assert_eq!(metrics.hits, 0);
        assert_eq!(metrics.evicted_entries, 0);
    }
}
