#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoTreeMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub compute_errors: u64,
    pub insert_races_lost: u64,
    pub unsupported_keys: u64,
    pub peek_calls: u64,
    pub peek_found: u64,

    pub sweeps: u64,
    pub swept_nodes: u64,
    pub swept_leaves: u64,

    // gauges captured at snapshot time
    pub leaves: usize,
    pub nodes: usize,
}

impl MemoTreeMetricsSnapshot {
    /// Fraction of lookups served from cache, `0.0` before any lookup.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BoundedMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub compute_errors: u64,
    pub evicted_entries: u64,

    pub cache_len: usize,
    pub capacity: usize,
}

impl BoundedMetricsSnapshot {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
