use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::{BoundedMetricsSnapshot, MemoTreeMetricsSnapshot};
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for memo cache snapshots.
///
/// Writes the Prometheus text exposition format so the output can be
/// scraped directly or forwarded to an OpenTelemetry collector. Write
/// failures are dropped: metrics never affect cache behavior.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_metric(&self, kind: &str, suffix: &str, value: u64) {
        let name = self.metric_name(suffix);
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn counter(&self, suffix: &str, value: u64) {
        self.write_metric("counter", suffix, value);
    }

    fn gauge(&self, suffix: &str, value: usize) {
        self.write_metric("gauge", suffix, value as u64);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<MemoTreeMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &MemoTreeMetricsSnapshot) {
        self.counter("hits_total", snapshot.hits);
        self.counter("misses_total", snapshot.misses);
        self.counter("inserts_total", snapshot.inserts);
        self.counter("compute_errors_total", snapshot.compute_errors);
        self.counter("insert_races_lost_total", snapshot.insert_races_lost);
        self.counter("unsupported_keys_total", snapshot.unsupported_keys);
        self.counter("peek_calls_total", snapshot.peek_calls);
        self.counter("peek_found_total", snapshot.peek_found);
        self.counter("sweeps_total", snapshot.sweeps);
        self.counter("swept_nodes_total", snapshot.swept_nodes);
        self.counter("swept_leaves_total", snapshot.swept_leaves);
        self.gauge("leaves", snapshot.leaves);
        self.gauge("nodes", snapshot.nodes);
    }
}

impl<W: Write + Send> MetricsExporter<BoundedMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &BoundedMetricsSnapshot) {
        self.counter("hits_total", snapshot.hits);
        self.counter("misses_total", snapshot.misses);
        self.counter("inserts_total", snapshot.inserts);
        self.counter("compute_errors_total", snapshot.compute_errors);
        self.counter("evicted_entries_total", snapshot.evicted_entries);
        self.gauge("cache_len", snapshot.cache_len);
        self.gauge("capacity", snapshot.capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exports_prefixed_counters_and_gauges() {
        let exporter = PrometheusTextExporter::new("selectors", Vec::new());
        let snapshot = BoundedMetricsSnapshot {
            hits: 3,
            evicted_entries: 1,
            cache_len: 2,
            capacity: 2,
            ..Default::default()
        };
        exporter.export(&snapshot);
        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.contains("# TYPE selectors_hits_total counter\nselectors_hits_total 3\n"));
        assert!(text.contains("selectors_evicted_entries_total 1"));
        assert!(text.contains("# TYPE selectors_capacity gauge"));
    }

    #[test]
    fn empty_prefix_uses_bare_names() {
        let exporter = PrometheusTextExporter::new("", Vec::new());
        exporter.export(&MemoTreeMetricsSnapshot::default());
        let text = String::from_utf8(exporter.into_inner()).unwrap();
        assert!(text.contains("\nhits_total 0\n") || text.starts_with("# TYPE hits_total"));
        assert!(text.contains("nodes 0"));
    }
}
