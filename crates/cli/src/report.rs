//! Run report printed at the end of `batchwriter run`.

use std::time::Duration;

use batch_writer::MetricsSnapshot;
use observability::{RunningStats, StatsSummary};
use serde::Serialize;

/// Outcome of a load run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub writer: String,
    pub producers: usize,
    /// Records producers attempted to enqueue
    pub records_sent: u64,
    pub elapsed_secs: f64,
    pub enqueue_latency_us: LatencySummary,
    pub metrics: MetricsSnapshot,
}

/// Serializable copy of a latency StatsSummary
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for LatencySummary {
    fn from(stats: &RunningStats) -> Self {
        let summary = StatsSummary::from(stats);
        Self {
            count: summary.count,
            min: summary.min,
            max: summary.max,
            mean: summary.mean,
            std_dev: summary.std_dev,
        }
    }
}

impl RunReport {
    pub fn new(
        writer: &str,
        producers: usize,
        records_sent: u64,
        elapsed: Duration,
        latency: &RunningStats,
        metrics: MetricsSnapshot,
    ) -> Self {
        Self {
            writer: writer.to_string(),
            producers,
            records_sent,
            elapsed_secs: elapsed.as_secs_f64(),
            enqueue_latency_us: LatencySummary::from(latency),
            metrics,
        }
    }

    /// Processed records per second over the whole run
    pub fn throughput(&self) -> f64 {
        if self.elapsed_secs > 0.0 {
            self.metrics.records_processed as f64 / self.elapsed_secs
        } else {
            0.0
        }
    }

    /// Dropped share of all attempted records, as a percentage
    pub fn drop_rate(&self) -> f64 {
        let total = self.metrics.records_accepted + self.metrics.records_dropped;
        if total > 0 {
            (self.metrics.records_dropped as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print a human readable summary
    pub fn print_summary(&self) {
        println!("\n=== Run Summary: {} ===\n", self.writer);
        println!("  Duration: {:.2}s", self.elapsed_secs);
        println!("  Producers: {}", self.producers);
        println!("  Records sent: {}", self.records_sent);
        println!("  Throughput: {:.2} records/s", self.throughput());
        println!("  Drop rate: {:.2}%", self.drop_rate());
        let latency = &self.enqueue_latency_us;
        if latency.count == 0 {
            println!("  Enqueue latency (us): N/A");
        } else {
            println!(
                "  Enqueue latency (us): min={:.1}, max={:.1}, mean={:.1}, std={:.1}",
                latency.min, latency.max, latency.mean, latency.std_dev
            );
        }
        println!();
        print!("{}", self.metrics);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates() {
        let metrics = MetricsSnapshot {
            records_accepted: 90,
            records_processed: 90,
            records_dropped: 10,
            ..Default::default()
        };
        let mut latency = RunningStats::default();
        latency.push(2.0);
        latency.push(4.0);

        let report = RunReport::new("w", 2, 100, Duration::from_secs(3), &latency, metrics);
        assert!((report.throughput() - 30.0).abs() < 1e-9);
        assert!((report.drop_rate() - 10.0).abs() < 1e-9);
        assert_eq!(report.enqueue_latency_us.count, 2);
        assert!((report.enqueue_latency_us.mean - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_json_shape() {
        let report = RunReport::new(
            "w",
            1,
            0,
            Duration::ZERO,
            &RunningStats::default(),
            MetricsSnapshot::default(),
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["writer"], "w");
        assert_eq!(value["metrics"]["flush_count"], 0);
        assert!(value["metrics"]["avg_flush_duration_ns"].is_u64());
        assert_eq!(report.throughput(), 0.0);
    }
}
