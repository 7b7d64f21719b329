//! Sync metric collection
//!
//! Prometheus recorders for estimator activity plus an in-memory aggregator
//! used for end-of-run summaries.

use std::collections::HashMap;

use contracts::{ApPowerState, SampleOutcome};
use metrics::{counter, gauge, histogram};

/// Record the outcome of one time pair
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_sample_outcome;
///
/// let outcome = estimator.add_sample(ap, hub);
/// record_sample_outcome(outcome);
/// ```
pub fn record_sample_outcome(outcome: SampleOutcome) {
    counter!("aphub_sync_pairs_total", "outcome" => outcome.label()).increment(1);

    if outcome.is_rejected() {
        counter!("aphub_sync_pairs_rejected_total").increment(1);
    }
}

/// Record the raw `ap - hub` offset carried by a time pair (ns)
pub fn record_offset_sample(offset_ns: i64) {
    gauge!("aphub_sync_last_offset_ns").set(offset_ns as f64);
    histogram!("aphub_sync_offset_us").record(offset_ns as f64 / 1_000.0);
}

/// Record a new offset estimate published at window close (ns)
pub fn record_delta_estimate(delta_ns: i64) {
    gauge!("aphub_sync_delta_estimate_ns").set(delta_ns as f64);
    counter!("aphub_sync_windows_closed_total").increment(1);
}

/// Record an AP power announcement
pub fn record_ap_status(state: ApPowerState) {
    let label = match state {
        ApPowerState::Wake => "wake",
        ApPowerState::Sleep => "sleep",
    };
    counter!("aphub_sync_ap_status_total", "state" => label).increment(1);
    gauge!("aphub_sync_ap_awake").set(if state == ApPowerState::Wake { 1.0 } else { 0.0 });
}

/// Record a sensor event stamped into the AP domain
pub fn record_sensor_event(sensor_id: &str, calibrated: bool) {
    counter!(
        "aphub_sync_sensor_events_total",
        "sensor_id" => sensor_id.to_string(),
        "calibrated" => if calibrated { "true" } else { "false" }
    )
    .increment(1);
}

/// Record a dispatched event
pub fn record_event_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "aphub_sync_events_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Sync metrics aggregator
///
/// Aggregates in memory for run summaries.
#[derive(Debug, Clone, Default)]
pub struct SyncMetricsAggregator {
    /// Time pairs seen
    pub total_pairs: u64,

    /// Pairs rejected as clock glitches
    pub total_rejected: u64,

    /// Re-anchors after sustained glitches
    pub total_reanchored: u64,

    /// Window closures
    pub windows_closed: u64,

    /// Raw pair offsets (us)
    pub offset_stats: RunningStats,

    /// Published estimates (us)
    pub delta_stats: RunningStats,

    /// Sensor events per sensor id
    pub sensor_counts: HashMap<String, u64>,
}

impl SyncMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one processed time pair
    pub fn update(&mut self, offset_ns: i64, outcome: SampleOutcome) {
        self.total_pairs += 1;
        self.offset_stats.push(offset_ns as f64 / 1_000.0);

        match outcome {
            SampleOutcome::WindowClosed { delta_estimate_ns } => {
                self.windows_closed += 1;
                self.delta_stats.push(delta_estimate_ns as f64 / 1_000.0);
            }
            SampleOutcome::Reanchored => self.total_reanchored += 1,
            o if o.is_rejected() => self.total_rejected += 1,
            _ => {}
        }
    }

    /// Account for one stamped sensor event
    pub fn record_sensor(&mut self, sensor_id: &str) {
        *self.sensor_counts.entry(sensor_id.to_string()).or_insert(0) += 1;
    }

    /// Build a summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_pairs: self.total_pairs,
            total_rejected: self.total_rejected,
            total_reanchored: self.total_reanchored,
            windows_closed: self.windows_closed,
            reject_rate: if self.total_pairs > 0 {
                self.total_rejected as f64 / self.total_pairs as f64 * 100.0
            } else {
                0.0
            },
            offset_us: StatsSummary::from(&self.offset_stats),
            delta_us: StatsSummary::from(&self.delta_stats),
            sensor_counts: self.sensor_counts.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_pairs: u64,
    pub total_rejected: u64,
    pub total_reanchored: u64,
    pub windows_closed: u64,
    pub reject_rate: f64,
    pub offset_us: StatsSummary,
    pub delta_us: StatsSummary,
    pub sensor_counts: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Sync Metrics Summary ===")?;
        writeln!(f, "Time pairs: {}", self.total_pairs)?;
        writeln!(
            f,
            "Rejected pairs: {} ({:.2}%)",
            self.total_rejected, self.reject_rate
        )?;
        writeln!(f, "Re-anchors: {}", self.total_reanchored)?;
        writeln!(f, "Windows closed: {}", self.windows_closed)?;
        writeln!(f, "Pair offset (us): {}", self.offset_us)?;
        writeln!(f, "Delta estimate (us): {}", self.delta_us)?;

        if !self.sensor_counts.is_empty() {
            let mut sensors: Vec<_> = self.sensor_counts.iter().collect();
            sensors.sort();
            writeln!(f, "Sensor events:")?;
            for (sensor, count) in sensors {
                writeln!(f, "  {}: {}", sensor, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = SyncMetricsAggregator::new();

        aggregator.update(2_000, SampleOutcome::WindowOpened);
        aggregator.update(3_000, SampleOutcome::Accumulated);
        aggregator.update(
            2_500,
            SampleOutcome::WindowClosed {
                delta_estimate_ns: 3_000,
            },
        );
        aggregator.update(5_000_000_000, SampleOutcome::AbnormalDetected);
        aggregator.update(5_000_000_000, SampleOutcome::Reanchored);
        aggregator.record_sensor("accel");
        aggregator.record_sensor("accel");

        assert_eq!(aggregator.total_pairs, 5);
        assert_eq!(aggregator.windows_closed, 1);
        assert_eq!(aggregator.total_rejected, 1);
        assert_eq!(aggregator.total_reanchored, 1);
        assert_eq!(aggregator.delta_stats.count(), 1);
        assert!((aggregator.delta_stats.mean() - 3.0).abs() < 1e-10);
        assert_eq!(aggregator.sensor_counts.get("accel"), Some(&2));

        let summary = aggregator.summary();
        assert!((summary.reject_rate - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let summary = MetricsSummary {
            total_pairs: 100,
            total_rejected: 5,
            reject_rate: 5.0,
            delta_us: StatsSummary {
                count: 10,
                min: 2.0,
                max: 3.0,
                mean: 2.5,
                std_dev: 0.2,
            },
            ..Default::default()
        };

        let output = format!("{}", summary);
        assert!(output.contains("Time pairs: 100"));
        assert!(output.contains("5.00%"));
        assert!(output.contains("Pair offset (us): N/A"));
    }

    #[test]
    fn test_recorders_without_installed_recorder() {
        // No global recorder: calls must be no-ops
        record_sample_outcome(SampleOutcome::AbnormalPending);
        record_offset_sample(-12);
        record_delta_estimate(42);
        record_ap_status(ApPowerState::Sleep);
        record_sensor_event("gyro", false);
        record_event_dispatched("log", true);
    }
}
