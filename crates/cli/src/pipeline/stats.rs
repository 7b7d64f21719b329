//! Pipeline statistics.

use std::time::Duration;

use contracts::SyncPhase;
use dispatcher::MetricsSnapshot as SinkSnapshot;
use observability::SyncMetricsAggregator;
use sync_engine::EngineStats;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Hub events pulled from the source
    pub events_received: u64,

    /// AP-stamped events handed to the dispatcher
    pub events_stamped: u64,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Engine counters at shutdown
    pub engine: EngineStats,

    /// Offset estimate at shutdown (ns)
    pub final_delta_ns: i64,

    /// Estimator phase at shutdown
    pub final_phase: SyncPhase,

    /// Per-sink delivery counters
    pub sinks: Vec<(String, SinkSnapshot)>,

    /// Offset / estimate distributions
    pub sync_metrics: SyncMetricsAggregator,

    /// Stopped by the timeout
    pub timed_out: bool,

    /// Stopped by a shutdown signal
    pub interrupted: bool,
}

impl PipelineStats {
    /// Hub events processed per wall-clock second
    pub fn events_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.events_received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Events received: {}", self.events_received);
        println!("   ├─ Events stamped: {}", self.events_stamped);
        println!("   ├─ Throughput: {:.0} events/s", self.events_per_sec());
        println!("   ├─ Final phase: {}", self.final_phase);
        println!("   └─ Final delta: {} ns", self.final_delta_ns);

        let e = &self.engine;
        println!("\n⏱  Estimator");
        println!("   ├─ Time pairs: {}", e.pairs);
        println!("   ├─ Windows closed: {}", e.windows_closed);
        println!("   ├─ Rejected: {}", e.rejected);
        println!("   ├─ Re-anchored: {}", e.reanchored);
        println!("   ├─ AP sleep / wake: {} / {}", e.ap_sleeps, e.ap_wakes);
        println!(
            "   └─ Sensor events: {} ({} uncalibrated)",
            e.sensor_events, e.uncalibrated_events
        );

        let summary = self.sync_metrics.summary();
        println!("\n📈 Offsets");
        println!("   ├─ Pair offset (us): {}", summary.offset_us);
        println!("   └─ Delta estimate (us): {}", summary.delta_us);

        if !self.sinks.is_empty() {
            println!("\n📤 Sinks");
            for (i, (name, snapshot)) in self.sinks.iter().enumerate() {
                let prefix = if i == self.sinks.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!("   {} {}: {}", prefix, name, snapshot);
            }
        }

        if self.timed_out {
            println!("\n⚠ Stopped by timeout");
        }
        if self.interrupted {
            println!("\n⚠ Stopped by shutdown signal");
        }

        println!();
    }
}
