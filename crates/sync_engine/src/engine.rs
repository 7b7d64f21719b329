//! Event-driven sync engine.
//!
//! Mirrors the hub's mailbox handling: time pairs feed the estimator, an AP
//! sleep announcement resets anomaly tracking, and locally sampled sensor
//! events are re-stamped into the AP clock domain.

use contracts::{
    apply_offset, ApPowerState, ApSensorEvent, HubEvent, HubSensorEvent, SampleOutcome,
    SyncConfig, SyncPhase, SyncSnapshot, TimePair,
};
use serde::Serialize;
use tracing::{debug, info, instrument, trace};

use crate::ApHubSync;

/// Counters kept by the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Time pairs received
    pub pairs: u64,
    /// Pairs that opened the first window
    pub windows_opened: u64,
    /// Pairs folded into an open window
    pub accumulated: u64,
    /// Window closures (estimate updates)
    pub windows_closed: u64,
    /// Pairs rejected as clock glitches
    pub rejected: u64,
    /// Re-anchors after a sustained glitch
    pub reanchored: u64,
    /// AP wake announcements
    pub ap_wakes: u64,
    /// AP sleep announcements (each one resets anomaly tracking)
    pub ap_sleeps: u64,
    /// Sensor events stamped
    pub sensor_events: u64,
    /// Sensor events stamped before any time pair
    pub uncalibrated_events: u64,
}

impl EngineStats {
    fn record(&mut self, outcome: SampleOutcome) {
        match outcome {
            SampleOutcome::WindowOpened => self.windows_opened += 1,
            SampleOutcome::Accumulated => self.accumulated += 1,
            SampleOutcome::WindowClosed { .. } => self.windows_closed += 1,
            SampleOutcome::AbnormalDetected | SampleOutcome::AbnormalPending => {
                self.rejected += 1
            }
            SampleOutcome::Reanchored => self.reanchored += 1,
        }
    }
}

/// Hub-side sync engine
#[derive(Debug)]
pub struct HubSyncEngine {
    estimator: ApHubSync,
    stats: EngineStats,
}

impl HubSyncEngine {
    pub fn new(config: SyncConfig) -> Self {
        Self::with_estimator(ApHubSync::new(config))
    }

    /// Resume from a previously learned estimator
    pub fn with_estimator(estimator: ApHubSync) -> Self {
        Self {
            estimator,
            stats: EngineStats::default(),
        }
    }

    /// Process one hub event.
    ///
    /// Returns the AP-stamped event for sensor samples, `None` otherwise.
    #[instrument(
        level = "trace",
        name = "hub_sync_handle",
        skip(self, event),
        fields(kind = event.kind())
    )]
    pub fn handle(&mut self, event: HubEvent) -> Option<ApSensorEvent> {
        match event {
            HubEvent::TimeSync(pair) => {
                self.on_time_sync(pair);
                None
            }
            HubEvent::ApStatus { state } => {
                self.on_ap_status(state);
                None
            }
            HubEvent::Sensor(sample) => Some(self.stamp_owned(sample)),
        }
    }

    /// Feed one mailbox time pair
    pub fn on_time_sync(&mut self, pair: TimePair) -> SampleOutcome {
        self.stats.pairs += 1;
        let outcome = self
            .estimator
            .add_sample(pair.ap_time_ns, pair.hub_time_ns);
        self.stats.record(outcome);

        observability::record_sample_outcome(outcome);
        observability::record_offset_sample(pair.offset());
        if let SampleOutcome::WindowClosed { delta_estimate_ns } = outcome {
            observability::record_delta_estimate(delta_estimate_ns);
        }

        trace!(
            ap_time = pair.ap_time_ns,
            hub_time = pair.hub_time_ns,
            offset = pair.offset(),
            outcome = outcome.label(),
            "time pair processed"
        );
        outcome
    }

    /// React to an AP power announcement
    pub fn on_ap_status(&mut self, state: ApPowerState) {
        observability::record_ap_status(state);
        match state {
            ApPowerState::Sleep => {
                self.stats.ap_sleeps += 1;
                self.estimator.reset();
                info!(delta = self.current_delta(), "AP entered sleep, sync tracking reset");
            }
            ApPowerState::Wake => {
                self.stats.ap_wakes += 1;
                info!(delta = self.current_delta(), "AP woke up");
            }
        }
    }

    /// Re-stamp a hub sensor event into the AP domain
    pub fn stamp(&mut self, sample: &HubSensorEvent) -> ApSensorEvent {
        self.stamp_owned(sample.clone())
    }

    /// Convert a hub timestamp into the AP domain
    pub fn to_ap_time(&self, hub_time: u64) -> u64 {
        apply_offset(hub_time, self.estimator.get_delta(hub_time))
    }

    pub fn current_delta(&self) -> i64 {
        self.estimator.get_delta(0)
    }

    pub fn phase(&self) -> SyncPhase {
        self.estimator.phase()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn estimator(&self) -> &ApHubSync {
        &self.estimator
    }

    pub fn snapshot(&self) -> SyncSnapshot {
        self.estimator.snapshot()
    }

    fn stamp_owned(&mut self, sample: HubSensorEvent) -> ApSensorEvent {
        let delta = self.estimator.get_delta(sample.hub_time_ns);
        let calibrated = self.estimator.phase() != SyncPhase::NotInited;

        self.stats.sensor_events += 1;
        if !calibrated {
            self.stats.uncalibrated_events += 1;
            debug!(sensor_id = %sample.sensor_id, "stamping before first time pair");
        }
        observability::record_sensor_event(&sample.sensor_id, calibrated);

        ApSensorEvent {
            ap_time_ns: apply_offset(sample.hub_time_ns, delta),
            hub_time_ns: sample.hub_time_ns,
            delta_ns: delta,
            calibrated,
            sensor_id: sample.sensor_id,
            values: sample.values,
        }
    }
}

impl Default for HubSyncEngine {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(hub_time_ns: u64) -> HubSensorEvent {
        HubSensorEvent {
            sensor_id: "accel".to_string(),
            hub_time_ns,
            values: vec![0.0, 0.0, 9.81],
        }
    }

    #[test]
    fn test_uncalibrated_stamp_is_identity() {
        let mut engine = HubSyncEngine::default();
        let event = engine.stamp(&sensor(42_000));

        assert_eq!(event.ap_time_ns, 42_000);
        assert_eq!(event.delta_ns, 0);
        assert!(!event.calibrated);
        assert_eq!(engine.stats().uncalibrated_events, 1);
    }

    #[test]
    fn test_stamp_applies_estimate() {
        let mut engine = HubSyncEngine::default();
        engine.handle(HubEvent::TimeSync(TimePair::new(1_000_250_000, 1_000_000_000)));

        let event = engine
            .handle(HubEvent::Sensor(sensor(1_100_000_000)))
            .expect("sensor events are stamped");
        assert!(event.calibrated);
        assert_eq!(event.delta_ns, 250_000);
        assert_eq!(event.ap_time_ns, 1_100_250_000);
        assert_eq!(event.values, vec![0.0, 0.0, 9.81]);
    }

    #[test]
    fn test_stamp_saturates_negative_results() {
        let mut engine = HubSyncEngine::default();
        engine.on_time_sync(TimePair::new(1_000_000_000, 3_000_000_000));
        assert_eq!(engine.to_ap_time(1_000), 0);
    }

    #[test]
    fn test_ap_sleep_clears_abnormal_only() {
        let mut engine = HubSyncEngine::default();
        engine.on_time_sync(TimePair::new(1_000_000_000, 999_999_900));
        let outcome = engine.on_time_sync(TimePair::new(4_000_000_000, 1_100_000_000));
        assert_eq!(outcome, SampleOutcome::AbnormalDetected);
        assert!(engine.estimator().is_abnormal());

        engine.handle(HubEvent::ApStatus {
            state: ApPowerState::Sleep,
        });

        assert!(!engine.estimator().is_abnormal());
        assert_eq!(engine.phase(), SyncPhase::UseMax);
        assert_eq!(engine.current_delta(), 100);
        assert_eq!(engine.stats().ap_sleeps, 1);
    }

    #[test]
    fn test_ap_wake_keeps_state() {
        let mut engine = HubSyncEngine::default();
        engine.on_time_sync(TimePair::new(1_000_000_000, 999_999_900));
        engine.on_time_sync(TimePair::new(4_000_000_000, 1_100_000_000));

        engine.on_ap_status(ApPowerState::Wake);

        assert!(engine.estimator().is_abnormal());
        assert_eq!(engine.stats().ap_wakes, 1);
    }

    #[test]
    fn test_stats_track_outcomes() {
        let mut engine = HubSyncEngine::default();
        engine.on_time_sync(TimePair::new(1_000_000_000, 1_000_000_000));
        engine.on_time_sync(TimePair::new(1_500_000_000, 1_500_000_000));
        engine.on_time_sync(TimePair::new(2_000_000_001, 2_000_000_001));
        engine.on_time_sync(TimePair::new(9_000_000_000, 2_100_000_000));

        let stats = engine.stats();
        assert_eq!(stats.pairs, 4);
        assert_eq!(stats.windows_opened, 1);
        assert_eq!(stats.accumulated, 1);
        assert_eq!(stats.windows_closed, 1);
        assert_eq!(stats.rejected, 1);
    }
}
