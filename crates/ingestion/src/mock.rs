//! Synthetic hub event source
//!
//! Replaces a real AP/hub pair in tests and demos. Both clocks are derived
//! from one simulated session time `t` (ns since session start):
//!
//! - hub clock: `hub_start + t`, plus the configured step once `t` passes it
//! - AP clock: `hub_start + t + true_offset + drift_ppb * t / 1e9`
//!
//! A time pair captured at `t` carries the AP reading at `t` and the hub
//! reading at `t + latency`, so every offset sample undershoots the true
//! offset by its latency.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{
    ApPowerState, HubEvent, HubSensorEvent, MockSourceConfig, TimePair, NANOS_PER_SEC,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::config::IngestionMetrics;

/// Hub event tagged with the session time it becomes visible at
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    /// Session-relative time (ns)
    pub at_ns: u64,
    pub event: HubEvent,
}

#[derive(Debug, Clone, Copy)]
struct PendingPair {
    captured_ns: u64,
    delivered_ns: u64,
}

#[derive(Debug, Clone)]
struct SensorClock {
    id: String,
    period_ns: u64,
    next_ns: u64,
}

/// Deterministic, hub-time ordered stream of synthetic events
#[derive(Debug)]
pub struct MockTimeline {
    config: MockSourceConfig,
    rng: StdRng,
    next_capture: u64,
    pending_pair: Option<PendingPair>,
    sensors: Vec<SensorClock>,
    power_events: VecDeque<(u64, ApPowerState)>,
}

impl MockTimeline {
    pub fn new(config: MockSourceConfig) -> Self {
        let sensors = config
            .sensors
            .iter()
            .map(|s| SensorClock {
                id: s.id.clone(),
                period_ns: (NANOS_PER_SEC as f64 / s.rate_hz).round().max(1.0) as u64,
                next_ns: 0,
            })
            .collect();

        let mut power_events = VecDeque::new();
        if let Some(sleep) = config.ap_sleep {
            if sleep.at_ns <= config.duration_ns {
                power_events.push_back((sleep.at_ns, ApPowerState::Sleep));
                let wake_at = sleep.at_ns.saturating_add(sleep.duration_ns);
                if wake_at <= config.duration_ns {
                    power_events.push_back((wake_at, ApPowerState::Wake));
                }
            }
        }

        let mut timeline = Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            next_capture: 0,
            pending_pair: None,
            sensors,
            power_events,
        };
        timeline.pending_pair = timeline.schedule_pair();
        timeline
    }

    /// Hub clock reading at session time `t`
    pub fn hub_clock(&self, t_ns: u64) -> u64 {
        let mut hub = self.config.hub_start_ns as i128 + t_ns as i128;
        if let Some(jump) = self.config.jump {
            if t_ns >= jump.at_ns {
                hub += jump.hub_step_ns as i128;
            }
        }
        clamp_ns(hub)
    }

    /// AP clock reading at session time `t`
    pub fn ap_clock(&self, t_ns: u64) -> u64 {
        let drift = self.config.drift_ppb as i128 * t_ns as i128 / NANOS_PER_SEC as i128;
        clamp_ns(
            self.config.hub_start_ns as i128
                + t_ns as i128
                + self.config.true_offset_ns as i128
                + drift,
        )
    }

    /// Next event together with its session time
    pub fn next_timed(&mut self) -> Option<TimedEvent> {
        let duration = self.config.duration_ns;

        let power_at = self.power_events.front().map(|(at, _)| *at);
        let pair_at = self.pending_pair.map(|p| p.delivered_ns);
        let sensor = self
            .sensors
            .iter()
            .enumerate()
            .filter(|(_, s)| s.next_ns <= duration)
            .min_by_key(|(_, s)| s.next_ns)
            .map(|(idx, s)| (idx, s.next_ns));

        // Ties resolve power -> pair -> sensor
        let earliest = [power_at, pair_at, sensor.map(|(_, at)| at)]
            .into_iter()
            .flatten()
            .min()?;

        if power_at == Some(earliest) {
            let (at_ns, state) = self.power_events.pop_front()?;
            return Some(TimedEvent {
                at_ns,
                event: HubEvent::ApStatus { state },
            });
        }

        if pair_at == Some(earliest) {
            let pending = self.pending_pair.take()?;
            self.pending_pair = self.schedule_pair();
            let pair = TimePair::new(
                self.ap_clock(pending.captured_ns),
                self.hub_clock(pending.delivered_ns),
            );
            return Some(TimedEvent {
                at_ns: pending.delivered_ns,
                event: HubEvent::TimeSync(pair),
            });
        }

        let (idx, at_ns) = sensor?;
        let hub_time_ns = self.hub_clock(at_ns);
        let values = (0..3).map(|_| self.rng.random_range(-1.0f32..1.0)).collect();
        let clock = &mut self.sensors[idx];
        clock.next_ns = clock.next_ns.saturating_add(clock.period_ns);

        Some(TimedEvent {
            at_ns,
            event: HubEvent::Sensor(HubSensorEvent {
                sensor_id: clock.id.clone(),
                hub_time_ns,
                values,
            }),
        })
    }

    /// Next pair capture outside any AP sleep period
    fn schedule_pair(&mut self) -> Option<PendingPair> {
        loop {
            let captured_ns = self
                .next_capture
                .checked_mul(self.config.sync_interval_ns)?;
            if captured_ns > self.config.duration_ns || self.config.sync_interval_ns == 0 {
                return None;
            }
            self.next_capture += 1;

            if self.is_asleep(captured_ns) {
                continue;
            }

            let latency = if self.config.max_latency_ns > 0 {
                self.rng.random_range(0..=self.config.max_latency_ns)
            } else {
                0
            };
            return Some(PendingPair {
                captured_ns,
                delivered_ns: captured_ns.saturating_add(latency),
            });
        }
    }

    fn is_asleep(&self, t_ns: u64) -> bool {
        self.config.ap_sleep.is_some_and(|sleep| {
            t_ns >= sleep.at_ns && t_ns < sleep.at_ns.saturating_add(sleep.duration_ns)
        })
    }
}

impl Iterator for MockTimeline {
    type Item = HubEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_timed().map(|timed| timed.event)
    }
}

fn clamp_ns(value: i128) -> u64 {
    value.clamp(0, u64::MAX as i128) as u64
}

/// Mock hub source
///
/// Runs a [`MockTimeline`] on a tokio task.
pub struct MockHubSource {
    config: MockSourceConfig,
    running: Arc<AtomicBool>,
    metrics: Arc<IngestionMetrics>,
}

impl MockHubSource {
    pub fn new(config: MockSourceConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    /// Start the source, returning the event stream
    ///
    /// # Arguments
    /// * `channel_capacity` - channel capacity
    /// * `pace` - optional speed factor; `Some(1.0)` replays in real time,
    ///   `None` emits as fast as the receiver drains
    pub fn start(&self, channel_capacity: usize, pace: Option<f64>) -> mpsc::Receiver<HubEvent> {
        let (tx, rx) = mpsc::channel(channel_capacity);
        let mut timeline = MockTimeline::new(self.config.clone());
        let running = self.running.clone();
        let metrics = self.metrics.clone();
        let pace = pace.filter(|speed| *speed > 0.0);

        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            debug!(
                duration_ns = timeline.config.duration_ns,
                true_offset_ns = timeline.config.true_offset_ns,
                sensors = timeline.sensors.len(),
                "mock hub source started"
            );

            let mut last_at = 0u64;
            while running.load(Ordering::Relaxed) {
                let Some(timed) = timeline.next_timed() else {
                    break;
                };

                if let Some(speed) = pace {
                    let gap = timed.at_ns.saturating_sub(last_at) as f64 / speed;
                    if gap >= 1.0 {
                        tokio::time::sleep(Duration::from_nanos(gap as u64)).await;
                    }
                }
                last_at = timed.at_ns;

                let kind = timed.event.kind();
                if tx.send(timed.event).await.is_err() {
                    metrics.record_dropped();
                    debug!("mock hub channel closed");
                    break;
                }
                metrics.record_received(kind);
                trace!(at_ns = timed.at_ns, kind, "mock event sent");
            }

            running.store(false, Ordering::SeqCst);
            debug!("mock hub source stopped");
        });

        rx
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }
}
