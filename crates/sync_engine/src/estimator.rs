//! AP-Hub clock offset estimator.
//!
//! Tracks the additive offset `ap - hub` between two free-running nanosecond
//! counters. Offset samples are grouped into windows of at most
//! `window_timeout_ns`; each window contributes its *maximum* sample, since
//! delivery latency only ever makes a sample smaller than the true offset.
//! Closed windows are folded into an integer IIR filter.
//!
//! Pairs whose elapsed AP and hub times disagree by more than the window
//! timeout are treated as a clock glitch: they are rejected until the
//! disagreement has persisted for a full timeout, after which the next pair
//! re-anchors the reference point.

use contracts::{SampleOutcome, SyncConfig, SyncPhase, SyncSnapshot};
use tracing::{debug, info};

/// Offset estimator for one AP/hub clock pair
///
/// Not internally synchronized; see [`crate::SharedApHubSync`] for a handle
/// that can be shared between threads.
#[derive(Debug, Clone)]
pub struct ApHubSync {
    config: SyncConfig,
    /// Last accepted AP reading, 0 until the first sample
    last_ap_time: u64,
    /// Hub reading paired with `last_ap_time`
    last_hub_time: u64,
    phase: SyncPhase,
    window_max: i64,
    window_deadline: u64,
    delta_estimate: i64,
    abnormal: AbnormalTracker,
}

#[derive(Debug, Clone, Copy, Default)]
struct AbnormalTracker {
    active: bool,
    since: u64,
}

impl Default for ApHubSync {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

impl ApHubSync {
    /// Create an estimator with no samples
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            last_ap_time: 0,
            last_hub_time: 0,
            phase: SyncPhase::NotInited,
            window_max: 0,
            window_deadline: 0,
            delta_estimate: 0,
            abnormal: AbnormalTracker::default(),
        }
    }

    /// Rebuild an estimator from a snapshot
    pub fn restore(config: SyncConfig, snapshot: &SyncSnapshot) -> Self {
        Self {
            config,
            last_ap_time: snapshot.last_ap_time_ns,
            last_hub_time: snapshot.last_hub_time_ns,
            phase: snapshot.phase,
            window_max: snapshot.window_max_ns,
            window_deadline: snapshot.window_deadline_ns,
            delta_estimate: snapshot.delta_estimate_ns,
            abnormal: AbnormalTracker {
                active: snapshot.abnormal,
                since: snapshot.abnormal_since_ns,
            },
        }
    }

    /// Clear anomaly tracking.
    ///
    /// The learned offset, the open window and the reference point are kept.
    pub fn reset(&mut self) {
        self.abnormal.active = false;
        debug!("ApHub sync reset");
    }

    /// Feed one `(ap, hub)` pair taken at the same instant.
    pub fn add_sample(&mut self, ap_time: u64, hub_time: u64) -> SampleOutcome {
        let offset = ap_time.wrapping_sub(hub_time) as i64;
        let timeout = self.config.window_timeout_ns;

        if self.last_ap_time != 0 {
            let delta_ap = ap_time.wrapping_sub(self.last_ap_time) as i64;
            let delta_hub = hub_time.wrapping_sub(self.last_hub_time) as i64;

            if delta_ap.abs_diff(delta_hub) > timeout {
                if !self.abnormal.active {
                    self.abnormal = AbnormalTracker {
                        active: true,
                        since: ap_time,
                    };
                    debug!(ap_time, hub_time, delta_ap, delta_hub, "abnormal time");
                    return SampleOutcome::AbnormalDetected;
                }

                if ap_time.wrapping_sub(self.abnormal.since) > timeout {
                    self.last_ap_time = ap_time;
                    self.last_hub_time = hub_time;
                    self.abnormal.active = false;
                    info!(ap_time, hub_time, "abnormal time fixed, re-anchored");
                    return SampleOutcome::Reanchored;
                }

                return SampleOutcome::AbnormalPending;
            }
        }

        self.last_ap_time = ap_time;
        self.last_hub_time = hub_time;
        self.abnormal.active = false;

        if self.phase == SyncPhase::NotInited {
            self.window_max = offset;
            self.window_deadline = ap_time.saturating_add(timeout);
            self.phase = SyncPhase::UseMax;
            return SampleOutcome::WindowOpened;
        }

        self.window_max = self.window_max.max(offset);

        // delta_estimate is still 0 while in UseMax, so a negative offset
        // closes the first window early too
        if ap_time <= self.window_deadline && offset >= self.delta_estimate {
            return SampleOutcome::Accumulated;
        }

        self.delta_estimate = match self.phase {
            SyncPhase::UseFiltered => self.filtered(self.window_max),
            _ => self.window_max,
        };
        self.phase = SyncPhase::UseFiltered;
        debug!(delta_estimate = self.delta_estimate, "ApHub new sync offset");

        self.window_max = i64::MIN;
        self.window_deadline = ap_time.saturating_add(timeout);

        SampleOutcome::WindowClosed {
            delta_estimate_ns: self.delta_estimate,
        }
    }

    /// Best current estimate of `ap - hub`.
    ///
    /// Returns 0 before the first sample (uncalibrated, not a true zero
    /// offset). The hub time argument is accepted for interface symmetry and
    /// not used.
    pub fn get_delta(&self, _hub_time: u64) -> i64 {
        match self.phase {
            SyncPhase::NotInited => 0,
            SyncPhase::UseMax => self.window_max,
            SyncPhase::UseFiltered => self.delta_estimate,
        }
    }

    /// Current state machine phase
    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Whether a clock glitch is being waited out
    pub fn is_abnormal(&self) -> bool {
        self.abnormal.active
    }

    /// Tuning the estimator was built with
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Copy of the complete state
    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            phase: self.phase,
            last_ap_time_ns: self.last_ap_time,
            last_hub_time_ns: self.last_hub_time,
            window_max_ns: self.window_max,
            window_deadline_ns: self.window_deadline,
            delta_estimate_ns: self.delta_estimate,
            abnormal: self.abnormal.active,
            abnormal_since_ns: self.abnormal.since,
        }
    }

    /// `((B - A) * estimate + A * window_max) / B`, truncated toward zero.
    fn filtered(&self, window_max: i64) -> i64 {
        let a = i128::from(self.config.filter_a);
        let b = i128::from(self.config.filter_b.max(1));
        let blended = ((b - a) * i128::from(self.delta_estimate) + a * i128::from(window_max)) / b;
        blended.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
    }
}
