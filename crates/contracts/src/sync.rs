//! Estimator state contracts
//!
//! Lifecycle phase, serializable snapshot and per-sample outcome of the AP-Hub
//! offset estimator.

use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Offset returned when no trustworthy estimator state exists.
pub const INVALID_DELTA: i64 = i64::MIN;

/// Estimator lifecycle stage
///
/// `NotInited -> UseMax -> UseFiltered`, the last one self-looping.
/// Serialized as its numeric code so persisted state stays compatible with
/// the firmware layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SyncPhase {
    /// No sample accepted yet
    #[default]
    NotInited,
    /// First window open; the window max is the best estimate
    UseMax,
    /// At least one window closed; the filtered estimate is valid
    UseFiltered,
}

impl SyncPhase {
    pub const fn code(self) -> u8 {
        match self {
            Self::NotInited => 0,
            Self::UseMax => 1,
            Self::UseFiltered => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::NotInited => "not_inited",
            Self::UseMax => "use_max",
            Self::UseFiltered => "use_filtered",
        }
    }
}

impl From<SyncPhase> for u8 {
    fn from(phase: SyncPhase) -> Self {
        phase.code()
    }
}

impl TryFrom<u8> for SyncPhase {
    type Error = ContractError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::NotInited),
            1 => Ok(Self::UseMax),
            2 => Ok(Self::UseFiltered),
            _ => Err(ContractError::InvalidSyncPhase { code }),
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Complete copy of an estimator's state
///
/// Used for diagnostics and for persisting a learned offset across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncSnapshot {
    /// Lifecycle stage
    pub phase: SyncPhase,
    /// Last accepted AP reading (0 = never initialized)
    pub last_ap_time_ns: u64,
    /// Last accepted hub reading
    pub last_hub_time_ns: u64,
    /// Maximum offset seen in the open window
    pub window_max_ns: i64,
    /// AP time at which the open window closes
    pub window_deadline_ns: u64,
    /// Filtered offset estimate
    pub delta_estimate_ns: i64,
    /// Clocks currently disagree on elapsed time
    pub abnormal: bool,
    /// AP time the disagreement was first seen
    pub abnormal_since_ns: u64,
}

/// What the estimator did with one timestamp pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SampleOutcome {
    /// First accepted sample; the first window is now open
    WindowOpened,
    /// Folded into the open window
    Accumulated,
    /// Window closed and the estimate updated
    WindowClosed { delta_estimate_ns: i64 },
    /// Elapsed times disagree; sample rejected and anomaly tracking started
    AbnormalDetected,
    /// Still inside the anomaly cooldown; sample rejected
    AbnormalPending,
    /// Anomaly outlived the cooldown; sample became the new reference point
    Reanchored,
}

impl SampleOutcome {
    /// Whether the pair was rejected outright
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::AbnormalDetected | Self::AbnormalPending)
    }

    /// Stable label (used as a metrics label)
    pub fn label(&self) -> &'static str {
        match self {
            Self::WindowOpened => "window_opened",
            Self::Accumulated => "accumulated",
            Self::WindowClosed { .. } => "window_closed",
            Self::AbnormalDetected => "abnormal_detected",
            Self::AbnormalPending => "abnormal_pending",
            Self::Reanchored => "reanchored",
        }
    }
}
