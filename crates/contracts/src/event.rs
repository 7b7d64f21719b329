//! Hub event contracts
//!
//! Everything that reaches the hub-side sync engine (mailbox time pairs, AP
//! power notifications, locally sampled sensor data) and the AP-stamped
//! sensor events it produces.

use serde::{Deserialize, Serialize};

use crate::TimePair;

/// AP power state as announced over the mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApPowerState {
    Wake,
    Sleep,
}

/// Sensor sample stamped with the hub clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubSensorEvent {
    /// Sensor identifier
    pub sensor_id: String,
    /// Hub clock reading at sampling time (ns)
    pub hub_time_ns: u64,
    /// Sample values
    #[serde(default)]
    pub values: Vec<f32>,
}

/// Single item of the hub event stream
///
/// This is also the line format of JSONL traces, tagged by `"type"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubEvent {
    /// Timestamp pair delivered over the mailbox
    TimeSync(TimePair),
    /// AP wake/sleep notification
    ApStatus { state: ApPowerState },
    /// Hub-stamped sensor sample
    Sensor(HubSensorEvent),
}

impl HubEvent {
    /// Hub time the event refers to, when it carries one
    pub fn hub_time_ns(&self) -> Option<u64> {
        match self {
            Self::TimeSync(pair) => Some(pair.hub_time_ns),
            Self::Sensor(event) => Some(event.hub_time_ns),
            Self::ApStatus { .. } => None,
        }
    }

    /// Short kind label (used for logs and metrics)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TimeSync(_) => "time_sync",
            Self::ApStatus { .. } => "ap_status",
            Self::Sensor(_) => "sensor",
        }
    }
}

/// Sensor sample re-stamped into the AP clock domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApSensorEvent {
    /// Sensor identifier
    pub sensor_id: String,
    /// Original hub timestamp (ns)
    pub hub_time_ns: u64,
    /// Timestamp in the AP domain (ns)
    pub ap_time_ns: u64,
    /// Offset applied (`ap - hub`)
    pub delta_ns: i64,
    /// False while the estimator has no sample yet (offset 0 applied)
    pub calibrated: bool,
    /// Sample values
    pub values: Vec<f32>,
}
