//! HubSyncBlueprint - Config Loader output
//!
//! Describes a complete sync session: estimator tuning, where hub events come
//! from, where AP-stamped events go and how the session is observed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::{ms_in_ns, s_in_ns, SyncConfig};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSyncBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Estimator tuning
    #[serde(default)]
    pub sync: SyncConfig,

    /// Hub event source
    pub source: SourceConfig,

    /// Output routing for AP-stamped events
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,

    /// Logging / metrics settings
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

/// Hub event source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Synthetic clock pairs generated in-process
    Mock(MockSourceConfig),
    /// Recorded JSONL trace
    Replay(ReplaySourceConfig),
}

impl SourceConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mock(_) => "mock",
            Self::Replay(_) => "replay",
        }
    }
}

/// Synthetic source parameters
///
/// Simulated time starts at hub time `hub_start_ns` and runs for
/// `duration_ns`. The AP clock reads `hub + true_offset_ns` plus drift; every
/// time pair is delivered with a one-sided latency in `[0, max_latency_ns]`
/// added to the hub reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockSourceConfig {
    /// Simulated session length (ns)
    pub duration_ns: u64,
    /// Interval between mailbox time pairs (ns)
    pub sync_interval_ns: u64,
    /// Hub clock value at session start (ns), must be > 0
    pub hub_start_ns: u64,
    /// True `ap - hub` offset at session start (ns)
    pub true_offset_ns: i64,
    /// AP clock rate error relative to the hub (parts per billion)
    pub drift_ppb: i64,
    /// Upper bound of the delivery latency (ns)
    pub max_latency_ns: u64,
    /// RNG seed for latency and sample values
    pub seed: u64,
    /// Optional hub clock step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jump: Option<ClockJump>,
    /// Optional AP sleep period
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ap_sleep: Option<SleepWindow>,
    /// Hub sensors producing samples
    pub sensors: Vec<MockSensorConfig>,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            duration_ns: s_in_ns(10),
            sync_interval_ns: ms_in_ns(100),
            hub_start_ns: s_in_ns(1),
            true_offset_ns: 0,
            drift_ppb: 0,
            max_latency_ns: 0,
            seed: 0,
            jump: None,
            ap_sleep: None,
            sensors: Vec::new(),
        }
    }
}

/// Hub clock step injected into a synthetic session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockJump {
    /// Session-relative time of the step (ns)
    pub at_ns: u64,
    /// Step applied to every later hub reading (ns)
    pub hub_step_ns: i64,
}

/// AP sleep period injected into a synthetic session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepWindow {
    /// Session-relative start of the sleep (ns)
    pub at_ns: u64,
    /// Sleep length (ns); no time pairs are delivered meanwhile
    pub duration_ns: u64,
}

/// Synthetic hub sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockSensorConfig {
    /// Unique identifier
    pub id: String,
    /// Sampling rate (Hz), must be > 0
    pub rate_hz: f64,
}

/// Trace replay parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySourceConfig {
    /// JSONL trace path
    pub path: PathBuf,
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// JSONL file output
    File,
}

/// Logging / metrics settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Log format
    pub log_format: LogFormat,
    /// Prometheus port (None = disabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
    /// Default log level when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_port: None,
            log_level: "info".to_string(),
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// JSON structured logs
    Json,
    /// Human-readable
    #[default]
    Pretty,
    /// Compact single line
    Compact,
}

impl HubSyncBlueprint {
    /// Blueprint with a default synthetic source and one log sink
    pub fn with_mock_source(mock: MockSourceConfig) -> Self {
        Self {
            version: ConfigVersion::V1,
            sync: SyncConfig::default(),
            source: SourceConfig::Mock(mock),
            sinks: vec![SinkConfig {
                name: "log".to_string(),
                sink_type: SinkType::Log,
                queue_capacity: default_queue_capacity(),
                params: HashMap::new(),
            }],
            observability: ObservabilitySettings::default(),
        }
    }

    /// Sensor ids the source is known to produce (mock sources only)
    pub fn sensor_ids(&self) -> Vec<&str> {
        match &self.source {
            SourceConfig::Mock(mock) => mock.sensors.iter().map(|s| s.id.as_str()).collect(),
            SourceConfig::Replay(_) => Vec::new(),
        }
    }
}
