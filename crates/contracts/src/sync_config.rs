//! Estimator configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

use crate::s_in_ns;

/// Maximum time a window stays open; also the abnormal-jump tolerance and
/// the re-anchor cooldown.
pub const SYNC_WINDOW_TIMEOUT_NS: u64 = s_in_ns(1);

/// Smoothing denominator.
pub const SYNC_FILTER_B: u32 = 8;

/// Smoothing numerator (weight of the new window max).
pub const SYNC_FILTER_A: u32 = 3;

/// Staleness threshold of a sync relationship (at most 500us of drift at
/// 10ppm). Kept for reference; no estimator logic consumes it.
pub const SYNC_EXPIRATION_NS: u64 = s_in_ns(50);

/// Offset estimator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Window length / abnormal tolerance (ns)
    pub window_timeout_ns: u64,
    /// Weight of the new window max in the IIR update
    pub filter_a: u32,
    /// IIR denominator
    pub filter_b: u32,
    /// Staleness threshold (ns)
    pub expiration_ns: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            window_timeout_ns: SYNC_WINDOW_TIMEOUT_NS,
            filter_a: SYNC_FILTER_A,
            filter_b: SYNC_FILTER_B,
            expiration_ns: SYNC_EXPIRATION_NS,
        }
    }
}
