//! Nanosecond time helpers and the AP/hub timestamp pair.

use serde::{Deserialize, Serialize};

/// Nanoseconds per second
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Whole seconds expressed in nanoseconds
pub const fn s_in_ns(seconds: u64) -> u64 {
    NANOS_PER_SEC * seconds
}

/// Milliseconds expressed in nanoseconds
pub const fn ms_in_ns(millis: u64) -> u64 {
    1_000_000 * millis
}

/// Two clock readings believed to describe the same physical instant.
///
/// The AP reading is the reference domain, the hub reading the peer domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TimePair {
    /// AP clock reading (ns)
    pub ap_time_ns: u64,
    /// Hub clock reading (ns)
    pub hub_time_ns: u64,
}

impl TimePair {
    pub const fn new(ap_time_ns: u64, hub_time_ns: u64) -> Self {
        Self {
            ap_time_ns,
            hub_time_ns,
        }
    }

    /// Offset sample `ap - hub`, two's-complement wrapped into `i64`.
    pub const fn offset(&self) -> i64 {
        self.ap_time_ns.wrapping_sub(self.hub_time_ns) as i64
    }
}

/// Shift a hub timestamp into the AP domain, saturating at the `u64` bounds.
pub fn apply_offset(hub_time_ns: u64, offset_ns: i64) -> u64 {
    let shifted = hub_time_ns as i128 + offset_ns as i128;
    shifted.clamp(0, u64::MAX as i128) as u64
}
