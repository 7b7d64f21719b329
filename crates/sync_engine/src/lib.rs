//! # Sync Engine
//!
//! AP-Hub time synchronization.
//!
//! Responsibilities:
//! - Estimate the `ap - hub` clock offset from mailbox time pairs
//! - Reject clock glitches and re-anchor after sustained ones
//! - Reset anomaly tracking when the AP announces sleep
//! - Re-stamp hub sensor events into the AP clock domain
//!
//! ## Usage Example
//!
//! ```ignore
//! use sync_engine::{HubSyncEngine, SyncConfig};
//!
//! let mut engine = HubSyncEngine::new(SyncConfig::default());
//!
//! // Push events as they arrive from the mailbox / local sensors
//! if let Some(event) = engine.handle(hub_event) {
//!     // Forward the AP-stamped event
//! }
//! ```

mod engine;
mod estimator;
mod shared;

pub use engine::{EngineStats, HubSyncEngine};
pub use estimator::ApHubSync;
pub use shared::SharedApHubSync;

// Re-export contracts types
pub use contracts::{
    ApSensorEvent, HubEvent, SampleOutcome, SyncConfig, SyncPhase, SyncSnapshot, INVALID_DELTA,
};
