//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the AP-Hub time sync
//! workspace. Business crates depend on this crate only; reverse dependencies
//! are prohibited.
//!
//! ## Time Model
//! - Both clocks are free-running monotonic nanosecond counters (`u64`)
//! - The AP clock is the reference domain; the hub clock is the peer domain
//! - Offsets are always expressed as `ap - hub` (`i64` nanoseconds)

mod blueprint;
mod error;
mod event;
mod sink;
mod sync;
mod sync_config;
mod time;

pub use blueprint::*;
pub use error::*;
pub use event::*;
pub use sink::*;
pub use sync::*;
pub use sync_config::*;
pub use time::*;
