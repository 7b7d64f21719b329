//! # Ingestion
//!
//! Hub event sources for the sync engine.
//!
//! Responsibilities:
//! - Generate synthetic mailbox traffic (`MockTimeline` / `MockHubSource`)
//! - Replay recorded JSONL traces (`TraceReplaySource`)
//! - Record event streams back to JSONL (`TraceWriter`)
//! - Deliver events downstream over a bounded tokio channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::MockHubSource;
//! use contracts::MockSourceConfig;
//!
//! let source = MockHubSource::new(MockSourceConfig::default());
//! let mut rx = source.start(100, None);
//! while let Some(event) = rx.recv().await {
//!     engine.handle(event);
//! }
//! ```
//!
//! ## Replay
//!
//! ```ignore
//! use ingestion::TraceReplaySource;
//!
//! let source = TraceReplaySource::load("trace.jsonl")?;
//! let rx = source.start(100);
//! ```

mod config;
mod error;
mod mock;
mod replay;

// Re-exports
pub use config::{IngestionMetrics, MetricsSnapshot};
pub use contracts::HubEvent;
pub use error::{IngestionError, Result};
pub use mock::{MockHubSource, MockTimeline, TimedEvent};
pub use replay::{TraceReplaySource, TraceWriter};
