//! # Dispatcher
//!
//! Output fan-out for AP-stamped sensor events.
//!
//! Responsibilities:
//! - Consume `ApSensorEvent`s produced by the sync engine
//! - Fan out to every configured sink
//! - Isolate slow or failing sinks so the engine never blocks

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{ApSensorEvent, EventSink};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder, DispatcherConfig};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{FileSink, FileSinkConfig, LogSink};
