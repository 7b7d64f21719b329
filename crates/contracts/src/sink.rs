//! EventSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for sinks receiving AP-stamped events.

use crate::{ApSensorEvent, ContractError};

/// Event output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(EventSink: Send)]
pub trait LocalEventSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one AP-stamped event
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, event: &ApSensorEvent) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
