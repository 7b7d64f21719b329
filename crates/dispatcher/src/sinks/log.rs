//! LogSink - logs AP-stamped events via tracing

use contracts::{ApSensorEvent, ContractError, EventSink};
use tracing::{info, instrument};

/// Sink that logs every event, for debugging
pub struct LogSink {
    name: String,
    logged: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logged: 0,
        }
    }
}

impl EventSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, event),
        fields(sink = %self.name, sensor_id = %event.sensor_id)
    )]
    async fn write(&mut self, event: &ApSensorEvent) -> Result<(), ContractError> {
        self.logged += 1;
        info!(
            sink = %self.name,
            sensor_id = %event.sensor_id,
            hub_time = event.hub_time_ns,
            ap_time = event.ap_time_ns,
            delta = event.delta_ns,
            calibrated = event.calibrated,
            "ApSensorEvent"
        );
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, events = self.logged, "LogSink closed");
        Ok(())
    }
}
