//! SinkHandle - one sink behind its own bounded queue and worker task
//!
//! The dispatcher never waits on a sink: a full queue drops the stamped
//! event and counts it, and a failing write only bumps the failure counter.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{ApSensorEvent, ContractError, EventSink};

use crate::metrics::SinkMetrics;

/// Handle to a running sink worker
pub struct SinkHandle {
    name: String,
    tx: mpsc::Sender<ApSensorEvent>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker task for `sink`
    pub fn spawn<S: EventSink + 'static>(sink: S, queue_capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let worker = SinkWorker {
            name: sink.name().to_string(),
            sink,
            rx,
            metrics: Arc::new(SinkMetrics::new()),
        };

        Self {
            name: worker.name.clone(),
            tx,
            metrics: Arc::clone(&worker.metrics),
            worker: tokio::spawn(worker.run()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Queue an event without waiting
    ///
    /// Returns false when the event was dropped.
    pub fn try_send(&self, event: ApSensorEvent) -> bool {
        let rejected = match self.tx.try_send(event) {
            Ok(()) => {
                self.metrics.set_queue_len(self.queued());
                return true;
            }
            Err(mpsc::error::TrySendError::Full(event)) => event,
            Err(mpsc::error::TrySendError::Closed(event)) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                event
            }
        };

        self.metrics.inc_dropped_count();
        warn!(
            sink = %self.name,
            sensor_id = %rejected.sensor_id,
            hub_time = rejected.hub_time_ns,
            calibrated = rejected.calibrated,
            "Stamped event dropped"
        );
        false
    }

    /// Drain the queue, then flush and close the sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
    }

    fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// Owns the sink for the lifetime of its task
struct SinkWorker<S> {
    name: String,
    sink: S,
    rx: mpsc::Receiver<ApSensorEvent>,
    metrics: Arc<SinkMetrics>,
}

impl<S: EventSink> SinkWorker<S> {
    #[instrument(name = "sink_worker_loop", skip(self), fields(sink = %self.name))]
    async fn run(mut self) {
        debug!("Sink worker started");

        while let Some(event) = self.rx.recv().await {
            self.metrics.set_queue_len(self.rx.len());
            let result = self.sink.write(&event).await;
            self.record(&event, result);
        }

        if let Err(e) = self.sink.flush().await {
            error!(sink = %self.name, error = %e, "Flush failed on shutdown");
        }
        if let Err(e) = self.sink.close().await {
            error!(sink = %self.name, error = %e, "Close failed on shutdown");
        }
        debug!(written = self.metrics.write_count(), "Sink worker stopped");
    }

    fn record(&self, event: &ApSensorEvent, result: Result<(), ContractError>) {
        observability::metrics::record_event_dispatched(&self.name, result.is_ok());
        match result {
            Ok(()) => self.metrics.inc_write_count(),
            Err(e) => {
                self.metrics.inc_failure_count();
                error!(
                    sink = %self.name,
                    sensor_id = %event.sensor_id,
                    error = %e,
                    "Write failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    /// Keeps what it was given; rejects uncalibrated events when `strict`
    #[derive(Default)]
    struct RecordingSink {
        written: Arc<Mutex<Vec<u64>>>,
        closes: Arc<AtomicU64>,
        gate: Option<Arc<Semaphore>>,
        strict: bool,
    }

    impl EventSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn write(&mut self, event: &ApSensorEvent) -> Result<(), ContractError> {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.strict && !event.calibrated {
                return Err(ContractError::sink_write("recording", "uncalibrated"));
            }
            self.written.lock().unwrap().push(event.hub_time_ns);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.closes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn stamped(hub_time_ns: u64, calibrated: bool) -> ApSensorEvent {
        let delta_ns = if calibrated { 2_000 } else { 0 };
        ApSensorEvent {
            sensor_id: "gyro".to_string(),
            hub_time_ns,
            ap_time_ns: hub_time_ns + delta_ns,
            delta_ns: delta_ns as i64,
            calibrated,
            values: vec![0.1, 0.2, 0.3],
        }
    }

    #[tokio::test]
    async fn test_shutdown_drains_in_order_and_closes_once() {
        let sink = RecordingSink::default();
        let written = Arc::clone(&sink.written);
        let closes = Arc::clone(&sink.closes);

        let handle = SinkHandle::spawn(sink, 8);
        let metrics = Arc::clone(handle.metrics());
        for hub_time in [300, 100, 200] {
            assert!(handle.try_send(stamped(hub_time, true)));
        }
        handle.shutdown().await;

        // Arrival order, not hub time order
        assert_eq!(*written.lock().unwrap(), vec![300, 100, 200]);
        assert_eq!(closes.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.snapshot().write_count, 3);
    }

    #[tokio::test]
    async fn test_blocked_sink_drops_overflow() {
        let gate = Arc::new(Semaphore::new(0));
        let sink = RecordingSink {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        };

        let handle = SinkHandle::spawn(sink, 2);
        let metrics = Arc::clone(handle.metrics());
        let accepted = (0..10)
            .filter(|&i| handle.try_send(stamped(i, true)))
            .count() as u64;

        // Two queued plus at most one held by the blocked worker
        assert!((2..=3).contains(&accepted), "accepted {accepted}");
        assert_eq!(metrics.dropped_count(), 10 - accepted);

        gate.add_permits(10);
        handle.shutdown().await;
        assert_eq!(metrics.write_count(), accepted);
        assert_eq!(metrics.snapshot().offered(), 10);
    }

    #[tokio::test]
    async fn test_failed_writes_do_not_stop_worker() {
        let sink = RecordingSink {
            strict: true,
            ..Default::default()
        };
        let written = Arc::clone(&sink.written);

        let handle = SinkHandle::spawn(sink, 8);
        let metrics = Arc::clone(handle.metrics());
        for (hub_time, calibrated) in [(1, false), (2, true), (3, false), (4, true), (5, true)] {
            assert!(handle.try_send(stamped(hub_time, calibrated)));
        }
        handle.shutdown().await;

        assert_eq!(metrics.failure_count(), 2);
        assert_eq!(metrics.write_count(), 3);
        assert_eq!(*written.lock().unwrap(), vec![2, 4, 5]);
    }
}
