//! Pipeline orchestrator - coordinates all components.
//!
//! source task -> engine loop -> dispatcher -> sink workers, all joined by
//! bounded channels. The engine loop owns the estimator, so its state can be
//! persisted once the loop ends, however it ends.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{ApSensorEvent, HubEvent, HubSyncBlueprint, SourceConfig};
use ingestion::{IngestionMetrics, MockHubSource, TraceReplaySource};
use sync_engine::HubSyncEngine;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::state;
use super::PipelineStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blueprint: HubSyncBlueprint,

    /// Maximum number of stamped events (None = unlimited)
    pub max_events: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Speed factor for synthetic sources (None = unpaced)
    pub pace: Option<f64>,

    /// Estimator snapshot location
    pub state_file: Option<PathBuf>,
}

/// Running event source
enum ActiveSource {
    Mock(MockHubSource),
    Replay(TraceReplaySource),
}

impl ActiveSource {
    fn start(config: &PipelineConfig) -> Result<(Self, mpsc::Receiver<HubEvent>)> {
        match &config.blueprint.source {
            SourceConfig::Mock(mock) => {
                info!(
                    true_offset_ns = mock.true_offset_ns,
                    drift_ppb = mock.drift_ppb,
                    max_latency_ns = mock.max_latency_ns,
                    sensors = mock.sensors.len(),
                    "Running with MOCK source"
                );
                let source = MockHubSource::new(mock.clone());
                let rx = source.start(config.buffer_size, config.pace);
                Ok((Self::Mock(source), rx))
            }
            SourceConfig::Replay(replay) => {
                info!(path = %replay.path.display(), "Running in REPLAY mode");
                let source = TraceReplaySource::load(&replay.path)
                    .with_context(|| format!("Failed to load trace {}", replay.path.display()))?;
                let rx = source.start(config.buffer_size);
                Ok((Self::Replay(source), rx))
            }
        }
    }

    fn stop(&self) {
        if let Self::Mock(source) = self {
            source.stop();
        }
    }

    fn metrics(&self) -> Arc<IngestionMetrics> {
        match self {
            Self::Mock(source) => source.metrics(),
            Self::Replay(source) => source.metrics(),
        }
    }
}

enum Next {
    Event(HubEvent),
    Closed,
    TimedOut,
}

async fn next_event(
    rx: &mut mpsc::Receiver<HubEvent>,
    deadline: Option<tokio::time::Instant>,
) -> Next {
    let received = match deadline {
        Some(deadline) => match tokio::time::timeout_at(deadline, rx.recv()).await {
            Ok(received) => received,
            Err(_) => return Next::TimedOut,
        },
        None => rx.recv().await,
    };
    received.map_or(Next::Closed, Next::Event)
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the source is exhausted, a limit is hit or `shutdown` resolves
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Sync engine, resumed from the state file when present
        let estimator =
            state::load_estimator(self.config.state_file.as_deref(), blueprint.sync)?;
        let mut engine = HubSyncEngine::with_estimator(estimator);
        info!(
            window_timeout_ns = blueprint.sync.window_timeout_ns,
            filter_a = blueprint.sync.filter_a,
            filter_b = blueprint.sync.filter_b,
            phase = %engine.phase(),
            "Sync engine configured"
        );

        // Dispatcher
        let (ap_tx, ap_rx) = mpsc::channel::<ApSensorEvent>(self.config.buffer_size);
        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - stamped events will be dropped");
        }
        let dispatcher = dispatcher::create_dispatcher(blueprint.sinks.clone(), ap_rx)
            .await
            .context("Failed to create dispatcher")?;
        let dispatcher_handle = dispatcher.spawn();
        info!(active_sinks = blueprint.sinks.len(), "Dispatcher started");

        // Source
        let (source, mut hub_rx) = ActiveSource::start(&self.config)?;

        let max_events = self.config.max_events;
        let deadline = self
            .config
            .timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);
        info!(max_events = ?max_events, timeout = ?self.config.timeout, "Pipeline running");

        let mut stats = PipelineStats::default();
        tokio::pin!(shutdown);

        loop {
            let next = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping pipeline...");
                    stats.interrupted = true;
                    break;
                }
                next = next_event(&mut hub_rx, deadline) => next,
            };

            let event = match next {
                Next::Event(event) => event,
                Next::Closed => {
                    debug!("Source exhausted");
                    break;
                }
                Next::TimedOut => {
                    warn!(timeout = ?self.config.timeout, "Pipeline timed out");
                    stats.timed_out = true;
                    break;
                }
            };
            stats.events_received += 1;

            let stamped = match event {
                HubEvent::TimeSync(pair) => {
                    let outcome = engine.on_time_sync(pair);
                    stats.sync_metrics.update(pair.offset(), outcome);
                    None
                }
                other => engine.handle(other),
            };

            let Some(stamped) = stamped else {
                continue;
            };

            stats.sync_metrics.record_sensor(&stamped.sensor_id);
            if ap_tx.send(stamped).await.is_err() {
                warn!("Dispatcher channel closed");
                break;
            }
            stats.events_stamped += 1;

            if let Some(max) = max_events {
                if stats.events_stamped >= max {
                    info!(events = stats.events_stamped, "Reached max events limit");
                    break;
                }
            }
        }

        // Shutdown
        info!("Shutting down pipeline...");
        source.stop();
        drop(hub_rx);
        drop(ap_tx);

        match tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await {
            Ok(Ok(sinks)) => stats.sinks = sinks,
            Ok(Err(e)) => warn!(error = %e, "Dispatcher task failed"),
            Err(_) => warn!("Dispatcher did not drain within 5s"),
        }

        if let Some(path) = &self.config.state_file {
            state::save_snapshot(path, &engine.snapshot())?;
        }

        let ingest = source.metrics().snapshot();
        stats.engine = engine.stats();
        stats.final_delta_ns = engine.current_delta();
        stats.final_phase = engine.phase();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            events = stats.events_received,
            ingested = ingest.events_received,
            delta = stats.final_delta_ns,
            phase = %stats.final_phase,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}
