//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{HubSyncBlueprint, SourceConfig};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let blueprint = super::load_blueprint(&args.config)?;

    info!(
        source = blueprint.source.kind(),
        sinks = blueprint.sinks.len(),
        window_timeout_ns = blueprint.sync.window_timeout_ns,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = build_pipeline_config(blueprint, args);
    let pipeline = Pipeline::new(pipeline_config);

    info!("Starting pipeline...");

    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        events = stats.events_received,
        stamped = stats.events_stamped,
        duration_secs = stats.duration.as_secs_f64(),
        events_per_sec = format!("{:.2}", stats.events_per_sec()),
        delta_ns = stats.final_delta_ns,
        "Pipeline completed"
    );
    stats.print_summary();

    info!("AP-Hub sync finished");
    Ok(())
}

/// Apply CLI overrides; `0` disables a limit
fn build_pipeline_config(blueprint: HubSyncBlueprint, args: &RunArgs) -> PipelineConfig {
    let metrics_port = args.metrics_port.or(blueprint.observability.metrics_port);

    PipelineConfig {
        blueprint,
        max_events: (args.max_events > 0).then_some(args.max_events),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size.max(1),
        metrics_port,
        pace: (args.pace > 0.0).then_some(args.pace),
        state_file: args.state_file.clone(),
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &HubSyncBlueprint) {
    println!("\n=== Configuration Summary ===\n");

    match &blueprint.source {
        SourceConfig::Mock(mock) => {
            println!("Source: mock");
            println!("  Duration: {} ns", mock.duration_ns);
            println!("  Pair interval: {} ns", mock.sync_interval_ns);
            println!("  True offset: {} ns", mock.true_offset_ns);
            println!("  Sensors: {}", blueprint.sensor_ids().join(", "));
        }
        SourceConfig::Replay(replay) => {
            println!("Source: replay");
            println!("  Trace: {}", replay.path.display());
        }
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?})", sink.name, sink.sink_type);
        }
    }

    println!("\nSync Settings:");
    println!("  Window timeout: {} ns", blueprint.sync.window_timeout_ns);
    println!(
        "  Filter: A={} B={}",
        blueprint.sync.filter_a, blueprint.sync.filter_b
    );
    println!("  Expiration: {} ns", blueprint.sync.expiration_ns);

    println!();
}
