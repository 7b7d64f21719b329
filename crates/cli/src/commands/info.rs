//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{HubSyncBlueprint, SourceConfig, SyncConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo<'a> {
    version: String,
    sync: &'a SyncConfig,
    source: &'a SourceConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
    log_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_port: Option<u16>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = super::load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info<'a>(blueprint: &'a HubSyncBlueprint, args: &InfoArgs) -> ConfigInfo<'a> {
    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        sync: &blueprint.sync,
        source: &blueprint.source,
        sinks,
        log_format: format!("{:?}", blueprint.observability.log_format),
        metrics_port: blueprint.observability.metrics_port,
    }
}

fn ns_as_ms(ns: u64) -> f64 {
    ns as f64 / 1_000_000.0
}

fn print_config_info(blueprint: &HubSyncBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 AP-Hub Sync Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let sync = &blueprint.sync;
    println!("⏱  Estimator");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Window: {:.1} ms", ns_as_ms(sync.window_timeout_ns));
    println!(
        "   ├─ Filter: est = ({b}-{a})/{b} * est + {a}/{b} * max",
        a = sync.filter_a,
        b = sync.filter_b
    );
    println!("   └─ Expiration: {:.1} s", ns_as_ms(sync.expiration_ns) / 1000.0);

    println!("\n📡 Source ({})", blueprint.source.kind());
    match &blueprint.source {
        SourceConfig::Mock(mock) => {
            println!("   ├─ Duration: {:.1} s", ns_as_ms(mock.duration_ns) / 1000.0);
            println!("   ├─ Sync interval: {:.1} ms", ns_as_ms(mock.sync_interval_ns));
            println!("   ├─ True offset: {} ns", mock.true_offset_ns);
            println!("   ├─ Drift: {} ppb", mock.drift_ppb);
            println!("   ├─ Max latency: {} ns", mock.max_latency_ns);
            if let Some(jump) = mock.jump {
                println!(
                    "   ├─ Hub jump: {} ns at {:.1} ms",
                    jump.hub_step_ns,
                    ns_as_ms(jump.at_ns)
                );
            }
            if let Some(sleep) = mock.ap_sleep {
                println!(
                    "   ├─ AP sleep: {:.1} ms for {:.1} ms",
                    ns_as_ms(sleep.at_ns),
                    ns_as_ms(sleep.duration_ns)
                );
            }
            println!("   └─ Sensors ({}):", mock.sensors.len());
            for (i, sensor) in mock.sensors.iter().enumerate() {
                let prefix = if i == mock.sensors.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                println!("      {} {} ({} Hz)", prefix, sensor.id, sensor.rate_hz);
            }
        }
        SourceConfig::Replay(replay) => {
            println!("   └─ Trace: {}", replay.path.display());
        }
    }

    if args.sinks && !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({:?}, queue {})",
                prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
        }
    } else {
        println!("\n📤 Sinks: {}", blueprint.sinks.len());
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MockSourceConfig;
    use std::path::PathBuf;

    #[test]
    fn test_info_json_contains_sync_and_source() {
        let blueprint = HubSyncBlueprint::with_mock_source(MockSourceConfig::default());
        let args = InfoArgs {
            config: PathBuf::from("unused.toml"),
            json: true,
            sinks: true,
        };

        let info = build_config_info(&blueprint, &args);
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["sync"]["filter_b"], 8);
        assert_eq!(json["source"]["kind"], "mock");
        assert_eq!(json["sinks"][0]["name"], "log");
    }
}
