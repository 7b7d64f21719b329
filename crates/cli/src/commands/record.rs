//! `record` command implementation.

use anyhow::{Context, Result};
use contracts::SourceConfig;
use ingestion::{MockTimeline, TraceWriter};
use tracing::info;

use crate::cli::RecordArgs;
use crate::error::CliError;

/// Execute the `record` command
pub fn run_record(args: &RecordArgs) -> Result<()> {
    let blueprint = super::load_blueprint(&args.config)?;
    let kind = blueprint.source.kind();

    let SourceConfig::Mock(mock) = blueprint.source else {
        return Err(CliError::UnsupportedSource {
            command: "record",
            kind,
        }
        .into());
    };

    let written = record_timeline(MockTimeline::new(mock), args)?;
    info!(events = written, output = %args.output.display(), "Trace recorded");
    println!("Recorded {} events to {}", written, args.output.display());
    Ok(())
}

fn record_timeline(timeline: MockTimeline, args: &RecordArgs) -> Result<u64> {
    let mut writer = TraceWriter::create(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let limit = if args.limit == 0 {
        usize::MAX
    } else {
        args.limit
    };
    for event in timeline.take(limit) {
        writer.write(&event)?;
    }
    writer.flush()?;

    Ok(writer.written())
}
