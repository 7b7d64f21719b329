//! JSONL trace replay and recording
//!
//! A trace holds one `HubEvent` per line. Blank lines and lines starting
//! with `#` are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use contracts::HubEvent;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::IngestionMetrics;
use crate::error::{IngestionError, Result};

/// Recorded trace, fully loaded in memory
#[derive(Debug, Clone)]
pub struct TraceReplaySource {
    events: Vec<HubEvent>,
    metrics: Arc<IngestionMetrics>,
}

impl TraceReplaySource {
    /// Load a trace file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| IngestionError::io(path, e))?;
        let source = Self::from_reader(BufReader::new(file))?;
        info!(path = %path.display(), events = source.len(), "trace loaded");
        Ok(source)
    }

    /// Parse a trace from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let metrics = Arc::new(IngestionMetrics::new());
        let mut events = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|e| IngestionError::ParseFailed {
                line: line_no,
                message: e.to_string(),
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let event = serde_json::from_str::<HubEvent>(trimmed).map_err(|e| {
                metrics.record_parse_error();
                IngestionError::ParseFailed {
                    line: line_no,
                    message: e.to_string(),
                }
            })?;
            events.push(event);
        }

        Ok(Self { events, metrics })
    }

    pub fn events(&self) -> &[HubEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Stream the trace over a bounded channel
    pub fn start(&self, channel_capacity: usize) -> mpsc::Receiver<HubEvent> {
        let (tx, rx) = mpsc::channel(channel_capacity);
        let events = self.events.clone();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            let total = events.len();
            for event in events {
                let kind = event.kind();
                if tx.send(event).await.is_err() {
                    metrics.record_dropped();
                    debug!("replay channel closed");
                    return;
                }
                metrics.record_received(kind);
            }
            debug!(events = total, "trace replay finished");
        });

        rx
    }
}

/// Writes hub events as JSONL
pub struct TraceWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl TraceWriter {
    /// Create (or truncate) a trace file
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| IngestionError::io(&path, e))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn write(&mut self, event: &HubEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        writeln!(self.writer, "{line}").map_err(|e| IngestionError::io(&self.path, e))?;
        self.written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| IngestionError::io(&self.path, e))
    }

    /// Events written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
