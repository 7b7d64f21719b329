//! Pipeline orchestration module.

mod orchestrator;
mod state;
mod stats;

pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::PipelineStats;
