//! Demo pipeline - publisher and receiver over the in-process bus.

mod orchestrator;
mod stats;

pub use orchestrator::{Pipeline, PipelineConfig};
pub use stats::PipelineStats;
