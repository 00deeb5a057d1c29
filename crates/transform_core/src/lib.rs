//! # Transform Core
//!
//! Transform resolution and synchronization engine.
//!
//! Responsibilities:
//! - Time-indexed per-frame history buffers with interpolation and
//!   configurable extrapolation
//! - Frame-graph path resolution (direct, fixed-frame, feasibility check)
//! - Asynchronous requests that wait for late-arriving data
//!
//! ## Usage example
//!
//! ```ignore
//! use transform_core::TransformerCore;
//! use contracts::TransformerConfig;
//!
//! let core = TransformerCore::new(TransformerConfig::default());
//!
//! // Wire a communicator's ingestion callback to `core.ingest`, then:
//! let transform = core.lookup_transform(&"map".into(), &"base".into(), 0)?;
//! ```

mod buffer;
mod core;
mod graph;
mod interp;
mod requests;
mod resolver;

pub use crate::core::TransformerCore;
pub use buffer::{FrameHistory, SampleMiss};
pub use graph::FrameGraph;
pub use requests::{PendingTransform, RequestScheduler};
pub use resolver::Resolver;

// Re-export contracts types callers need alongside the core
pub use contracts::{
    ExtrapolationPolicy, FrameId, FrameTransform, TransformError, TransformSample,
    TransformerConfig, TIME_LATEST,
};
