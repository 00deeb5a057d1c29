//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Timestamps are `u64` nanoseconds on an agreed monotonic clock
//! - The value `0` (`TIME_LATEST`) is reserved to mean "newest available sample"

mod communicator;
mod config;
mod error;
mod frame_id;
mod geometry;
mod time;

pub use communicator::{Communicator, SampleCallback};
pub use config::*;
pub use error::*;
pub use frame_id::FrameId;
pub use geometry::*;
pub use time::*;
