//! # Transformer
//!
//! Public facade over the transform core.
//!
//! Responsibilities:
//! - `TransformReceiver`: the query surface (lookups, feasibility checks,
//!   asynchronous requests)
//! - `TransformPublisher`: send locally authored transforms to peers
//! - `TransformerFactory`: wire a core to a communicator and hand out
//!   connected receiver/publisher pairs
//!
//! A receiver should be long-lived: it caches the known frame tree
//! including its history, and rebuilding that cache from the network is
//! overhead better paid once.

mod factory;
mod publisher;
mod receiver;

pub use factory::TransformerFactory;
pub use publisher::TransformPublisher;
pub use receiver::TransformReceiver;

pub use contracts::{
    Communicator, FrameId, FrameTransform, Quat, TransformError, TransformerConfig, Vec3,
    TIME_LATEST,
};
pub use transform_core::PendingTransform;
