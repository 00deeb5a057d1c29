//! Communicator trait - transform transport abstraction
//!
//! Defines the boundary between the transform core and whatever carries
//! transform records between processes. The core depends only on this
//! trait; in-process, in-memory and networked transports are all
//! substitutable behind it.

use std::sync::Arc;

use crate::{FrameTransform, TransformError};

/// Ingestion callback type
///
/// A transport invokes this callback for every transform record received
/// from a peer. Uses `Arc` so the same callback can be shared across
/// receive contexts. The callback must be cheap: the core wires it to a
/// buffer insertion plus a scheduler wake, nothing more.
pub type SampleCallback = Arc<dyn Fn(FrameTransform) + Send + Sync>;

/// Transform transport trait
///
/// Implementations own all transport resources (sockets, channels,
/// background tasks). The core holds exactly one communicator and never
/// reaches around this interface.
pub trait Communicator: Send + Sync {
    /// Transport name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Begin receiving from peers.
    ///
    /// Must be called after [`Communicator::listen`] so early arrivals are
    /// not dropped. Calling `start` twice is an error the implementation
    /// may report or ignore.
    fn start(&self) -> Result<(), TransformError>;

    /// Register the ingestion callback.
    ///
    /// Repeated calls replace the previous callback.
    fn listen(&self, callback: SampleCallback);

    /// Send a locally authored transform to all peers.
    fn publish(&self, transform: &FrameTransform) -> Result<(), TransformError>;

    /// Release all transport resources.
    ///
    /// Synchronous from the caller's point of view: returns only after
    /// resources are released and any in-flight receive operation has been
    /// unblocked. Safe to call more than once.
    fn shutdown(&self);
}
