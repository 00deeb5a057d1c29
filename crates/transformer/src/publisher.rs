//! TransformPublisher - send locally authored transforms to peers.

use std::sync::Arc;

use contracts::{Communicator, FrameId, FrameTransform, Quat, TransformError, Vec3};
use tracing::{instrument, trace};

/// Publishing half of a transformer instance
///
/// Transforms go out through the communicator; whether the local core sees
/// them again is the transport's loopback behavior (the in-process bus
/// loops back, so a process always observes its own authored transforms).
#[derive(Clone)]
pub struct TransformPublisher {
    comm: Arc<dyn Communicator>,
    authority: String,
}

impl TransformPublisher {
    pub(crate) fn new(comm: Arc<dyn Communicator>, authority: String) -> Self {
        Self { comm, authority }
    }

    /// Authority name stamped on this publisher's log lines.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Publish a transform record to all peers.
    #[instrument(
        level = "debug",
        name = "publisher_send",
        skip(self, transform),
        fields(
            authority = %self.authority,
            child = %transform.child_frame,
            parent = %transform.parent_frame,
            time = transform.time
        )
    )]
    pub fn send_transform(&self, transform: &FrameTransform) -> Result<(), TransformError> {
        trace!("publishing transform");
        self.comm.publish(transform)
    }

    /// Convenience wrapper building the record in place.
    pub fn send(
        &self,
        child_frame: impl Into<FrameId>,
        parent_frame: impl Into<FrameId>,
        time: u64,
        translation: Vec3,
        rotation: Quat,
    ) -> Result<(), TransformError> {
        self.send_transform(&FrameTransform {
            child_frame: child_frame.into(),
            parent_frame: parent_frame.into(),
            time,
            translation,
            rotation,
        })
    }
}
