//! TransformReceiver - the central query facade.

use std::sync::Arc;

use contracts::{Communicator, FrameId, FrameTransform, TransformError, TransformerConfig};
use tracing::instrument;
use transform_core::{PendingTransform, TransformerCore};

/// Query surface over one transformer core
///
/// Cheap to clone; clones share the same core and communicator. Any
/// receiving code should keep one instance alive for as long as queries
/// are planned, so the frame history cache stays warm.
#[derive(Clone)]
pub struct TransformReceiver {
    core: Arc<TransformerCore>,
    comm: Arc<dyn Communicator>,
}

impl TransformReceiver {
    pub(crate) fn new(core: Arc<TransformerCore>, comm: Arc<dyn Communicator>) -> Self {
        Self { core, comm }
    }

    /// Get the transform between two frames.
    ///
    /// `time` is the instant at which the transform is desired; `0` returns
    /// the latest available. Fails fast on connectivity or time-range
    /// errors; never blocks on the network.
    pub fn lookup_transform(
        &self,
        target_frame: &FrameId,
        source_frame: &FrameId,
        time: u64,
    ) -> Result<FrameTransform, TransformError> {
        self.core.lookup_transform(target_frame, source_frame, time)
    }

    /// Get the transform between two frames evaluated at two different
    /// times, assuming `fixed_frame` does not move over the interval.
    pub fn lookup_transform_fixed(
        &self,
        target_frame: &FrameId,
        target_time: u64,
        source_frame: &FrameId,
        source_time: u64,
        fixed_frame: &FrameId,
    ) -> Result<FrameTransform, TransformError> {
        self.core.lookup_transform_fixed(
            target_frame,
            target_time,
            source_frame,
            source_time,
            fixed_frame,
        )
    }

    /// Request a transform that may not be resolvable yet.
    ///
    /// Never fails synchronously; the handle completes with the transform,
    /// a timeout, or a cancellation on shutdown.
    pub fn request_transform(
        &self,
        target_frame: &FrameId,
        source_frame: &FrameId,
        time: u64,
    ) -> PendingTransform {
        self.core.request_transform(target_frame, source_frame, time)
    }

    /// Test whether a transform is possible. Never fails; every error
    /// condition collapses into `false`.
    pub fn can_transform(&self, target_frame: &FrameId, source_frame: &FrameId, time: u64) -> bool {
        self.core.can_transform(target_frame, source_frame, time)
    }

    /// Fixed-frame variant of [`TransformReceiver::can_transform`].
    pub fn can_transform_fixed(
        &self,
        target_frame: &FrameId,
        target_time: u64,
        source_frame: &FrameId,
        source_time: u64,
        fixed_frame: &FrameId,
    ) -> bool {
        self.core.can_transform_fixed(
            target_frame,
            target_time,
            source_frame,
            source_time,
            fixed_frame,
        )
    }

    /// All frame names currently known to this core.
    pub fn frames(&self) -> Vec<FrameId> {
        self.core.frames()
    }

    /// Active configuration.
    pub fn config(&self) -> &TransformerConfig {
        self.core.config()
    }

    /// Cancel pending requests and release the communicator.
    ///
    /// Idempotent and callable from any thread. Pending requests are
    /// drained before transport resources are released.
    #[instrument(name = "receiver_shutdown", skip(self))]
    pub fn shutdown(&self) {
        self.core.shutdown();
        self.comm.shutdown();
    }
}
