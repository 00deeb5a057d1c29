//! TransformerCore - one process-local transform resolution engine.
//!
//! Owns the frame graph, the resolver and the request scheduler. The
//! communicator ingestion callback is wired straight into
//! [`TransformerCore::ingest`]; query threads call the lookup surface.
//! Multiple cores in one process are fully independent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{
    FrameId, FrameTransform, TransformError, TransformSample, TransformerConfig, TIME_LATEST,
};
use tracing::{debug, info, instrument, warn};

use crate::graph::FrameGraph;
use crate::requests::{PendingTransform, RequestScheduler};
use crate::resolver::Resolver;

/// Transform resolution and synchronization engine
///
/// Construct inside a tokio runtime (the request scheduler spawns its
/// worker task on creation).
pub struct TransformerCore {
    graph: Arc<FrameGraph>,
    resolver: Resolver,
    scheduler: RequestScheduler,
    config: TransformerConfig,
    closed: AtomicBool,
}

impl TransformerCore {
    /// Create a new core with the given configuration.
    pub fn new(config: TransformerConfig) -> Arc<Self> {
        let graph = Arc::new(FrameGraph::new(
            config.buffer.cache_time_nanos(),
            config.buffer.max_samples,
        ));
        let resolver = Resolver::new(Arc::clone(&graph), config.extrapolation.clone());
        let scheduler =
            RequestScheduler::spawn(resolver.clone(), config.request.default_timeout());

        info!(
            cache_time_s = config.buffer.cache_time_s,
            max_samples = config.buffer.max_samples,
            policy = ?config.extrapolation.policy,
            "transformer core created"
        );

        Arc::new(Self {
            graph,
            resolver,
            scheduler,
            config,
            closed: AtomicBool::new(false),
        })
    }

    /// Ingest a transform record (remote arrival or local publish).
    ///
    /// Invalid or stale records are logged and dropped; ingestion errors
    /// never propagate to peers. On success the request scheduler is woken.
    #[instrument(
        level = "trace",
        name = "core_ingest",
        skip(self, transform),
        fields(child = %transform.child_frame, parent = %transform.parent_frame, time = transform.time)
    )]
    pub fn ingest(&self, transform: FrameTransform) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }

        if transform.child_frame == transform.parent_frame {
            warn!(frame = %transform.child_frame, "dropping self-parented transform");
            metrics::counter!("framelink_samples_rejected_total", "reason" => "self_parent")
                .increment(1);
            return;
        }
        if transform.time == TIME_LATEST {
            warn!(
                frame = %transform.child_frame,
                "dropping transform with reserved timestamp 0"
            );
            metrics::counter!("framelink_samples_rejected_total", "reason" => "zero_time")
                .increment(1);
            return;
        }

        let child = transform.child_frame.clone();
        let sample = TransformSample::from_transform(&transform);

        match self.graph.insert(&child, sample) {
            Ok(()) => {
                metrics::counter!("framelink_samples_ingested_total").increment(1);
                self.scheduler.wake();
            }
            Err(error) => {
                debug!(frame = %child, %error, "sample rejected by buffer");
                metrics::counter!("framelink_samples_rejected_total", "reason" => "stale")
                    .increment(1);
            }
        }
    }

    /// Look up the transform mapping `source` into `target` at `time`.
    pub fn lookup_transform(
        &self,
        target: &FrameId,
        source: &FrameId,
        time: u64,
    ) -> Result<FrameTransform, TransformError> {
        let result = self.resolver.resolve(target, source, time);
        Self::record_lookup(&result);
        result
    }

    /// Fixed-frame lookup: `source` at `source_time` related to `target` at
    /// `target_time` through `fixed_frame`.
    pub fn lookup_transform_fixed(
        &self,
        target: &FrameId,
        target_time: u64,
        source: &FrameId,
        source_time: u64,
        fixed_frame: &FrameId,
    ) -> Result<FrameTransform, TransformError> {
        let result =
            self.resolver
                .resolve_fixed(target, target_time, source, source_time, fixed_frame);
        Self::record_lookup(&result);
        result
    }

    /// Feasibility check for [`TransformerCore::lookup_transform`].
    pub fn can_transform(&self, target: &FrameId, source: &FrameId, time: u64) -> bool {
        self.resolver.can_resolve(target, source, time)
    }

    /// Feasibility check for [`TransformerCore::lookup_transform_fixed`].
    pub fn can_transform_fixed(
        &self,
        target: &FrameId,
        target_time: u64,
        source: &FrameId,
        source_time: u64,
        fixed_frame: &FrameId,
    ) -> bool {
        self.resolver
            .can_resolve_fixed(target, target_time, source, source_time, fixed_frame)
    }

    /// Asynchronous lookup; the handle completes when the transform becomes
    /// resolvable, the deadline passes, or the core shuts down.
    pub fn request_transform(
        &self,
        target: &FrameId,
        source: &FrameId,
        time: u64,
    ) -> PendingTransform {
        self.scheduler.request(target.clone(), source.clone(), time)
    }

    /// All known frame names.
    pub fn frames(&self) -> Vec<FrameId> {
        self.graph.frames()
    }

    /// Active configuration.
    pub fn config(&self) -> &TransformerConfig {
        &self.config
    }

    /// Outstanding asynchronous requests (diagnostics/tests).
    pub fn pending_requests(&self) -> usize {
        self.scheduler.pending_count()
    }

    /// Cancel pending work. Idempotent, callable from any thread.
    ///
    /// Ingestion becomes a no-op afterwards; synchronous lookups keep
    /// answering from whatever the buffers already hold.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("transformer core shutting down");
        self.scheduler.shutdown();
    }

    fn record_lookup(result: &Result<FrameTransform, TransformError>) {
        let status = match result {
            Ok(_) => "ok",
            Err(TransformError::FrameNotFound { .. }) => "frame_not_found",
            Err(TransformError::Disconnected { .. }) => "disconnected",
            Err(TransformError::TimeOutOfRange { .. }) => "time_out_of_range",
            Err(_) => "error",
        };
        metrics::counter!("framelink_lookups_total", "status" => status).increment(1);
    }
}
