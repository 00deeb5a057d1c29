//! Request scheduler - asynchronous lookups that wait for data.
//!
//! A request is attempted immediately; if the graph cannot satisfy it yet,
//! it parks in a pending set until either an ingest wake lets it resolve,
//! its deadline passes, or the core shuts down. The worker task owns all
//! re-resolution work; the ingest path only flips a notify flag.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use contracts::{FrameId, FrameTransform, TransformError};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace};

use crate::resolver::Resolver;

/// Handle to a deferred transform result
///
/// Completed exactly once: with the resolved transform, a timeout, or a
/// cancellation when the owning core shuts down. Await it, or poll it from
/// a `select!`.
pub struct PendingTransform {
    rx: oneshot::Receiver<Result<FrameTransform, TransformError>>,
}

impl PendingTransform {
    /// Wrap an already-known outcome in a completed handle.
    fn ready(result: Result<FrameTransform, TransformError>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { rx }
    }
}

impl Future for PendingTransform {
    type Output = Result<FrameTransform, TransformError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            // Sender dropped without completing: only possible if the
            // scheduler died mid-flight; report as cancellation.
            Poll::Ready(Err(_)) => Poll::Ready(Err(TransformError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// A parked request awaiting data
struct PendingRequest {
    target: FrameId,
    source: FrameId,
    time: u64,
    created: Instant,
    deadline: Instant,
    tx: oneshot::Sender<Result<FrameTransform, TransformError>>,
}

struct SchedulerShared {
    resolver: Resolver,
    pending: Mutex<HashMap<u64, PendingRequest>>,
    notify: Notify,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl SchedulerShared {
    /// Re-attempt every pending request; complete the ones that resolve.
    fn resolve_ready(&self) {
        let mut resolved: Vec<(u64, FrameTransform)> = Vec::new();
        {
            let pending = self.pending.lock().unwrap();
            for (id, request) in pending.iter() {
                if let Ok(transform) =
                    self.resolver
                        .resolve(&request.target, &request.source, request.time)
                {
                    resolved.push((*id, transform));
                }
            }
        }

        for (id, transform) in resolved {
            let request = { self.pending.lock().unwrap().remove(&id) };
            if let Some(request) = request {
                let waited = request.created.elapsed();
                trace!(
                    target_frame = %request.target,
                    source_frame = %request.source,
                    waited_ms = waited.as_millis() as u64,
                    "pending transform resolved"
                );
                metrics::counter!("framelink_requests_total", "outcome" => "resolved")
                    .increment(1);
                metrics::histogram!("framelink_request_wait_ms")
                    .record(waited.as_secs_f64() * 1000.0);
                let _ = request.tx.send(Ok(transform));
            }
        }
    }

    /// Complete every request whose deadline has passed with a timeout.
    fn expire_due(&self, now: Instant) {
        let expired: Vec<u64> = {
            let pending = self.pending.lock().unwrap();
            pending
                .iter()
                .filter(|(_, r)| r.deadline <= now)
                .map(|(id, _)| *id)
                .collect()
        };

        for id in expired {
            let request = { self.pending.lock().unwrap().remove(&id) };
            if let Some(request) = request {
                let waited_ms = request.created.elapsed().as_millis() as u64;
                debug!(
                    target_frame = %request.target,
                    source_frame = %request.source,
                    waited_ms,
                    "pending transform timed out"
                );
                metrics::counter!("framelink_requests_total", "outcome" => "timeout")
                    .increment(1);
                let _ = request
                    .tx
                    .send(Err(TransformError::RequestTimeout { waited_ms }));
            }
        }
    }

    fn earliest_deadline(&self) -> Option<Instant> {
        self.pending
            .lock()
            .unwrap()
            .values()
            .map(|r| r.deadline)
            .min()
    }

    /// Drain the pending set, completing everything with a cancellation.
    fn cancel_all(&self) {
        let drained: Vec<PendingRequest> = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain().map(|(_, r)| r).collect()
        };
        for request in drained {
            metrics::counter!("framelink_requests_total", "outcome" => "cancelled")
                .increment(1);
            let _ = request.tx.send(Err(TransformError::Cancelled));
        }
    }
}

/// Scheduler for asynchronous transform requests
///
/// Spawns a worker task on construction; must be created inside a tokio
/// runtime. Shutdown is synchronous and idempotent.
pub struct RequestScheduler {
    shared: Arc<SchedulerShared>,
    default_timeout: Duration,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RequestScheduler {
    /// Create the scheduler and spawn its worker task.
    pub fn spawn(resolver: Resolver, default_timeout: Duration) -> Self {
        let shared = Arc::new(SchedulerShared {
            resolver,
            pending: Mutex::new(HashMap::new()),
            notify: Notify::new(),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = tokio::spawn(async move {
            scheduler_worker(worker_shared).await;
        });

        Self {
            shared,
            default_timeout,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Register a request, attempting an immediate resolution first.
    ///
    /// Never fails synchronously; all outcomes arrive through the handle.
    #[instrument(
        level = "debug",
        name = "scheduler_request",
        skip(self),
        fields(target_frame = %target, source_frame = %source, time)
    )]
    pub fn request(&self, target: FrameId, source: FrameId, time: u64) -> PendingTransform {
        if self.shared.closed.load(Ordering::SeqCst) {
            return PendingTransform::ready(Err(TransformError::Cancelled));
        }

        // Fast path: already resolvable
        if let Ok(transform) = self.shared.resolver.resolve(&target, &source, time) {
            metrics::counter!("framelink_requests_total", "outcome" => "immediate")
                .increment(1);
            return PendingTransform::ready(Ok(transform));
        }

        let (tx, rx) = oneshot::channel();
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        let request = PendingRequest {
            target,
            source,
            time,
            created: now,
            deadline: now + self.default_timeout,
            tx,
        };

        self.shared.pending.lock().unwrap().insert(id, request);
        metrics::gauge!("framelink_pending_requests")
            .set(self.pending_count() as f64);
        // Wake the worker so it picks up the new deadline
        self.shared.notify.notify_one();

        PendingTransform { rx }
    }

    /// Signal that new samples were ingested; pending requests should be
    /// re-attempted. Never blocks beyond flipping the notify flag.
    #[inline]
    pub fn wake(&self) {
        self.shared.notify.notify_one();
    }

    /// Outstanding request count (diagnostics/tests).
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().unwrap().len()
    }

    /// Cancel all pending requests and stop the worker. Idempotent,
    /// callable from any thread, never blocks on the worker.
    pub fn shutdown(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.cancel_all();
        self.shared.notify.notify_one();
        // The worker exits on its own after seeing the closed flag; drop
        // the handle so shutdown stays synchronous.
        let _ = self.worker.lock().unwrap().take();
    }
}

impl Drop for RequestScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker loop: re-resolve on wakes, expire on deadlines, drain on close.
async fn scheduler_worker(shared: Arc<SchedulerShared>) {
    debug!("request scheduler worker started");

    loop {
        if shared.closed.load(Ordering::SeqCst) {
            shared.cancel_all();
            break;
        }

        shared.resolve_ready();
        shared.expire_due(Instant::now());
        metrics::gauge!("framelink_pending_requests")
            .set(shared.pending.lock().unwrap().len() as f64);

        match shared.earliest_deadline() {
            Some(deadline) => {
                tokio::select! {
                    _ = shared.notify.notified() => {}
                    _ = tokio::time::sleep_until(deadline.into()) => {}
                }
            }
            None => shared.notify.notified().await,
        }
    }

    debug!("request scheduler worker stopped");
}
