//! In-process transform bus
//!
//! Connects any number of communicator endpoints inside one process
//! through a bounded channel plus a fan-out task. Every published
//! transform is delivered to every started endpoint's ingestion callback,
//! the publisher's own included, mirroring how a loopback-enabled pub/sub
//! transport behaves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use contracts::{Communicator, FrameTransform, SampleCallback, TransformError};
use tracing::{debug, trace, warn};

struct BusInner {
    tx: async_channel::Sender<FrameTransform>,
    endpoints: Mutex<HashMap<usize, SampleCallback>>,
    next_id: AtomicUsize,
    closed: AtomicBool,
}

impl BusInner {
    fn unregister(&self, id: usize) {
        let remaining = {
            let mut endpoints = self.endpoints.lock().unwrap();
            endpoints.remove(&id);
            endpoints.len()
        };
        // Last endpoint gone: close the channel so the fan-out task exits
        // and any in-flight send is unblocked.
        if remaining == 0 {
            self.closed.store(true, Ordering::SeqCst);
            self.tx.close();
        }
    }
}

/// Shared in-process transform bus
///
/// Cheap to clone. Create one bus, then hand an endpoint to each
/// transformer instance that should see the others' transforms.
#[derive(Clone)]
pub struct InProcessBus {
    inner: Arc<BusInner>,
}

impl InProcessBus {
    /// Create a bus with the given channel capacity and spawn its fan-out
    /// task. Must be called inside a tokio runtime.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity.max(1));
        let inner = Arc::new(BusInner {
            tx,
            endpoints: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
            closed: AtomicBool::new(false),
        });

        let fan_out_inner = Arc::clone(&inner);
        tokio::spawn(async move {
            fan_out(rx, fan_out_inner).await;
        });

        Self { inner }
    }

    /// Create a named endpoint on this bus.
    pub fn endpoint(&self, name: &str) -> InProcessCommunicator {
        InProcessCommunicator {
            name: name.to_string(),
            bus: Arc::clone(&self.inner),
            endpoint_id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            callback: Mutex::new(None),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }
}

/// Fan-out loop: deliver each published transform to every registered
/// callback. Runs until the channel closes.
async fn fan_out(rx: async_channel::Receiver<FrameTransform>, inner: Arc<BusInner>) {
    debug!("in-process bus fan-out started");

    while let Ok(transform) = rx.recv().await {
        let callbacks: Vec<SampleCallback> = {
            let endpoints = inner.endpoints.lock().unwrap();
            endpoints.values().cloned().collect()
        };

        trace!(
            child = %transform.child_frame,
            parent = %transform.parent_frame,
            endpoints = callbacks.len(),
            "fanning out transform"
        );

        for callback in callbacks {
            callback(transform.clone());
            metrics::counter!("framelink_bus_delivered_total").increment(1);
        }
    }

    debug!("in-process bus fan-out stopped");
}

/// One endpoint of the in-process bus
///
/// Implements the [`Communicator`] contract: register a callback with
/// `listen`, activate with `start`, send with `publish`, release with
/// `shutdown`.
pub struct InProcessCommunicator {
    name: String,
    bus: Arc<BusInner>,
    endpoint_id: usize,
    callback: Mutex<Option<SampleCallback>>,
    started: AtomicBool,
    closed: AtomicBool,
}

impl Communicator for InProcessCommunicator {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self) -> Result<(), TransformError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransformError::comm(&self.name, "already shut down"));
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let callback = self.callback.lock().unwrap().clone();
        match callback {
            Some(callback) => {
                self.bus
                    .endpoints
                    .lock()
                    .unwrap()
                    .insert(self.endpoint_id, callback);
                debug!(endpoint = %self.name, "communicator started");
                Ok(())
            }
            None => {
                self.started.store(false, Ordering::SeqCst);
                Err(TransformError::comm(
                    &self.name,
                    "start called before listen",
                ))
            }
        }
    }

    fn listen(&self, callback: SampleCallback) {
        *self.callback.lock().unwrap() = Some(callback.clone());
        // Replacing the callback on a live endpoint takes effect immediately
        if self.started.load(Ordering::SeqCst) && !self.closed.load(Ordering::SeqCst) {
            self.bus
                .endpoints
                .lock()
                .unwrap()
                .insert(self.endpoint_id, callback);
        }
    }

    fn publish(&self, transform: &FrameTransform) -> Result<(), TransformError> {
        if self.closed.load(Ordering::SeqCst) || self.bus.closed.load(Ordering::SeqCst) {
            return Err(TransformError::comm(&self.name, "bus closed"));
        }

        match self.bus.tx.try_send(transform.clone()) {
            Ok(()) => {
                metrics::counter!("framelink_bus_published_total").increment(1);
                Ok(())
            }
            Err(async_channel::TrySendError::Full(t)) => {
                metrics::counter!("framelink_bus_dropped_total").increment(1);
                warn!(
                    endpoint = %self.name,
                    child = %t.child_frame,
                    "bus queue full, transform dropped"
                );
                // Best-effort transport: a full queue drops, it does not fail
                Ok(())
            }
            Err(async_channel::TrySendError::Closed(_)) => {
                Err(TransformError::comm(&self.name, "bus closed"))
            }
        }
    }

    fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.bus.unregister(self.endpoint_id);
        debug!(endpoint = %self.name, "communicator shut down");
    }
}

impl Drop for InProcessCommunicator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
