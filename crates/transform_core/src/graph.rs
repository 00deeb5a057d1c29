//! Frame graph - process-wide map of frame name to history buffer.
//!
//! One instance per transformer core. Shared by every query thread and by
//! the communicator ingestion path. Locking is fine-grained: the outer map
//! lock is held only to find or create an entry, and each frame's history
//! has its own `RwLock`, so ingestion for frame X never blocks a lookup
//! that only touches frame Y.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use contracts::{ExtrapolationConfig, FrameId, TransformError, TransformSample};
use tracing::trace;

use crate::buffer::{FrameHistory, SampleMiss};

/// Shared handle to one frame's history.
pub type SharedHistory = Arc<RwLock<FrameHistory>>;

/// Frame name → history buffer map
///
/// Frames are created implicitly the first time a sample references them
/// and never deleted; their buffers age out old samples instead.
pub struct FrameGraph {
    /// Child frame → its sample history
    frames: RwLock<HashMap<FrameId, SharedHistory>>,
    /// Every frame ever seen as a parent (roots have no history of their own)
    parents: RwLock<HashSet<FrameId>>,
    cache_time_ns: u64,
    max_samples: usize,
}

impl FrameGraph {
    /// Create an empty graph with the given per-frame buffer settings.
    pub fn new(cache_time_ns: u64, max_samples: usize) -> Self {
        Self {
            frames: RwLock::new(HashMap::new()),
            parents: RwLock::new(HashSet::new()),
            cache_time_ns,
            max_samples,
        }
    }

    /// Insert a sample into `child`'s history, creating the frame on first
    /// contact.
    pub fn insert(&self, child: &FrameId, sample: TransformSample) -> Result<(), TransformError> {
        let history = self.history_or_create(child);

        {
            let mut parents = self.parents.write().unwrap();
            if !parents.contains(sample.parent.as_str()) {
                parents.insert(sample.parent.clone());
            }
        }

        trace!(
            frame = %child,
            parent = %sample.parent,
            time = sample.time,
            "inserting transform sample"
        );

        let result = history.write().unwrap().insert(child, sample);
        result
    }

    fn history_or_create(&self, frame: &FrameId) -> SharedHistory {
        if let Some(history) = self.frames.read().unwrap().get(frame.as_str()) {
            return Arc::clone(history);
        }

        let mut frames = self.frames.write().unwrap();
        Arc::clone(frames.entry(frame.clone()).or_insert_with(|| {
            Arc::new(RwLock::new(FrameHistory::new(
                self.cache_time_ns,
                self.max_samples,
            )))
        }))
    }

    /// Look up the history of a frame, if it has ever been a child.
    pub fn history(&self, frame: &str) -> Option<SharedHistory> {
        self.frames.read().unwrap().get(frame).map(Arc::clone)
    }

    /// Resolve a sample for `frame` at `time` without holding the map lock.
    pub fn sample_at(
        &self,
        frame: &str,
        time: u64,
        extrapolation: &ExtrapolationConfig,
    ) -> Option<Result<TransformSample, SampleMiss>> {
        let history = self.history(frame)?;
        let guard = history.read().unwrap();
        Some(guard.sample_at(time, extrapolation))
    }

    /// A frame is known once any sample names it as child or parent.
    pub fn is_known(&self, frame: &str) -> bool {
        self.frames.read().unwrap().contains_key(frame)
            || self.parents.read().unwrap().contains(frame)
    }

    /// All known frame names (children and roots), unordered.
    pub fn frames(&self) -> Vec<FrameId> {
        let mut out: Vec<FrameId> = self.frames.read().unwrap().keys().cloned().collect();
        let children: HashSet<FrameId> = out.iter().cloned().collect();
        for parent in self.parents.read().unwrap().iter() {
            if !children.contains(parent) {
                out.push(parent.clone());
            }
        }
        out
    }

    /// Number of known frames.
    pub fn frame_count(&self) -> usize {
        self.frames().len()
    }

    /// Total buffered samples across all frames (diagnostics).
    pub fn sample_count(&self) -> usize {
        self.frames
            .read()
            .unwrap()
            .values()
            .map(|h| h.read().unwrap().len())
            .sum()
    }
}
