//! Per-frame transform history with timestamp-based ordering.
//!
//! Each coordinate frame owns one `FrameHistory`: a bounded, time-ordered
//! sequence of samples describing its transform to whatever parent it had
//! at each instant. Out-of-order arrivals are sorted into place; samples
//! older than the cache horizon are rejected.

use std::collections::VecDeque;

use contracts::{
    ExtrapolationConfig, ExtrapolationPolicy, FrameId, TransformError, TransformSample,
    TIME_LATEST,
};

use crate::interp::interpolate_samples;

/// Why a buffer lookup could not produce a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMiss {
    /// The buffer holds no samples at all.
    Empty,
    /// Requested time precedes the resolvable range.
    TooEarly { oldest: u64, newest: u64 },
    /// Requested time follows the resolvable range (data may still arrive).
    TooLate { oldest: u64, newest: u64 },
}

impl SampleMiss {
    /// Attach the owning frame and requested time to build the public error.
    pub fn into_error(self, frame: &FrameId, requested: u64) -> TransformError {
        match self {
            SampleMiss::Empty => TransformError::FrameNotFound {
                frame: frame.clone(),
            },
            SampleMiss::TooEarly { oldest, newest } | SampleMiss::TooLate { oldest, newest } => {
                TransformError::TimeOutOfRange {
                    frame: frame.clone(),
                    requested,
                    available: Some((oldest, newest)),
                }
            }
        }
    }
}

/// Time-ordered sample history for a single frame
///
/// Not internally locked; the frame graph wraps each history in its own
/// `RwLock` so ingestion for one frame never blocks lookups on another.
#[derive(Debug)]
pub struct FrameHistory {
    /// Samples in non-decreasing timestamp order
    samples: VecDeque<TransformSample>,
    /// Maximum retained time span (nanoseconds)
    cache_time_ns: u64,
    /// Maximum retained sample count
    max_samples: usize,
    evicted_count: u64,
    out_of_order_count: u64,
    /// Timestamp of the most recent insertion (arrival order, not buffer order)
    last_inserted: Option<u64>,
}

impl FrameHistory {
    /// Create a new history buffer
    #[inline]
    pub fn new(cache_time_ns: u64, max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples.min(64)),
            cache_time_ns,
            max_samples: max_samples.max(1),
            evicted_count: 0,
            out_of_order_count: 0,
            last_inserted: None,
        }
    }

    /// Insert a sample, keeping timestamp order.
    ///
    /// A sample older than the cache horizon relative to the newest stored
    /// sample is rejected unless the buffer is empty. A sample with a
    /// timestamp identical to a stored one overwrites it (latest write
    /// wins).
    pub fn insert(
        &mut self,
        frame: &FrameId,
        sample: TransformSample,
    ) -> Result<(), TransformError> {
        if sample.time == TIME_LATEST {
            return Err(TransformError::Other(format!(
                "sample for frame '{frame}' uses reserved timestamp 0"
            )));
        }

        if let Some(newest) = self.samples.back() {
            if sample.time + self.cache_time_ns < newest.time {
                return Err(TransformError::StaleSample {
                    frame: frame.clone(),
                    sample_time: sample.time,
                    newest: newest.time,
                    horizon_ns: self.cache_time_ns,
                });
            }
        }

        // Track out-of-order arrivals
        if let Some(last) = self.last_inserted {
            if sample.time < last {
                self.out_of_order_count += 1;
            }
        }
        self.last_inserted = Some(sample.time);

        let pos = self.samples.partition_point(|s| s.time <= sample.time);
        if pos > 0 && self.samples[pos - 1].time == sample.time {
            self.samples[pos - 1] = sample;
        } else {
            self.samples.insert(pos, sample);
        }

        self.evict();
        Ok(())
    }

    /// Drop samples beyond the capacity cap or older than the cache horizon.
    fn evict(&mut self) {
        while self.samples.len() > self.max_samples {
            self.samples.pop_front();
            self.evicted_count += 1;
        }

        if let Some(newest) = self.samples.back().map(|s| s.time) {
            while let Some(front) = self.samples.front() {
                if front.time + self.cache_time_ns < newest {
                    self.samples.pop_front();
                    self.evicted_count += 1;
                } else {
                    break;
                }
            }
        }
    }

    /// Resolve a sample at `time` under the given extrapolation settings.
    ///
    /// `TIME_LATEST` returns the newest sample without interpolation. A time
    /// strictly between two stored samples is interpolated (linear
    /// translation, shortest-arc slerp rotation) unless the bracketing
    /// samples disagree on the parent frame, in which case the nearer sample
    /// wins.
    pub fn sample_at(
        &self,
        time: u64,
        extrapolation: &ExtrapolationConfig,
    ) -> Result<TransformSample, SampleMiss> {
        let (oldest, newest) = match self.time_range() {
            Some(range) => range,
            None => return Err(SampleMiss::Empty),
        };

        if time == TIME_LATEST {
            return Ok(self.samples.back().cloned().unwrap());
        }

        if time < oldest {
            return self.resolve_out_of_range(time, extrapolation, true, oldest, newest);
        }
        if time > newest {
            return self.resolve_out_of_range(time, extrapolation, false, oldest, newest);
        }

        let pos = self.samples.partition_point(|s| s.time < time);
        if self.samples[pos].time == time {
            return Ok(self.samples[pos].clone());
        }

        let before = &self.samples[pos - 1];
        let after = &self.samples[pos];
        if before.parent != after.parent {
            // Reparenting boundary: no blending across different parents
            let nearer = if time - before.time <= after.time - time {
                before
            } else {
                after
            };
            return Ok(nearer.clone());
        }

        Ok(interpolate_samples(before, after, time))
    }

    fn resolve_out_of_range(
        &self,
        time: u64,
        extrapolation: &ExtrapolationConfig,
        early: bool,
        oldest: u64,
        newest: u64,
    ) -> Result<TransformSample, SampleMiss> {
        let miss = if early {
            SampleMiss::TooEarly { oldest, newest }
        } else {
            SampleMiss::TooLate { oldest, newest }
        };

        match extrapolation.policy {
            ExtrapolationPolicy::Disallow => Err(miss),
            ExtrapolationPolicy::Clamp => Ok(self.boundary(early).clone()),
            ExtrapolationPolicy::Linear => {
                let gap = if early { oldest - time } else { time - newest };
                if gap > extrapolation.max_duration_nanos() {
                    return Err(miss);
                }

                let (a, b) = match self.boundary_pair(early) {
                    Some(pair) => pair,
                    // A single stored sample carries no velocity; hold it.
                    None => return Ok(self.boundary(early).clone()),
                };
                if a.parent != b.parent {
                    return Ok(self.boundary(early).clone());
                }
                Ok(interpolate_samples(a, b, time))
            }
        }
    }

    /// The boundary sample nearest to an out-of-range query.
    fn boundary(&self, early: bool) -> &TransformSample {
        if early {
            self.samples.front().unwrap()
        } else {
            self.samples.back().unwrap()
        }
    }

    /// The two samples adjacent to a boundary, if the buffer has that many
    /// with distinct timestamps.
    fn boundary_pair(&self, early: bool) -> Option<(&TransformSample, &TransformSample)> {
        if self.samples.len() < 2 {
            return None;
        }
        let (a, b) = if early {
            (&self.samples[0], &self.samples[1])
        } else {
            (
                &self.samples[self.samples.len() - 2],
                &self.samples[self.samples.len() - 1],
            )
        };
        if a.time == b.time {
            return None;
        }
        Some((a, b))
    }

    /// Newest stored sample
    #[inline]
    pub fn newest(&self) -> Option<&TransformSample> {
        self.samples.back()
    }

    /// Oldest/newest timestamps, if any samples are stored
    #[inline]
    pub fn time_range(&self) -> Option<(u64, u64)> {
        match (self.samples.front(), self.samples.back()) {
            (Some(front), Some(back)) => Some((front.time, back.time)),
            _ => None,
        }
    }

    /// Number of stored samples
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples dropped by capacity or horizon eviction
    #[inline]
    pub fn evicted_count(&self) -> u64 {
        self.evicted_count
    }

    /// Samples that arrived with a timestamp older than their predecessor
    #[inline]
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }
}
