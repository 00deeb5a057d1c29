//! Transformer metric collection
//!
//! Helpers layered over the `metrics` facade plus an in-memory aggregator
//! for end-of-run summaries.

use contracts::{FrameTransform, TransformError};
use metrics::{counter, gauge, histogram};

/// Record one ingested transform sample
pub fn record_sample_ingested(child_frame: &str) {
    counter!(
        "framelink_ingested_by_frame_total",
        "frame" => child_frame.to_string()
    )
    .increment(1);
}

/// Record one published transform
pub fn record_publish(authority: &str) {
    counter!(
        "framelink_published_total",
        "authority" => authority.to_string()
    )
    .increment(1);
}

/// Record a synchronous lookup latency
pub fn record_lookup_latency_ms(latency_ms: f64) {
    histogram!("framelink_lookup_latency_ms").record(latency_ms);
}

/// Record the current number of outstanding asynchronous requests
pub fn record_pending_requests(count: usize) {
    gauge!("framelink_pending_requests").set(count as f64);
}

/// Lookup metrics aggregator
///
/// Aggregates lookup outcomes in memory for summary output; complementary
/// to the Prometheus export, which keeps per-sample detail.
#[derive(Debug, Clone, Default)]
pub struct LookupMetricsAggregator {
    /// Total lookups observed
    pub total_lookups: u64,

    /// Successful lookups
    pub successful_lookups: u64,

    /// Failure counts by error kind
    pub failure_counts: std::collections::HashMap<&'static str, u64>,

    /// Lookup latency statistics (milliseconds)
    pub latency_stats: RunningStats,

    /// Translation magnitude statistics of resolved transforms (meters)
    pub distance_stats: RunningStats,
}

impl LookupMetricsAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Update aggregate statistics from one lookup outcome
    pub fn update(
        &mut self,
        result: &Result<FrameTransform, TransformError>,
        latency_ms: f64,
    ) {
        self.total_lookups += 1;
        self.latency_stats.push(latency_ms);

        match result {
            Ok(transform) => {
                self.successful_lookups += 1;
                let t = &transform.translation;
                self.distance_stats
                    .push((t.x * t.x + t.y * t.y + t.z * t.z).sqrt());
            }
            Err(error) => {
                *self.failure_counts.entry(error_kind(error)).or_insert(0) += 1;
            }
        }
    }

    /// Produce a summary report
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_lookups: self.total_lookups,
            successful_lookups: self.successful_lookups,
            success_rate: if self.total_lookups > 0 {
                self.successful_lookups as f64 / self.total_lookups as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            distance_m: StatsSummary::from(&self.distance_stats),
            failure_counts: self.failure_counts.clone(),
        }
    }

    /// Reset all statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Stable label for an error kind
fn error_kind(error: &TransformError) -> &'static str {
    match error {
        TransformError::FrameNotFound { .. } => "frame_not_found",
        TransformError::Disconnected { .. } => "disconnected",
        TransformError::TimeOutOfRange { .. } => "time_out_of_range",
        TransformError::StaleSample { .. } => "stale_sample",
        TransformError::RequestTimeout { .. } => "timeout",
        TransformError::Cancelled => "cancelled",
        TransformError::Comm { .. } => "comm",
        TransformError::ConfigParse { .. } | TransformError::ConfigValidation { .. } => "config",
        TransformError::Io(_) => "io",
        TransformError::Other(_) => "other",
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_lookups: u64,
    pub successful_lookups: u64,
    pub success_rate: f64,
    pub latency_ms: StatsSummary,
    pub distance_m: StatsSummary,
    pub failure_counts: std::collections::HashMap<&'static str, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Lookup Metrics Summary ===")?;
        writeln!(f, "Total lookups: {}", self.total_lookups)?;
        writeln!(
            f,
            "Successful: {} ({:.2}%)",
            self.successful_lookups, self.success_rate
        )?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;
        writeln!(f, "Distance (m): {}", self.distance_m)?;

        if !self.failure_counts.is_empty() {
            writeln!(f, "Failures by kind:")?;
            for (kind, count) in &self.failure_counts {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Push a new value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Sample count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Maximum
    pub fn max(&self) -> f64 {
        self.max
    }
}
