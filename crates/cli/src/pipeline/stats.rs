//! Pipeline statistics.

use std::time::Duration;

use observability::LookupMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total lookups attempted
    pub lookups_attempted: u64,

    /// Lookups that resolved successfully
    pub lookups_resolved: u64,

    /// Transforms published by the demo publisher
    pub transforms_published: u64,

    /// Frames known to the receiving core at the end of the run
    pub frames_seen: usize,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Lookup metrics aggregator
    pub lookup_metrics: LookupMetricsAggregator,
}

impl PipelineStats {
    /// Lookups per second over the run
    pub fn lookup_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.lookups_attempted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Fraction of lookups that resolved, as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.lookups_attempted > 0 {
            self.lookups_resolved as f64 / self.lookups_attempted as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Print a human-readable summary to stdout
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===\n");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Transforms published: {}", self.transforms_published);
        println!(
            "Lookups: {} attempted, {} resolved ({:.1}%)",
            self.lookups_attempted,
            self.lookups_resolved,
            self.success_rate()
        );
        println!("Frames known: {}", self.frames_seen);
        println!();
        println!("{}", self.lookup_metrics.summary());
    }
}
