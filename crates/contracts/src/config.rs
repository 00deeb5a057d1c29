//! Transformer configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::secs_to_nanos;

/// Transformer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TransformerConfig {
    /// Authority name stamped on published transforms (logging only)
    #[serde(default)]
    pub authority: Option<String>,

    /// History buffer configuration
    #[serde(default)]
    #[validate(nested)]
    pub buffer: BufferConfig,

    /// Extrapolation configuration
    #[serde(default)]
    #[validate(nested)]
    pub extrapolation: ExtrapolationConfig,

    /// Asynchronous request configuration
    #[serde(default)]
    #[validate(nested)]
    pub request: RequestConfig,
}

/// History buffer configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BufferConfig {
    /// Maximum retained time span per frame, in seconds.
    ///
    /// Samples older than this horizon relative to the newest stored sample
    /// are evicted, and late arrivals beyond it are rejected as stale.
    #[validate(range(min = 0.001))]
    pub cache_time_s: f64,

    /// Maximum number of samples retained per frame
    #[validate(range(min = 1))]
    pub max_samples: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            cache_time_s: 10.0,
            max_samples: 1000,
        }
    }
}

impl BufferConfig {
    /// Cache horizon in nanoseconds.
    #[inline]
    pub fn cache_time_nanos(&self) -> u64 {
        secs_to_nanos(self.cache_time_s)
    }
}

/// Extrapolation configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExtrapolationConfig {
    /// Policy applied when a query time falls outside a buffer's range
    #[serde(default)]
    pub policy: ExtrapolationPolicy,

    /// Maximum duration beyond the buffer range that `linear` may project,
    /// in seconds. Ignored by the other policies.
    #[validate(range(min = 0.0))]
    pub max_duration_s: f64,
}

impl Default for ExtrapolationConfig {
    fn default() -> Self {
        Self {
            policy: ExtrapolationPolicy::default(),
            max_duration_s: 0.5,
        }
    }
}

impl ExtrapolationConfig {
    /// Maximum extrapolation duration in nanoseconds.
    #[inline]
    pub fn max_duration_nanos(&self) -> u64 {
        secs_to_nanos(self.max_duration_s)
    }
}

/// Policy for query times outside a buffer's observed range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrapolationPolicy {
    /// Fail with a time-out-of-range error
    #[default]
    Disallow,
    /// Use the nearest boundary sample
    Clamp,
    /// Project linearly beyond the range, up to the configured maximum
    Linear,
}

/// Asynchronous request configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RequestConfig {
    /// Default deadline for `request_transform`, in seconds
    #[validate(range(min = 0.001))]
    pub default_timeout_s: f64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            default_timeout_s: 3.0,
        }
    }
}

impl RequestConfig {
    /// Default request timeout as a std `Duration`.
    #[inline]
    pub fn default_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.default_timeout_s.max(0.0))
    }
}
