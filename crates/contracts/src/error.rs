//! Layered error definitions
//!
//! Categorized by source: config / graph / resolution / request / comm

use thiserror::Error;

use crate::FrameId;

/// Unified error type
#[derive(Debug, Error)]
pub enum TransformError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Resolution Errors =====
    /// Referenced frame has no recorded samples
    #[error("frame not found: {frame}")]
    FrameNotFound { frame: FrameId },

    /// Frames exist but share no common ancestor at the queried time
    #[error("frames '{target}' and '{source_frame}' are not connected")]
    Disconnected { target: FrameId, source_frame: FrameId },

    /// Requested time falls outside the resolvable range of a frame's buffer
    #[error("time {requested}ns outside resolvable range for frame '{frame}'")]
    TimeOutOfRange {
        frame: FrameId,
        requested: u64,
        /// Oldest/newest stamp in the buffer, if it holds any samples.
        available: Option<(u64, u64)>,
    },

    // ===== Buffer Errors =====
    /// Sample older than the cache horizon relative to the newest entry
    #[error("stale sample for frame '{frame}': {sample_time}ns is older than horizon {horizon_ns}ns before newest {newest}ns")]
    StaleSample {
        frame: FrameId,
        sample_time: u64,
        newest: u64,
        horizon_ns: u64,
    },

    // ===== Request Errors =====
    /// An asynchronous request's deadline elapsed before resolution
    #[error("transform request timed out after {waited_ms}ms")]
    RequestTimeout { waited_ms: u64 },

    /// Core shutdown occurred before an asynchronous request resolved
    #[error("transform request cancelled by shutdown")]
    Cancelled,

    // ===== Communicator Errors =====
    /// Transport-level failure inside a communicator
    #[error("communicator '{name}' error: {message}")]
    Comm { name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl TransformError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create frame-not-found error
    pub fn frame_not_found(frame: impl Into<FrameId>) -> Self {
        Self::FrameNotFound {
            frame: frame.into(),
        }
    }

    /// Create disconnected-frames error
    pub fn disconnected(target: impl Into<FrameId>, source: impl Into<FrameId>) -> Self {
        Self::Disconnected {
            target: target.into(),
            source_frame: source.into(),
        }
    }

    /// Create communicator error
    pub fn comm(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Comm {
            name: name.into(),
            message: message.into(),
        }
    }
}
