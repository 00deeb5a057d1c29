//! Rigid-transform value types exchanged between crates.
//!
//! These are plain serde records; the numeric heavy lifting (slerp,
//! isometry composition) lives in `transform_core`.

use serde::{Deserialize, Serialize};

use crate::FrameId;

/// 3D translation vector (meters).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Rotation quaternion (x, y, z, w component order).
///
/// Stored samples always hold a unit quaternion; use [`Quat::normalized`]
/// before storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quat {
    /// The identity rotation.
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    #[inline]
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Return a unit-length copy.
    ///
    /// A degenerate (zero-norm or non-finite) quaternion collapses to the
    /// identity rotation rather than poisoning downstream math with NaNs.
    pub fn normalized(&self) -> Quat {
        let norm =
            (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if !norm.is_finite() || norm < 1e-12 {
            return Quat::IDENTITY;
        }
        Quat {
            x: self.x / norm,
            y: self.y / norm,
            z: self.z / norm,
            w: self.w / norm,
        }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Quat::IDENTITY
    }
}

/// A stamped rigid transform between two named frames.
///
/// Maps points expressed in `child_frame` coordinates into `parent_frame`
/// coordinates. This is both the record published between peers and the
/// result type returned by lookups (with `child_frame` = source and
/// `parent_frame` = target).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameTransform {
    /// Frame the transform maps out of.
    pub child_frame: FrameId,

    /// Frame the transform maps into.
    pub parent_frame: FrameId,

    /// Timestamp in nanoseconds at which the transform is valid.
    pub time: u64,

    /// Translation component.
    pub translation: Vec3,

    /// Rotation component (unit quaternion).
    pub rotation: Quat,
}

impl FrameTransform {
    /// The identity transform between a frame and itself.
    pub fn identity(frame: FrameId, time: u64) -> Self {
        Self {
            child_frame: frame.clone(),
            parent_frame: frame,
            time,
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

/// One entry in a frame's history buffer.
///
/// The parent is recorded per sample, not per frame: reparenting is a
/// time-varying fact and lookups re-derive the parent chain at the queried
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSample {
    /// Timestamp in nanoseconds. Never `TIME_LATEST` once stored.
    pub time: u64,

    /// Translation relative to `parent`.
    pub translation: Vec3,

    /// Rotation relative to `parent` (unit quaternion).
    pub rotation: Quat,

    /// Parent frame at the time of this sample.
    pub parent: FrameId,
}

impl TransformSample {
    /// Build a sample from a published transform record.
    pub fn from_transform(transform: &FrameTransform) -> Self {
        Self {
            time: transform.time,
            translation: transform.translation,
            rotation: transform.rotation.normalized(),
            parent: transform.parent_frame.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quat_normalized() {
        let q = Quat::new(0.0, 0.0, 0.0, 2.0).normalized();
        assert!((q.w - 1.0).abs() < 1e-12);

        // Degenerate input falls back to identity
        let q = Quat::new(0.0, 0.0, 0.0, 0.0).normalized();
        assert_eq!(q, Quat::IDENTITY);
    }

    #[test]
    fn test_identity_transform() {
        let t = FrameTransform::identity("base".into(), 42);
        assert_eq!(t.child_frame, t.parent_frame);
        assert_eq!(t.translation, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.time, 42);
    }

    #[test]
    fn test_sample_from_transform_normalizes() {
        let transform = FrameTransform {
            child_frame: "laser".into(),
            parent_frame: "base".into(),
            time: 1_000,
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::new(0.0, 0.0, 3.0, 4.0),
        };
        let sample = TransformSample::from_transform(&transform);
        let norm = (sample.rotation.z * sample.rotation.z
            + sample.rotation.w * sample.rotation.w)
            .sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert_eq!(sample.parent, "base");
    }

    #[test]
    fn test_serde_round_trip() {
        let transform = FrameTransform {
            child_frame: "camera".into(),
            parent_frame: "base".into(),
            time: 5,
            translation: Vec3::new(0.5, 0.0, 1.5),
            rotation: Quat::IDENTITY,
        };
        let json = serde_json::to_string(&transform).unwrap();
        let parsed: FrameTransform = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, transform);
    }
}
