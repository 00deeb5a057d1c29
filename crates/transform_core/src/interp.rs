//! Quaternion/translation interpolation helpers.
//!
//! Contracts geometry types are plain records; all numeric work funnels
//! through the nalgebra conversions defined here.

use contracts::{Quat, TransformSample, Vec3};
use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};

/// Convert a contracts quaternion to a nalgebra unit quaternion.
#[inline]
pub(crate) fn to_unit_quat(q: &Quat) -> UnitQuaternion<f64> {
    UnitQuaternion::new_normalize(Quaternion::new(q.w, q.x, q.y, q.z))
}

/// Convert a nalgebra unit quaternion back to the contracts record.
#[inline]
pub(crate) fn from_unit_quat(q: &UnitQuaternion<f64>) -> Quat {
    let c = q.coords;
    Quat::new(c.x, c.y, c.z, c.w)
}

/// Build the child→parent isometry for a stored sample.
#[inline]
pub(crate) fn to_isometry(sample: &TransformSample) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(
            sample.translation.x,
            sample.translation.y,
            sample.translation.z,
        ),
        to_unit_quat(&sample.rotation),
    )
}

/// Split an isometry back into contracts translation/rotation parts.
#[inline]
pub(crate) fn from_isometry(iso: &Isometry3<f64>) -> (Vec3, Quat) {
    let t: Vector3<f64> = iso.translation.vector;
    (Vec3::new(t.x, t.y, t.z), from_unit_quat(&iso.rotation))
}

/// Shortest-arc spherical interpolation.
///
/// `t` may fall outside `[0, 1]`, in which case the rotation is projected
/// along the same arc (used by linear extrapolation).
pub(crate) fn slerp(a: &Quat, b: &Quat, t: f64) -> Quat {
    let qa = to_unit_quat(a);
    let mut raw_b = Quaternion::new(b.w, b.x, b.y, b.z);
    if qa.coords.dot(&raw_b.coords) < 0.0 {
        raw_b = -raw_b;
    }
    let qb = UnitQuaternion::new_normalize(raw_b);

    match qa.try_slerp(&qb, t, 1e-9) {
        Some(q) => from_unit_quat(&q),
        // Rotations are (numerically) identical; either endpoint works.
        None => from_unit_quat(&qa),
    }
}

/// Linear interpolation of translations with an unclamped weight.
#[inline]
pub(crate) fn lerp(a: &Vec3, b: &Vec3, t: f64) -> Vec3 {
    Vec3::new(
        a.x + (b.x - a.x) * t,
        a.y + (b.y - a.y) * t,
        a.z + (b.z - a.z) * t,
    )
}

/// Interpolate (or project, for `t` outside the pair's range) a sample pair
/// at `time`. The caller guarantees both samples share the same parent and
/// have distinct timestamps.
pub(crate) fn interpolate_samples(
    before: &TransformSample,
    after: &TransformSample,
    time: u64,
) -> TransformSample {
    let span = after.time as f64 - before.time as f64;
    let ratio = (time as f64 - before.time as f64) / span;

    TransformSample {
        time,
        translation: lerp(&before.translation, &after.translation, ratio),
        rotation: slerp(&before.rotation, &after.rotation, ratio),
        parent: before.parent.clone(),
    }
}
