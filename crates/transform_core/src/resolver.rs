//! Transform resolution across the frame graph.
//!
//! Lookups walk each frame's ancestor chain *as of the queried time* toward
//! the root and meet at the first common ancestor. The parent chain is
//! re-derived from buffer contents on every call; there is no separately
//! mutated tree structure, so reparenting is honored at the exact
//! timestamp being queried.

use std::collections::HashSet;
use std::sync::Arc;

use contracts::{
    ExtrapolationConfig, FrameId, FrameTransform, TransformError, TransformSample, TIME_LATEST,
};
use nalgebra::Isometry3;
use tracing::instrument;

use crate::graph::FrameGraph;
use crate::interp::{from_isometry, to_isometry};

/// One hop in an ancestor chain: `frame` plus its transform to its parent
/// at the queried time.
struct ChainLink {
    frame: FrameId,
    sample: TransformSample,
}

/// Path resolver over a shared frame graph
///
/// Cheap to clone; holds only the graph handle and the extrapolation
/// settings. Resolution never mutates the graph, so the feasibility checks
/// are exactly as side-effect-free as the lookups they mirror.
#[derive(Clone)]
pub struct Resolver {
    graph: Arc<FrameGraph>,
    extrapolation: ExtrapolationConfig,
}

impl Resolver {
    pub fn new(graph: Arc<FrameGraph>, extrapolation: ExtrapolationConfig) -> Self {
        Self {
            graph,
            extrapolation,
        }
    }

    /// Resolve the transform mapping `source` coordinates into `target`
    /// coordinates at `time` (`TIME_LATEST` for newest available).
    #[instrument(
        level = "debug",
        name = "resolver_resolve",
        skip(self),
        fields(target_frame = %target, source_frame = %source, time)
    )]
    pub fn resolve(
        &self,
        target: &FrameId,
        source: &FrameId,
        time: u64,
    ) -> Result<FrameTransform, TransformError> {
        if target == source {
            return Ok(FrameTransform::identity(source.clone(), time));
        }

        if !self.graph.is_known(target) {
            return Err(TransformError::frame_not_found(target.clone()));
        }
        if !self.graph.is_known(source) {
            return Err(TransformError::frame_not_found(source.clone()));
        }

        let (source_links, source_root) = self.chain_to_root(source, time)?;
        let (target_links, target_root) = self.chain_to_root(target, time)?;

        let common = find_common_ancestor(
            source,
            &source_links,
            &source_root,
            target,
            &target_links,
            &target_root,
        )
        .ok_or_else(|| TransformError::disconnected(target.clone(), source.clone()))?;

        let (source_iso, source_stamp) = compose_to(&source_links, source, &common);
        let (target_iso, target_stamp) = compose_to(&target_links, target, &common);

        let iso = target_iso.inverse() * source_iso;
        let (translation, rotation) = from_isometry(&iso);

        let time_out = if time == TIME_LATEST {
            let stamp = source_stamp.min(target_stamp);
            if stamp == u64::MAX {
                TIME_LATEST
            } else {
                stamp
            }
        } else {
            time
        };

        Ok(FrameTransform {
            child_frame: source.clone(),
            parent_frame: target.clone(),
            time: time_out,
            translation,
            rotation,
        })
    }

    /// Fixed-frame resolution: evaluate `source` against `fixed_frame` at
    /// `source_time`, `target` against `fixed_frame` at `target_time`, and
    /// compose. The fixed frame is assumed not to move over the interval;
    /// that assumption is the caller's responsibility.
    #[instrument(
        level = "debug",
        name = "resolver_resolve_fixed",
        skip(self),
        fields(target_frame = %target, source_frame = %source, fixed = %fixed_frame)
    )]
    pub fn resolve_fixed(
        &self,
        target: &FrameId,
        target_time: u64,
        source: &FrameId,
        source_time: u64,
        fixed_frame: &FrameId,
    ) -> Result<FrameTransform, TransformError> {
        let source_to_fixed = self.resolve(fixed_frame, source, source_time)?;
        let fixed_to_target = self.resolve(target, fixed_frame, target_time)?;

        let iso = transform_isometry(&fixed_to_target) * transform_isometry(&source_to_fixed);
        let (translation, rotation) = from_isometry(&iso);

        Ok(FrameTransform {
            child_frame: source.clone(),
            parent_frame: target.clone(),
            time: fixed_to_target.time,
            translation,
            rotation,
        })
    }

    /// Feasibility check mirroring [`Resolver::resolve`].
    ///
    /// Absorbs every failure into `false`; has no side effects.
    pub fn can_resolve(&self, target: &FrameId, source: &FrameId, time: u64) -> bool {
        self.resolve(target, source, time).is_ok()
    }

    /// Feasibility check mirroring [`Resolver::resolve_fixed`].
    pub fn can_resolve_fixed(
        &self,
        target: &FrameId,
        target_time: u64,
        source: &FrameId,
        source_time: u64,
        fixed_frame: &FrameId,
    ) -> bool {
        self.resolve_fixed(target, target_time, source, source_time, fixed_frame)
            .is_ok()
    }

    /// Walk `start`'s ancestor chain at `time` until a frame with no own
    /// history (a root) is reached. Returns the traversed links and the
    /// root's name.
    fn chain_to_root(
        &self,
        start: &FrameId,
        time: u64,
    ) -> Result<(Vec<ChainLink>, FrameId), TransformError> {
        let mut links = Vec::new();
        let mut current = start.clone();
        // A well-formed chain visits each frame at most once
        let limit = self.graph.frame_count() + 1;

        loop {
            let outcome = match self.graph.sample_at(&current, time, &self.extrapolation) {
                None => break,
                Some(outcome) => outcome,
            };
            let sample = outcome.map_err(|miss| miss.into_error(&current, time))?;
            let parent = sample.parent.clone();
            links.push(ChainLink {
                frame: current,
                sample,
            });
            current = parent;

            if links.len() > limit {
                return Err(TransformError::disconnected(start.clone(), current));
            }
        }

        Ok((links, current))
    }
}

/// First frame on the target-side path that also appears on the source-side
/// path, walking upward from the frames themselves to their roots.
fn find_common_ancestor(
    source: &FrameId,
    source_links: &[ChainLink],
    source_root: &FrameId,
    target: &FrameId,
    target_links: &[ChainLink],
    target_root: &FrameId,
) -> Option<FrameId> {
    let mut source_path: HashSet<&str> = HashSet::with_capacity(source_links.len() + 2);
    source_path.insert(source.as_str());
    for link in source_links {
        source_path.insert(link.sample.parent.as_str());
    }
    source_path.insert(source_root.as_str());

    if source_path.contains(target.as_str()) {
        return Some(target.clone());
    }
    for link in target_links {
        if source_path.contains(link.sample.parent.as_str()) {
            return Some(link.sample.parent.clone());
        }
    }
    if source_path.contains(target_root.as_str()) {
        return Some(target_root.clone());
    }
    None
}

/// Compose the `start`→`common` isometry from chain links, tracking the
/// minimum sample stamp used (for stamping "latest" lookups).
fn compose_to(links: &[ChainLink], start: &FrameId, common: &FrameId) -> (Isometry3<f64>, u64) {
    let mut iso = Isometry3::identity();
    let mut min_stamp = u64::MAX;

    if start == common {
        return (iso, min_stamp);
    }

    for link in links {
        iso = to_isometry(&link.sample) * iso;
        min_stamp = min_stamp.min(link.sample.time);
        if link.sample.parent == *common {
            break;
        }
    }

    (iso, min_stamp)
}

#[inline]
fn transform_isometry(transform: &FrameTransform) -> Isometry3<f64> {
    to_isometry(&TransformSample {
        time: transform.time,
        translation: transform.translation,
        rotation: transform.rotation,
        parent: transform.parent_frame.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use contracts::{ExtrapolationPolicy, Quat, Vec3};
    use nalgebra::UnitQuaternion;

    const SECOND: u64 = 1_000_000_000;

    fn graph() -> Arc<FrameGraph> {
        Arc::new(FrameGraph::new(60 * SECOND, 1000))
    }

    fn resolver(graph: &Arc<FrameGraph>) -> Resolver {
        Resolver::new(
            Arc::clone(graph),
            ExtrapolationConfig {
                policy: ExtrapolationPolicy::Disallow,
                max_duration_s: 0.5,
            },
        )
    }

    fn insert(
        graph: &FrameGraph,
        child: &str,
        parent: &str,
        time: u64,
        translation: Vec3,
        rotation: Quat,
    ) {
        graph
            .insert(
                &child.into(),
                TransformSample {
                    time,
                    translation,
                    rotation,
                    parent: parent.into(),
                },
            )
            .unwrap();
    }

    fn yaw(angle: f64) -> Quat {
        let q = UnitQuaternion::from_euler_angles(0.0, 0.0, angle);
        let c = q.coords;
        Quat::new(c.x, c.y, c.z, c.w)
    }

    #[test]
    fn test_identity_lookup() {
        let g = graph();
        let r = resolver(&g);

        let result = r.resolve(&"base".into(), &"base".into(), 5 * SECOND).unwrap();
        assert_eq!(result.translation, Vec3::ZERO);
        assert_eq!(result.rotation, Quat::IDENTITY);
        assert_eq!(result.time, 5 * SECOND);
    }

    #[test]
    fn test_unknown_frame() {
        let g = graph();
        insert(&g, "base", "world", SECOND, Vec3::ZERO, Quat::IDENTITY);
        let r = resolver(&g);

        let result = r.resolve(&"bogus".into(), &"base".into(), SECOND);
        assert!(matches!(result, Err(TransformError::FrameNotFound { .. })));
    }

    #[test]
    fn test_direct_parent_child() {
        let g = graph();
        insert(
            &g,
            "base",
            "world",
            SECOND,
            Vec3::new(2.0, 3.0, 4.0),
            Quat::IDENTITY,
        );
        let r = resolver(&g);

        // base → world is exactly the stored sample
        let up = r.resolve(&"world".into(), &"base".into(), SECOND).unwrap();
        assert_relative_eq!(up.translation.x, 2.0);
        assert_relative_eq!(up.translation.y, 3.0);
        assert_relative_eq!(up.translation.z, 4.0);

        // world → base is its inverse
        let down = r.resolve(&"base".into(), &"world".into(), SECOND).unwrap();
        assert_relative_eq!(down.translation.x, -2.0);
        assert_relative_eq!(down.translation.y, -3.0);
        assert_relative_eq!(down.translation.z, -4.0);
    }

    #[test]
    fn test_sibling_composition_through_common_parent() {
        let g = graph();
        insert(
            &g,
            "left",
            "base",
            SECOND,
            Vec3::new(1.0, 0.0, 0.0),
            Quat::IDENTITY,
        );
        insert(
            &g,
            "right",
            "base",
            SECOND,
            Vec3::new(-1.0, 0.0, 0.0),
            Quat::IDENTITY,
        );
        let r = resolver(&g);

        let result = r.resolve(&"right".into(), &"left".into(), SECOND).unwrap();
        assert_relative_eq!(result.translation.x, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rotated_chain_composition() {
        let g = graph();
        // world → base: translate (1,0,0); base → arm: rotate 90° about z
        insert(
            &g,
            "base",
            "world",
            SECOND,
            Vec3::new(1.0, 0.0, 0.0),
            Quat::IDENTITY,
        );
        insert(
            &g,
            "arm",
            "base",
            SECOND,
            Vec3::ZERO,
            yaw(std::f64::consts::FRAC_PI_2),
        );
        insert(
            &g,
            "gripper",
            "arm",
            SECOND,
            Vec3::new(0.0, 2.0, 0.0),
            Quat::IDENTITY,
        );
        let r = resolver(&g);

        let result = r
            .resolve(&"world".into(), &"gripper".into(), SECOND)
            .unwrap();
        // gripper origin: arm's rotation turns (0,2,0) into (-2,0,0), plus base offset (1,0,0)
        assert_relative_eq!(result.translation.x, -1.0, epsilon = 1e-9);
        assert_relative_eq!(result.translation.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_round_trip_inverse_law() {
        let g = graph();
        insert(
            &g,
            "base",
            "world",
            SECOND,
            Vec3::new(1.0, 2.0, 3.0),
            yaw(0.4),
        );
        insert(
            &g,
            "laser",
            "base",
            SECOND,
            Vec3::new(0.5, 0.0, 0.2),
            yaw(-0.9),
        );
        let r = resolver(&g);

        let forward = r.resolve(&"world".into(), &"laser".into(), SECOND).unwrap();
        let backward = r.resolve(&"laser".into(), &"world".into(), SECOND).unwrap();

        let product = transform_isometry(&forward) * transform_isometry(&backward);
        let (t, q) = from_isometry(&product);
        assert_relative_eq!(t.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(t.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(t.z, 0.0, epsilon = 1e-9);
        assert_relative_eq!(q.w.abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_disconnected_trees() {
        let g = graph();
        insert(&g, "base", "world", SECOND, Vec3::ZERO, Quat::IDENTITY);
        insert(&g, "tool", "bench", SECOND, Vec3::ZERO, Quat::IDENTITY);
        let r = resolver(&g);

        let result = r.resolve(&"base".into(), &"tool".into(), SECOND);
        assert!(matches!(result, Err(TransformError::Disconnected { .. })));
    }

    #[test]
    fn test_extrapolation_error_propagates() {
        let g = graph();
        insert(&g, "base", "world", SECOND, Vec3::ZERO, Quat::IDENTITY);
        let r = resolver(&g);

        let result = r.resolve(&"world".into(), &"base".into(), 20 * SECOND);
        assert!(matches!(result, Err(TransformError::TimeOutOfRange { .. })));
    }

    #[test]
    fn test_can_resolve_consistency() {
        let g = graph();
        insert(&g, "base", "world", SECOND, Vec3::ZERO, Quat::IDENTITY);
        let r = resolver(&g);

        let target: FrameId = "world".into();
        let source: FrameId = "base".into();

        assert!(r.can_resolve(&target, &source, SECOND));
        assert!(r.resolve(&target, &source, SECOND).is_ok());

        assert!(!r.can_resolve(&target, &source, 20 * SECOND));
        assert!(r.resolve(&target, &source, 20 * SECOND).is_err());

        assert!(!r.can_resolve(&"nope".into(), &source, SECOND));
    }

    #[test]
    fn test_latest_lookup_stamps_with_sample_time() {
        let g = graph();
        insert(
            &g,
            "base",
            "world",
            3 * SECOND,
            Vec3::new(7.0, 0.0, 0.0),
            Quat::IDENTITY,
        );
        let r = resolver(&g);

        let result = r.resolve(&"world".into(), &"base".into(), TIME_LATEST).unwrap();
        assert_eq!(result.time, 3 * SECOND);
        assert_relative_eq!(result.translation.x, 7.0);
    }

    #[test]
    fn test_reparenting_respected_per_query_time() {
        let g = graph();
        // base hangs off odom early, then gets reparented under map
        insert(
            &g,
            "base",
            "odom",
            SECOND,
            Vec3::new(1.0, 0.0, 0.0),
            Quat::IDENTITY,
        );
        insert(
            &g,
            "base",
            "map",
            10 * SECOND,
            Vec3::new(5.0, 0.0, 0.0),
            Quat::IDENTITY,
        );
        let r = resolver(&g);

        let early = r.resolve(&"odom".into(), &"base".into(), SECOND).unwrap();
        assert_relative_eq!(early.translation.x, 1.0);

        let late = r
            .resolve(&"map".into(), &"base".into(), 10 * SECOND)
            .unwrap();
        assert_relative_eq!(late.translation.x, 5.0);

        // At the early time, base is not attached to map at all
        let result = r.resolve(&"map".into(), &"base".into(), SECOND);
        assert!(result.is_err());
    }

    #[test]
    fn test_fixed_frame_lookup() {
        let g = graph();
        // A robot moving along x in world; world is the fixed frame.
        insert(
            &g,
            "robot",
            "world",
            SECOND,
            Vec3::new(1.0, 0.0, 0.0),
            Quat::IDENTITY,
        );
        insert(
            &g,
            "robot",
            "world",
            5 * SECOND,
            Vec3::new(9.0, 0.0, 0.0),
            Quat::IDENTITY,
        );
        let r = resolver(&g);

        // Where was the robot at t=1s, expressed in the robot frame of t=5s?
        let result = r
            .resolve_fixed(
                &"robot".into(),
                5 * SECOND,
                &"robot".into(),
                SECOND,
                &"world".into(),
            )
            .unwrap();
        assert_relative_eq!(result.translation.x, -8.0, epsilon = 1e-9);
        assert_eq!(result.time, 5 * SECOND);
    }
}
