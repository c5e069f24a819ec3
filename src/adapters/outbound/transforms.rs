use crate::common::{DomainError, DomainResult};
use crate::domains::navigation::{PoseTransformer, Position3D, Quaternion, StampedPose};
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion};
use std::collections::HashMap;

/// Fixed frames, each placed relative to a single root frame.
pub struct StaticTransformTree {
    root: String,
    frames: HashMap<String, Isometry3<f64>>,
}

impl StaticTransformTree {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            frames: HashMap::new(),
        }
    }

    /// Adds `frame` whose origin sits at (x, y) in the root frame, rotated by `yaw`.
    pub fn with_frame(mut self, frame: impl Into<String>, x: f64, y: f64, yaw: f64) -> Self {
        self.insert_frame(frame, x, y, yaw);
        self
    }

    pub fn insert_frame(&mut self, frame: impl Into<String>, x: f64, y: f64, yaw: f64) {
        let pose = Isometry3::from_parts(
            Translation3::new(x, y, 0.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, yaw),
        );
        self.frames.insert(frame.into(), pose);
    }

    fn frame_in_root(&self, frame: &str) -> Option<Isometry3<f64>> {
        if frame == self.root {
            return Some(Isometry3::identity());
        }
        self.frames.get(frame).copied()
    }
}

impl PoseTransformer for StaticTransformTree {
    fn transform_pose(&self, pose: &StampedPose, target_frame: &str) -> DomainResult<StampedPose> {
        let unknown = |frame: &str| DomainError::TransformFailed {
            from: pose.frame_id.clone(),
            to: target_frame.to_string(),
            reason: format!("frame '{}' does not exist", frame),
        };
        let source = self.frame_in_root(&pose.frame_id).ok_or_else(|| unknown(&pose.frame_id))?;
        let target = self.frame_in_root(target_frame).ok_or_else(|| unknown(target_frame))?;
        let relative = target.inverse() * source;

        let point = relative.transform_point(&Point3::new(pose.position.x, pose.position.y, pose.position.z));
        let Quaternion { x, y, z, w } = pose.orientation;
        let rotation = relative.rotation * UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(w, x, y, z));
        let q = rotation.into_inner();

        Ok(StampedPose {
            frame_id: target_frame.to_string(),
            stamp: pose.stamp,
            position: Position3D { x: point.x, y: point.y, z: point.z },
            orientation: Quaternion { x: q.i, y: q.j, z: q.k, w: q.w },
        })
    }
}
