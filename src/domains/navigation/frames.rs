use crate::domains::logger::DynLogger;
use super::ports::PoseTransformer;
use super::types::{PoseMap, PoseSequenceMap, StampedPose, ValidatedGoals};
use std::sync::Arc;

/// Expresses poses in the planner's global frame.
///
/// A pose that can not be transformed is kept unchanged and the failure is
/// logged; the planner then skips the agent because of the frame mismatch.
pub struct FrameNormalizer {
    transformer: Arc<dyn PoseTransformer>,
    logger: DynLogger,
}

impl FrameNormalizer {
    pub fn new(transformer: Arc<dyn PoseTransformer>, logger: DynLogger) -> Self {
        Self { transformer, logger }
    }

    pub fn to_target_frame(&self, poses: &PoseMap, target_frame: &str) -> PoseMap {
        poses
            .iter()
            .map(|(agent_id, pose)| (*agent_id, self.transform_or_keep(pose, target_frame)))
            .collect()
    }

    pub fn sequences_to_target_frame(&self, sequences: &PoseSequenceMap, target_frame: &str) -> PoseSequenceMap {
        sequences
            .iter()
            .map(|(agent_id, poses)| {
                let transformed = poses
                    .iter()
                    .map(|pose| self.transform_or_keep(pose, target_frame))
                    .collect();
                (*agent_id, transformed)
            })
            .collect()
    }

    pub fn goals_to_target_frame(&self, goals: &ValidatedGoals, target_frame: &str) -> ValidatedGoals {
        ValidatedGoals {
            starts: self.to_target_frame(&goals.starts, target_frame),
            sub_goals: self.sequences_to_target_frame(&goals.sub_goals, target_frame),
            goals: self.to_target_frame(&goals.goals, target_frame),
        }
    }

    fn transform_or_keep(&self, pose: &StampedPose, target_frame: &str) -> StampedPose {
        if pose.frame_id == target_frame {
            return pose.clone();
        }
        match self.transformer.transform_pose(pose, target_frame) {
            Ok(transformed) => transformed,
            Err(e) => {
                self.logger.warn(&format!(
                    "Failed to transform the pose from '{}' into the '{}' frame: {}",
                    pose.frame_id, target_frame, e
                ));
                pose.clone()
            }
        }
    }
}
