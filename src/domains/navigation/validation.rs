use crate::common::{DomainError, DomainResult};
use crate::domains::logger::DynLogger;
use super::types::{NavigationRequest, PoseMap, PoseSequenceMap, Quaternion, StampedPose, ValidatedGoals};
use nalgebra::{UnitQuaternion, Vector3};

const MIN_SQUARED_LENGTH: f64 = 1e-6;
const UPRIGHT_TOLERANCE: f64 = 1e-3;

/// Reason an orientation can not be used for planar navigation, if any.
///
/// Accepts finite, non-degenerate quaternions whose rotation keeps the vertical
/// axis pointing up. The quaternion does not have to be normalized.
pub fn orientation_problem(orientation: &Quaternion) -> Option<&'static str> {
    let Quaternion { x, y, z, w } = *orientation;
    if ![x, y, z, w].iter().all(|c| c.is_finite()) {
        return Some("quaternion has non-finite elements");
    }

    let raw = nalgebra::Quaternion::new(w, x, y, z);
    if raw.norm_squared() < MIN_SQUARED_LENGTH {
        return Some("quaternion has length close to zero");
    }

    let rotation = UnitQuaternion::from_quaternion(raw);
    let up = Vector3::z();
    let rotated_up = rotation * up;
    if (up.dot(&rotated_up) - 1.0).abs() > UPRIGHT_TOLERANCE {
        return Some("quaternion is not upright, the z-axis must be vertical");
    }

    None
}

pub fn is_orientation_valid(orientation: &Quaternion) -> bool {
    orientation_problem(orientation).is_none()
}

/// Turns a raw `NavigationRequest` into `ValidatedGoals`.
///
/// Structural problems reject the whole request; a bad pose only drops the
/// agent (or sub-goal) it belongs to.
pub struct GoalValidator {
    logger: DynLogger,
}

impl GoalValidator {
    pub fn new(logger: DynLogger) -> Self {
        Self { logger }
    }

    pub fn validate(&self, request: &NavigationRequest) -> DomainResult<ValidatedGoals> {
        if request.start_poses.is_empty() || request.start_poses.len() != request.goal_poses.len() {
            return Err(DomainError::invalid_request(
                "the number of start and goal poses must be equal and greater than zero",
            ));
        }

        let frame_id = &request.start_poses[0].pose.frame_id;
        let mut all_poses = request
            .start_poses
            .iter()
            .chain(request.goal_poses.iter())
            .map(|agent_pose| &agent_pose.pose)
            .chain(request.sub_goal_poses.iter().flat_map(|sequence| sequence.poses.iter()));
        if let Some(other) = all_poses.find(|pose| &pose.frame_id != frame_id) {
            return Err(DomainError::invalid_request(format!(
                "all poses must share one frame, found '{}' and '{}'",
                frame_id, other.frame_id
            )));
        }

        let mut starts = PoseMap::new();
        for start in &request.start_poses {
            if self.usable(&start.pose, &format!("start pose of agent {}", start.agent_id)) {
                starts.insert(start.agent_id, start.pose.clone());
            }
        }

        let mut goals = PoseMap::new();
        for goal in &request.goal_poses {
            if self.usable(&goal.pose, &format!("goal pose of agent {}", goal.agent_id)) {
                goals.insert(goal.agent_id, goal.pose.clone());
            }
        }

        let mut sub_goals = PoseSequenceMap::new();
        for sequence in &request.sub_goal_poses {
            let poses: Vec<StampedPose> = sequence
                .poses
                .iter()
                .enumerate()
                .filter(|(index, pose)| {
                    self.usable(pose, &format!("sub-goal {} of agent {}", index, sequence.agent_id))
                })
                .map(|(_, pose)| pose.clone())
                .collect();
            if !poses.is_empty() {
                sub_goals.insert(sequence.agent_id, poses);
            }
        }

        let unmatched: Vec<_> = starts
            .keys()
            .filter(|id| !goals.contains_key(*id))
            .chain(goals.keys().filter(|id| !starts.contains_key(*id)))
            .copied()
            .collect();
        for agent_id in unmatched {
            self.logger.warn(&format!(
                "Not planning for agent {}, it needs both a valid start and a valid goal pose",
                agent_id
            ));
            starts.remove(&agent_id);
            goals.remove(&agent_id);
        }

        sub_goals.retain(|agent_id, _| {
            let known = goals.contains_key(agent_id);
            if !known {
                self.logger.warn(&format!(
                    "Ignoring sub-goals of agent {}, it has no valid start and goal pose",
                    agent_id
                ));
            }
            known
        });

        if goals.is_empty() {
            return Err(DomainError::invalid_request("no agent has a valid start and goal pose"));
        }

        Ok(ValidatedGoals { starts, sub_goals, goals })
    }

    fn usable(&self, pose: &StampedPose, what: &str) -> bool {
        match orientation_problem(&pose.orientation) {
            Some(problem) => {
                self.logger.warn(&format!("Dropping {}: {}", what, problem));
                false
            }
            None => true,
        }
    }
}
