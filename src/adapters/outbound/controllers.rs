use crate::common::DomainResult;
use crate::config::ControllerConfig;
use crate::domains::navigation::{AgentId, Controller, Costmap, PoseMap, Position3D, Quaternion, StampedPose};
use chrono::Utc;
use std::time::Duration;

fn reached(targets: &PoseMap, positions: &PoseMap, tolerance: f64) -> Vec<AgentId> {
    targets
        .iter()
        .filter(|(agent_id, target)| {
            positions
                .get(*agent_id)
                .map_or(false, |position| position.distance_2d(target) <= tolerance)
        })
        .map(|(agent_id, _)| *agent_id)
        .collect()
}

/// Places every agent on its target waypoint in a single step.
pub struct TeleportController {
    tolerance: f64,
    targets: PoseMap,
    positions: PoseMap,
}

impl TeleportController {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            tolerance: config.goal_tolerance,
            targets: PoseMap::new(),
            positions: PoseMap::new(),
        }
    }
}

impl Controller for TeleportController {
    fn name(&self) -> &str {
        "teleport"
    }

    fn set_plans(&mut self, plans: &PoseMap) -> DomainResult<()> {
        self.targets.extend(plans.iter().map(|(id, pose)| (*id, pose.clone())));
        Ok(())
    }

    fn goals_reached(&mut self) -> DomainResult<Vec<AgentId>> {
        Ok(reached(&self.targets, &self.positions, self.tolerance))
    }

    fn compute_agent_positions(&mut self, _costmap: &dyn Costmap) -> DomainResult<PoseMap> {
        let now = Utc::now();
        for (agent_id, target) in &self.targets {
            let mut pose = target.clone();
            pose.stamp = now;
            self.positions.insert(*agent_id, pose);
        }
        Ok(self
            .targets
            .keys()
            .filter_map(|id| self.positions.get(id).map(|pose| (*id, pose.clone())))
            .collect())
    }

    fn reset(&mut self) {
        self.targets.clear();
        self.positions.clear();
    }
}

/// Moves every agent toward its target at a bounded speed, one control period per step.
///
/// An agent first seen by the controller starts on its first target waypoint.
pub struct LinearController {
    tolerance: f64,
    max_step: f64,
    targets: PoseMap,
    positions: PoseMap,
}

impl LinearController {
    pub fn new(config: &ControllerConfig, control_period: Duration) -> Self {
        Self {
            tolerance: config.goal_tolerance,
            max_step: config.max_speed * control_period.as_secs_f64(),
            targets: PoseMap::new(),
            positions: PoseMap::new(),
        }
    }

    fn step_towards(&self, from: &StampedPose, to: &StampedPose) -> StampedPose {
        let dx = to.position.x - from.position.x;
        let dy = to.position.y - from.position.y;
        let distance = (dx * dx + dy * dy).sqrt();

        let mut next = to.clone();
        next.stamp = Utc::now();
        if distance > self.max_step && distance > 0.0 {
            let ratio = self.max_step / distance;
            next.position = Position3D {
                x: from.position.x + dx * ratio,
                y: from.position.y + dy * ratio,
                z: from.position.z,
            };
            next.orientation = Quaternion::from_yaw(dy.atan2(dx));
        }
        next
    }
}

impl Controller for LinearController {
    fn name(&self) -> &str {
        "linear"
    }

    fn set_plans(&mut self, plans: &PoseMap) -> DomainResult<()> {
        for (agent_id, pose) in plans {
            self.positions.entry(*agent_id).or_insert_with(|| pose.clone());
            self.targets.insert(*agent_id, pose.clone());
        }
        Ok(())
    }

    fn goals_reached(&mut self) -> DomainResult<Vec<AgentId>> {
        Ok(reached(&self.targets, &self.positions, self.tolerance))
    }

    fn compute_agent_positions(&mut self, _costmap: &dyn Costmap) -> DomainResult<PoseMap> {
        let mut poses = PoseMap::new();
        for (agent_id, target) in &self.targets {
            let next = match self.positions.get(agent_id) {
                Some(current) => self.step_towards(current, target),
                None => target.clone(),
            };
            poses.insert(*agent_id, next);
        }
        self.positions.extend(poses.iter().map(|(id, pose)| (*id, pose.clone())));
        Ok(poses)
    }

    fn reset(&mut self) {
        self.targets.clear();
    }
}
