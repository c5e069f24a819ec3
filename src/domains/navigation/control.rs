use super::plan_store::Plan;
use super::types::{AgentId, PoseMap, StampedPose};
use std::collections::BTreeMap;
use std::sync::Arc;

/// The controller's view of the active plan: a cursor per agent pointing at
/// its current target waypoint. Waypoints behind the cursor are consumed.
#[derive(Debug, Clone)]
pub struct ControlPlan {
    plan: Arc<Plan>,
    cursors: BTreeMap<AgentId, usize>,
}

impl ControlPlan {
    pub fn new(plan: Arc<Plan>) -> Self {
        let cursors = plan.agents().map(|agent_id| (agent_id, 0)).collect();
        Self { plan, cursors }
    }

    pub fn plan(&self) -> &Arc<Plan> {
        &self.plan
    }

    pub fn generation(&self) -> u64 {
        self.plan.generation()
    }

    pub fn agents(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.cursors.keys().copied()
    }

    pub fn front(&self, agent_id: AgentId) -> Option<&StampedPose> {
        let cursor = *self.cursors.get(&agent_id)?;
        self.plan.route(agent_id)?.get(cursor)
    }

    /// Current target of every agent that still has waypoints left.
    pub fn front_waypoints(&self) -> PoseMap {
        self.cursors
            .keys()
            .filter_map(|agent_id| self.front(*agent_id).map(|pose| (*agent_id, pose.clone())))
            .collect()
    }

    pub fn remaining(&self, agent_id: AgentId) -> usize {
        match (self.cursors.get(&agent_id), self.plan.route(agent_id)) {
            (Some(cursor), Some(route)) => route.len().saturating_sub(*cursor),
            _ => 0,
        }
    }

    /// Consumes the front waypoint of each reached agent and returns the new
    /// fronts of those agents that still have one.
    pub fn advance(&mut self, reached: &[AgentId]) -> PoseMap {
        let mut changed = PoseMap::new();
        for agent_id in reached {
            let Some(route) = self.plan.route(*agent_id) else {
                continue;
            };
            let Some(cursor) = self.cursors.get_mut(agent_id) else {
                continue;
            };
            if *cursor >= route.len() {
                continue;
            }
            *cursor += 1;
            if let Some(next) = route.get(*cursor) {
                changed.insert(*agent_id, next.clone());
            }
        }
        changed
    }

    pub fn is_complete(&self) -> bool {
        self.cursors.keys().all(|agent_id| self.remaining(*agent_id) == 0)
    }
}
