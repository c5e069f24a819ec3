use crate::common::DomainResult;
use super::types::{AgentId, GridPoint, PoseMap, StampedPose};
use std::sync::{Arc, RwLock};

pub const FREE_SPACE: u8 = 0;
pub const INSCRIBED_INFLATED_OBSTACLE: u8 = 253;
pub const LETHAL_OBSTACLE: u8 = 254;
pub const NO_INFORMATION: u8 = 255;

/// Occupancy grid the planner and controller operate on.
///
/// Implementations are shared behind a lock: readers hold it for the whole
/// of a planning pass or control step so the grid cannot change underneath them.
pub trait Costmap: Send + Sync {
    fn global_frame(&self) -> &str;
    fn size_in_cells(&self) -> (usize, usize);
    fn resolution(&self) -> f64;
    fn cost(&self, x: usize, y: usize) -> u8;
    /// World coordinates into continuous grid coordinates, `None` when off the map.
    fn world_to_cell(&self, wx: f64, wy: f64) -> Option<GridPoint>;
    fn cell_to_world(&self, point: GridPoint) -> (f64, f64);
    /// Clears every dynamic obstacle layer, keeping static map content.
    fn reset_layers(&mut self);
    fn start(&mut self);
    fn stop(&mut self);

    fn is_traversable(&self, x: usize, y: usize, allow_unknown: bool) -> bool {
        let (width, height) = self.size_in_cells();
        if x >= width || y >= height {
            return false;
        }
        match self.cost(x, y) {
            NO_INFORMATION => allow_unknown,
            cost => cost < INSCRIBED_INFLATED_OBSTACLE,
        }
    }
}

pub type SharedCostmap = Arc<RwLock<dyn Costmap>>;

/// Single-agent path search between two grid points.
pub trait Planner: Send + Sync {
    fn name(&self) -> &str;
    /// Returns the path including both end points, or `DomainError::NoPath`.
    fn compute_path(&self, costmap: &dyn Costmap, start: GridPoint, end: GridPoint) -> DomainResult<Vec<GridPoint>>;
}

/// Moves all agents toward their current target waypoints.
pub trait Controller: Send {
    fn name(&self) -> &str;
    /// Sets the target waypoint for every agent in `plans`; agents not named keep their target.
    fn set_plans(&mut self, plans: &PoseMap) -> DomainResult<()>;
    /// Agents that have reached their current target waypoint.
    fn goals_reached(&mut self) -> DomainResult<Vec<AgentId>>;
    fn compute_agent_positions(&mut self, costmap: &dyn Costmap) -> DomainResult<PoseMap>;
    /// Forgets all targets at the end of an episode.
    fn reset(&mut self) {}
}

pub trait PoseTransformer: Send + Sync {
    fn transform_pose(&self, pose: &StampedPose, target_frame: &str) -> DomainResult<StampedPose>;
}
