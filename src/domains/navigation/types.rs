use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Identifier of a single agent taking part in a navigation episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AgentId {
    fn from(value: u64) -> Self {
        AgentId(value)
    }
}

pub type EpisodeId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub fn identity() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }

    /// Rotation about the vertical axis only.
    pub fn from_yaw(yaw: f64) -> Self {
        let half = yaw * 0.5;
        Self { x: 0.0, y: 0.0, z: half.sin(), w: half.cos() }
    }

    pub fn yaw(&self) -> f64 {
        let siny_cosp = 2.0 * (self.w * self.z + self.x * self.y);
        let cosy_cosp = 1.0 - 2.0 * (self.y * self.y + self.z * self.z);
        siny_cosp.atan2(cosy_cosp)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedPose {
    pub frame_id: String,
    #[serde(default = "Utc::now")]
    pub stamp: DateTime<Utc>,
    pub position: Position3D,
    #[serde(default)]
    pub orientation: Quaternion,
}

impl StampedPose {
    /// Planar pose on the ground plane stamped with the current time.
    pub fn planar(frame_id: impl Into<String>, x: f64, y: f64, yaw: f64) -> Self {
        Self {
            frame_id: frame_id.into(),
            stamp: Utc::now(),
            position: Position3D { x, y, z: 0.0 },
            orientation: Quaternion::from_yaw(yaw),
        }
    }

    pub fn distance_2d(&self, other: &StampedPose) -> f64 {
        let dx = self.position.x - other.position.x;
        let dy = self.position.y - other.position.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPose {
    pub agent_id: AgentId,
    pub pose: StampedPose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPoseSequence {
    pub agent_id: AgentId,
    pub poses: Vec<StampedPose>,
}

/// A navigation goal as submitted by a client, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub start_poses: Vec<AgentPose>,
    pub goal_poses: Vec<AgentPose>,
    #[serde(default)]
    pub sub_goal_poses: Vec<AgentPoseSequence>,
}

impl NavigationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent(mut self, agent_id: impl Into<AgentId>, start: StampedPose, goal: StampedPose) -> Self {
        let agent_id = agent_id.into();
        self.start_poses.push(AgentPose { agent_id, pose: start });
        self.goal_poses.push(AgentPose { agent_id, pose: goal });
        self
    }

    pub fn with_sub_goals(mut self, agent_id: impl Into<AgentId>, poses: Vec<StampedPose>) -> Self {
        self.sub_goal_poses.push(AgentPoseSequence {
            agent_id: agent_id.into(),
            poses,
        });
        self
    }
}

pub type PoseMap = BTreeMap<AgentId, StampedPose>;
pub type PoseSequenceMap = BTreeMap<AgentId, Vec<StampedPose>>;

/// Goals that survived validation. Every agent in `starts` also has an
/// entry in `goals` and vice versa; `sub_goals` only names agents of those two.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedGoals {
    pub starts: PoseMap,
    pub sub_goals: PoseSequenceMap,
    pub goals: PoseMap,
}

impl ValidatedGoals {
    pub fn agent_ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.goals.keys().copied()
    }

    pub fn agent_count(&self) -> usize {
        self.goals.len()
    }

    /// Frame shared by all goal poses, if there is at least one goal.
    pub fn frame_id(&self) -> Option<&str> {
        self.goals.values().next().map(|pose| pose.frame_id.as_str())
    }
}

/// Continuous costmap coordinates; one unit corresponds to one cell.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GridPoint {
    pub x: f64,
    pub y: f64,
}

impl GridPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Index of the cell this point falls into, if it is not left of or below the grid.
    pub fn cell(&self) -> Option<(usize, usize)> {
        let x = (self.x + 0.5).floor();
        let y = (self.y + 0.5).floor();
        if x < 0.0 || y < 0.0 || !x.is_finite() || !y.is_finite() {
            return None;
        }
        Some((x as usize, y as usize))
    }

    pub fn distance(&self, other: &GridPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinatorState {
    Idle,
    Planning,
    Controlling,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoordinatorState::Idle => "IDLE",
            CoordinatorState::Planning => "PLANNING",
            CoordinatorState::Controlling => "CONTROLLING",
        };
        f.write_str(name)
    }
}

/// Terminal result of a navigation episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EpisodeOutcome {
    Succeeded,
    Aborted { reason: String },
    Preempted,
}

impl EpisodeOutcome {
    pub fn aborted(reason: impl Into<String>) -> Self {
        EpisodeOutcome::Aborted { reason: reason.into() }
    }
}

/// Current positions of all agents of an episode after a control cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationFeedback {
    pub episode_id: EpisodeId,
    pub poses: PoseMap,
    pub timestamp: DateTime<Utc>,
}
