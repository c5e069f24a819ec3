use crate::common::DomainEvent;
use super::types::{AgentId, CoordinatorState, EpisodeId, EpisodeOutcome, PoseMap};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NavigationEvent {
    EpisodeAccepted {
        episode_id: EpisodeId,
        goals: PoseMap,
        timestamp: DateTime<Utc>,
    },
    StateChanged {
        episode_id: Option<EpisodeId>,
        from: CoordinatorState,
        to: CoordinatorState,
        timestamp: DateTime<Utc>,
    },
    PlanActivated {
        episode_id: EpisodeId,
        generation: u64,
        agents: Vec<AgentId>,
        timestamp: DateTime<Utc>,
    },
    Feedback {
        episode_id: EpisodeId,
        poses: PoseMap,
        timestamp: DateTime<Utc>,
    },
    EpisodeSucceeded {
        episode_id: EpisodeId,
        timestamp: DateTime<Utc>,
    },
    EpisodeAborted {
        episode_id: EpisodeId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    EpisodePreempted {
        episode_id: EpisodeId,
        timestamp: DateTime<Utc>,
    },
}

impl NavigationEvent {
    pub fn episode_id(&self) -> Option<EpisodeId> {
        match self {
            NavigationEvent::EpisodeAccepted { episode_id, .. } => Some(*episode_id),
            NavigationEvent::StateChanged { episode_id, .. } => *episode_id,
            NavigationEvent::PlanActivated { episode_id, .. } => Some(*episode_id),
            NavigationEvent::Feedback { episode_id, .. } => Some(*episode_id),
            NavigationEvent::EpisodeSucceeded { episode_id, .. } => Some(*episode_id),
            NavigationEvent::EpisodeAborted { episode_id, .. } => Some(*episode_id),
            NavigationEvent::EpisodePreempted { episode_id, .. } => Some(*episode_id),
        }
    }

    /// Terminal outcome carried by this event, if it ends an episode.
    pub fn outcome(&self) -> Option<EpisodeOutcome> {
        match self {
            NavigationEvent::EpisodeSucceeded { .. } => Some(EpisodeOutcome::Succeeded),
            NavigationEvent::EpisodeAborted { reason, .. } => Some(EpisodeOutcome::aborted(reason.clone())),
            NavigationEvent::EpisodePreempted { .. } => Some(EpisodeOutcome::Preempted),
            _ => None,
        }
    }
}

impl DomainEvent for NavigationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            NavigationEvent::EpisodeAccepted { .. } => "EpisodeAccepted",
            NavigationEvent::StateChanged { .. } => "StateChanged",
            NavigationEvent::PlanActivated { .. } => "PlanActivated",
            NavigationEvent::Feedback { .. } => "Feedback",
            NavigationEvent::EpisodeSucceeded { .. } => "EpisodeSucceeded",
            NavigationEvent::EpisodeAborted { .. } => "EpisodeAborted",
            NavigationEvent::EpisodePreempted { .. } => "EpisodePreempted",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            NavigationEvent::EpisodeAccepted { timestamp, .. } => *timestamp,
            NavigationEvent::StateChanged { timestamp, .. } => *timestamp,
            NavigationEvent::PlanActivated { timestamp, .. } => *timestamp,
            NavigationEvent::Feedback { timestamp, .. } => *timestamp,
            NavigationEvent::EpisodeSucceeded { timestamp, .. } => *timestamp,
            NavigationEvent::EpisodeAborted { timestamp, .. } => *timestamp,
            NavigationEvent::EpisodePreempted { timestamp, .. } => *timestamp,
        }
    }
}
