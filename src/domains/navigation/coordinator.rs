use crate::common::DomainResult;
use crate::domains::logger::DynLogger;
use super::control::ControlPlan;
use super::events::NavigationEvent;
use super::frames::FrameNormalizer;
use super::plan_store::PlanStore;
use super::ports::{Controller, Planner, PoseTransformer, SharedCostmap};
use super::requests::PlanningRequests;
use super::types::{CoordinatorState, EpisodeId, EpisodeOutcome, PoseMap, NavigationRequest, ValidatedGoals};
use super::validation::GoalValidator;
use super::worker::{PassReport, PlanningWorker};
use chrono::Utc;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationSettings {
    /// Zero plans once per request.
    pub planning_period: Duration,
    pub publish_feedback: bool,
    /// Stop both costmaps while idle and start them when an episode is accepted.
    pub shutdown_costmaps: bool,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            planning_period: Duration::ZERO,
            publish_feedback: true,
            shutdown_costmaps: false,
        }
    }
}

/// Plugins and shared resources the navigation core is built from.
pub struct NavigationParts {
    pub planner: Arc<dyn Planner>,
    pub controller: Box<dyn Controller>,
    pub transformer: Arc<dyn PoseTransformer>,
    pub planner_costmap: SharedCostmap,
    pub controller_costmap: SharedCostmap,
    pub logger: DynLogger,
}

/// Wires a coordinator and its planning worker around one `PlanStore`.
pub fn assemble(parts: NavigationParts, settings: NavigationSettings) -> (NavigationCoordinator, PlanningWorker) {
    let plan_store = Arc::new(PlanStore::new());
    let requests = Arc::new(PlanningRequests::new(settings.planning_period));
    let (report_tx, report_rx) = mpsc::unbounded_channel();

    let worker = PlanningWorker::new(
        parts.planner,
        Arc::clone(&parts.planner_costmap),
        Arc::clone(&plan_store),
        Arc::clone(&requests),
        report_tx,
        parts.logger.clone(),
    );

    let coordinator = NavigationCoordinator {
        state: CoordinatorState::Idle,
        settings,
        validator: GoalValidator::new(parts.logger.clone()),
        normalizer: FrameNormalizer::new(parts.transformer, parts.logger.clone()),
        requests,
        plan_store,
        reports: report_rx,
        controller: parts.controller,
        planner_costmap: parts.planner_costmap,
        controller_costmap: parts.controller_costmap,
        episode: None,
        control: None,
        uncommitted_events: Vec::new(),
        logger: parts.logger,
    };
    if coordinator.settings.shutdown_costmaps {
        coordinator.set_costmaps_running(false);
    }

    (coordinator, worker)
}

#[derive(Debug, Clone)]
struct Episode {
    id: EpisodeId,
    goals: ValidatedGoals,
    /// Frame the goals were last normalized into.
    target_frame: String,
    generation: u64,
}

/// Episode state machine driven by the control loop.
///
/// Owns the coordinator state exclusively. The planning worker only talks to
/// it through `PlanningRequests`, the `PlanStore` and pass reports. Every
/// externally visible change is recorded as a `NavigationEvent`.
pub struct NavigationCoordinator {
    state: CoordinatorState,
    settings: NavigationSettings,
    validator: GoalValidator,
    normalizer: FrameNormalizer,
    requests: Arc<PlanningRequests>,
    plan_store: Arc<PlanStore>,
    reports: mpsc::UnboundedReceiver<PassReport>,
    controller: Box<dyn Controller>,
    planner_costmap: SharedCostmap,
    controller_costmap: SharedCostmap,
    episode: Option<Episode>,
    control: Option<ControlPlan>,
    uncommitted_events: Vec<NavigationEvent>,
    logger: DynLogger,
}

impl NavigationCoordinator {
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn current_episode(&self) -> Option<EpisodeId> {
        self.episode.as_ref().map(|episode| episode.id)
    }

    pub fn active_goals(&self) -> Option<&PoseMap> {
        self.episode.as_ref().map(|episode| &episode.goals.goals)
    }

    pub fn current_generation(&self) -> Option<u64> {
        self.episode.as_ref().map(|episode| episode.generation)
    }

    pub fn control_plan(&self) -> Option<&ControlPlan> {
        self.control.as_ref()
    }

    /// Validates and accepts a new episode, preempting the current one.
    ///
    /// An invalid request is rejected without touching the running episode.
    pub fn submit(&mut self, request: &NavigationRequest) -> DomainResult<EpisodeId> {
        let goals = self.validator.validate(request)?;

        if let Some(previous) = self.episode.take() {
            self.logger.info(&format!("Preempting episode {} for a new goal", previous.id));
            self.add_event(NavigationEvent::EpisodePreempted {
                episode_id: previous.id,
                timestamp: Utc::now(),
            });
            self.controller.reset();
        }
        self.control = None;

        if self.settings.shutdown_costmaps {
            self.set_costmaps_running(true);
        }

        let id = Uuid::new_v4();
        let target_frame = self.planner_frame();
        let goals = self.normalizer.goals_to_target_frame(&goals, &target_frame);
        self.logger.info(&format!(
            "Accepted episode {} for {} agents in frame '{}'",
            id,
            goals.agent_count(),
            target_frame
        ));
        self.add_event(NavigationEvent::EpisodeAccepted {
            episode_id: id,
            goals: goals.goals.clone(),
            timestamp: Utc::now(),
        });
        self.begin_planning(id, goals, target_frame);
        Ok(id)
    }

    /// Preempts the running episode. Returns its id, or `None` when idle.
    pub fn cancel(&mut self) -> Option<EpisodeId> {
        let episode = self.episode.as_ref()?;
        let id = episode.id;
        self.logger.info(&format!("Episode {} was cancelled", id));
        self.finish(EpisodeOutcome::Preempted);
        Some(id)
    }

    /// Resets the obstacle layers of both costmaps.
    pub fn clear_obstacle_layers(&self) {
        for costmap in [&self.planner_costmap, &self.controller_costmap] {
            costmap.write().unwrap_or_else(PoisonError::into_inner).reset_layers();
        }
        self.logger.info("Cleared the obstacle layers of both costmaps");
    }

    pub fn set_planning_period(&mut self, period: Duration) {
        self.settings.planning_period = period;
        self.requests.set_planning_period(period);
    }

    /// Aborts a live episode and stops the planning worker.
    pub fn shutdown(&mut self) {
        if self.episode.is_some() {
            self.finish(EpisodeOutcome::aborted(
                "Aborting the episode because the navigation server is shutting down",
            ));
        }
        self.requests.shutdown();
    }

    /// One control cycle. Returns the state after the cycle.
    pub fn tick(&mut self) -> CoordinatorState {
        self.drain_reports();
        if self.episode.is_none() {
            return self.state;
        }

        self.activate_new_plan();
        if self.episode.is_none() {
            return self.state;
        }

        self.replan_if_frame_changed();

        match self.state {
            CoordinatorState::Controlling => self.control_cycle(),
            CoordinatorState::Planning | CoordinatorState::Idle => {}
        }
        self.state
    }

    pub fn uncommitted_events(&self) -> &[NavigationEvent] {
        &self.uncommitted_events
    }

    pub fn mark_events_as_committed(&mut self) {
        self.uncommitted_events.clear();
    }

    pub fn drain_events(&mut self) -> Vec<NavigationEvent> {
        std::mem::take(&mut self.uncommitted_events)
    }

    fn add_event(&mut self, event: NavigationEvent) {
        self.uncommitted_events.push(event);
    }

    fn planner_frame(&self) -> String {
        self.planner_costmap
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .global_frame()
            .to_string()
    }

    fn begin_planning(&mut self, id: EpisodeId, goals: ValidatedGoals, target_frame: String) {
        let generation = self.requests.request(goals.clone());
        self.episode = Some(Episode {
            id,
            goals,
            target_frame,
            generation,
        });
        self.transition(CoordinatorState::Planning);
    }

    fn transition(&mut self, to: CoordinatorState) {
        if self.state == to {
            return;
        }
        let from = self.state;
        self.state = to;
        self.logger.info(&format!("Changed from {} to {} state", from, to));
        self.add_event(NavigationEvent::StateChanged {
            episode_id: self.current_episode(),
            from,
            to,
            timestamp: Utc::now(),
        });
    }

    fn finish(&mut self, outcome: EpisodeOutcome) {
        let Some(episode) = self.episode.take() else {
            return;
        };
        let timestamp = Utc::now();
        let event = match outcome {
            EpisodeOutcome::Succeeded => NavigationEvent::EpisodeSucceeded {
                episode_id: episode.id,
                timestamp,
            },
            EpisodeOutcome::Aborted { reason } => {
                self.logger.warn(&format!("Aborting episode {}: {}", episode.id, reason));
                NavigationEvent::EpisodeAborted {
                    episode_id: episode.id,
                    reason,
                    timestamp,
                }
            }
            EpisodeOutcome::Preempted => NavigationEvent::EpisodePreempted {
                episode_id: episode.id,
                timestamp,
            },
        };
        self.add_event(event);
        self.reset_state();
    }

    fn reset_state(&mut self) {
        self.requests.stop();
        self.plan_store.clear();
        self.control = None;
        self.controller.reset();
        self.transition(CoordinatorState::Idle);
        if self.settings.shutdown_costmaps {
            self.set_costmaps_running(false);
        }
    }

    fn set_costmaps_running(&self, running: bool) {
        for costmap in [&self.planner_costmap, &self.controller_costmap] {
            let mut costmap = costmap.write().unwrap_or_else(PoisonError::into_inner);
            if running {
                costmap.start();
            } else {
                costmap.stop();
            }
        }
    }

    fn drain_reports(&mut self) {
        while let Ok(report) = self.reports.try_recv() {
            let Some(generation) = self.current_generation() else {
                continue;
            };
            if report.generation != generation {
                self.logger.info(&format!(
                    "Ignoring result of superseded planning pass {}",
                    report.generation
                ));
                continue;
            }

            if report.committed {
                if self.state == CoordinatorState::Planning {
                    self.transition(CoordinatorState::Controlling);
                }
            } else if self.state == CoordinatorState::Planning {
                self.logger.info("No plans calculated, aborting");
                self.finish(EpisodeOutcome::aborted("The planner could not calculate any plans"));
                return;
            } else {
                self.logger.warn("Replanning produced no plans, keeping the active plan");
            }
        }
    }

    fn activate_new_plan(&mut self) {
        let Some(generation) = self.current_generation() else {
            return;
        };
        let Some(plan) = self.plan_store.activate_pending(generation) else {
            return;
        };

        for (agent_id, route) in plan.iter() {
            self.logger.info(&format!("Got a plan with {} waypoints for agent {}", route.len(), agent_id));
        }

        let control = ControlPlan::new(plan);
        let fronts = control.front_waypoints();
        if let Some(episode_id) = self.current_episode() {
            self.add_event(NavigationEvent::PlanActivated {
                episode_id,
                generation: control.generation(),
                agents: control.agents().collect(),
                timestamp: Utc::now(),
            });
        }

        if let Some(previous) = self.control.take() {
            // Agents missing from the new plan must not keep their old targets.
            if previous.agents().any(|agent_id| control.plan().route(agent_id).is_none()) {
                self.controller.reset();
            }
        }
        if let Err(e) = self.controller.set_plans(&fronts) {
            self.logger.error(&format!("Controller '{}' rejected the plans: {}", self.controller.name(), e));
            self.finish(EpisodeOutcome::aborted("Failed to pass the plans to the controller"));
            return;
        }
        self.control = Some(control);
    }

    fn replan_if_frame_changed(&mut self) {
        let frame = self.planner_frame();
        let Some(episode) = self.episode.as_ref() else {
            return;
        };
        if episode.target_frame == frame {
            return;
        }

        self.logger.info(&format!("Replanning as the global frame has changed to '{}'", frame));
        let id = episode.id;
        let goals = self.normalizer.goals_to_target_frame(&episode.goals, &frame);
        self.begin_planning(id, goals, frame);
    }

    /// Records where the agents are, so replanning starts from there instead of
    /// from the submitted start poses.
    fn track_positions(&mut self, poses: &PoseMap) {
        let Some(episode) = self.episode.as_mut() else {
            return;
        };
        let positions = self.normalizer.to_target_frame(poses, &episode.target_frame);
        for (agent_id, pose) in positions {
            if let Some(start) = episode.goals.starts.get_mut(&agent_id) {
                *start = pose;
            }
        }
        if !self.settings.planning_period.is_zero() {
            self.requests.update_starts(episode.generation, &episode.goals.starts);
        }
    }

    fn control_cycle(&mut self) {
        let reached = match self.controller.goals_reached() {
            Ok(reached) => reached,
            Err(e) => {
                self.finish(EpisodeOutcome::aborted(format!("Controller failure: {}", e)));
                return;
            }
        };

        let Some(control) = self.control.as_mut() else {
            return;
        };
        if !reached.is_empty() {
            let changed = control.advance(&reached);
            if !changed.is_empty() {
                if let Err(e) = self.controller.set_plans(&changed) {
                    self.logger.error(&format!("Failed to pass the new waypoints to the controller: {}", e));
                }
            }
        }
        if control.is_complete() {
            self.logger.info("All goals reached!");
            self.finish(EpisodeOutcome::Succeeded);
            return;
        }

        let positions = {
            let costmap = self.controller_costmap.read().unwrap_or_else(PoisonError::into_inner);
            self.controller.compute_agent_positions(&*costmap)
        };
        match positions {
            Ok(poses) => {
                self.track_positions(&poses);
                if self.settings.publish_feedback {
                    if let Some(episode_id) = self.current_episode() {
                        self.add_event(NavigationEvent::Feedback {
                            episode_id,
                            poses,
                            timestamp: Utc::now(),
                        });
                    }
                }
            }
            Err(e) => {
                self.logger.error(&format!("Controller could not compute agent positions: {}", e));
                self.finish(EpisodeOutcome::aborted(
                    "The controller could not calculate new agent positions",
                ));
            }
        }
    }
}
