use crate::adapters::outbound::{PluginRegistry, StaticCostmap, StaticTransformTree};
use crate::common::{ApplicationError, ApplicationResult, DomainEvent, DomainResult};
use crate::config::Config;
use crate::domains::logger::DynLogger;
use crate::domains::navigation::{
    assemble, CoordinatorState, EpisodeId, EpisodeOutcome, NavigationCoordinator, NavigationEvent,
    NavigationFeedback, NavigationParts, NavigationRequest, NavigationSettings, PoseMap, SharedCostmap,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const COMMAND_CAPACITY: usize = 32;
const FEEDBACK_CAPACITY: usize = 64;

/// Runtime-adjustable loop rates. `None` leaves a rate unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateConfig {
    /// Zero disables periodic replanning.
    pub planning_period: Option<Duration>,
    pub control_period: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationStatus {
    pub state: CoordinatorState,
    pub episode_id: Option<EpisodeId>,
    pub active_goals: PoseMap,
}

impl Default for NavigationStatus {
    fn default() -> Self {
        Self {
            state: CoordinatorState::Idle,
            episode_id: None,
            active_goals: PoseMap::new(),
        }
    }
}

/// Client side of one accepted episode.
pub struct EpisodeHandle {
    pub id: EpisodeId,
    pub feedback: mpsc::Receiver<NavigationFeedback>,
    pub outcome: oneshot::Receiver<EpisodeOutcome>,
}

impl EpisodeHandle {
    /// Waits for the terminal outcome, ignoring feedback.
    pub async fn wait(self) -> EpisodeOutcome {
        self.outcome
            .await
            .unwrap_or_else(|_| EpisodeOutcome::aborted("The navigation server stopped"))
    }
}

enum NavigationCommand {
    Submit {
        request: NavigationRequest,
        reply: oneshot::Sender<DomainResult<EpisodeHandle>>,
    },
    Cancel {
        reply: oneshot::Sender<Option<EpisodeId>>,
    },
    ClearObstacleLayers {
        reply: oneshot::Sender<()>,
    },
    Reconfigure {
        rates: RateConfig,
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

struct EpisodeSink {
    feedback: mpsc::Sender<NavigationFeedback>,
    outcome: oneshot::Sender<EpisodeOutcome>,
}

/// Async front end of the navigation core.
///
/// Runs the coordinator on a fixed-rate control task and the planning worker
/// on its own task. All calls are forwarded to the control task, so the
/// coordinator is only ever touched from one place.
pub struct NavigationService {
    commands: mpsc::Sender<NavigationCommand>,
    status: watch::Receiver<NavigationStatus>,
    control_task: JoinHandle<()>,
    worker_task: JoinHandle<()>,
}

impl NavigationService {
    /// Spawns the control and planning tasks. Must be called within a tokio runtime.
    pub fn start(parts: NavigationParts, settings: NavigationSettings, control_period: Duration, missed_cycle_warn_threshold: u32) -> Self {
        let (coordinator, worker) = assemble(parts, settings);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (status_tx, status_rx) = watch::channel(NavigationStatus::default());

        let worker_task = tokio::spawn(worker.run());
        let control_loop = ControlLoop {
            coordinator,
            commands: command_rx,
            episodes: HashMap::new(),
            status: status_tx,
            control_period,
            monitor: CycleMonitor::new(missed_cycle_warn_threshold),
        };
        let control_task = tokio::spawn(control_loop.run());

        Self {
            commands: command_tx,
            status: status_rx,
            control_task,
            worker_task,
        }
    }

    /// Builds the plugins, costmaps and transforms described by `config` and starts the service.
    pub fn from_config(config: &Config, logger: DynLogger) -> ApplicationResult<Self> {
        Self::from_config_with_registry(config, &PluginRegistry::with_defaults(), logger)
    }

    pub fn from_config_with_registry(config: &Config, registry: &PluginRegistry, logger: DynLogger) -> ApplicationResult<Self> {
        config.validate()?;
        let planner = registry.create_planner(&config.navigation.planner, config)?;
        let controller = registry.create_controller(&config.navigation.controller, config)?;

        let planner_costmap: SharedCostmap = Arc::new(RwLock::new(StaticCostmap::from_config(&config.costmap)));
        let controller_costmap: SharedCostmap = Arc::new(RwLock::new(StaticCostmap::from_config(&config.costmap)));

        let mut transforms = StaticTransformTree::new(config.costmap.global_frame.clone());
        for frame in &config.frames {
            transforms.insert_frame(frame.name.clone(), frame.x, frame.y, frame.yaw);
        }

        info!(
            planner = %config.navigation.planner,
            controller = %config.navigation.controller,
            frame = %config.costmap.global_frame,
            "Starting navigation service"
        );

        let parts = NavigationParts {
            planner,
            controller,
            transformer: Arc::new(transforms),
            planner_costmap,
            controller_costmap,
            logger,
        };
        Ok(Self::start(
            parts,
            NavigationSettings::from(&config.navigation),
            config.navigation.control_period(),
            config.navigation.missed_cycle_warn_threshold,
        ))
    }

    async fn call<T>(&self, command: NavigationCommand, reply: oneshot::Receiver<T>) -> ApplicationResult<T> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ApplicationError::ServiceUnavailable("control loop has stopped".to_string()))?;
        reply
            .await
            .map_err(|_| ApplicationError::ServiceUnavailable("control loop dropped the request".to_string()))
    }

    /// Submits a new goal, preempting any running episode.
    pub async fn submit(&self, request: NavigationRequest) -> ApplicationResult<EpisodeHandle> {
        let (reply, rx) = oneshot::channel();
        let handle = self.call(NavigationCommand::Submit { request, reply }, rx).await??;
        Ok(handle)
    }

    /// Cancels the running episode, if any.
    pub async fn cancel(&self) -> ApplicationResult<Option<EpisodeId>> {
        let (reply, rx) = oneshot::channel();
        self.call(NavigationCommand::Cancel { reply }, rx).await
    }

    pub async fn clear_obstacle_layers(&self) -> ApplicationResult<()> {
        let (reply, rx) = oneshot::channel();
        self.call(NavigationCommand::ClearObstacleLayers { reply }, rx).await
    }

    pub async fn reconfigure(&self, rates: RateConfig) -> ApplicationResult<()> {
        let (reply, rx) = oneshot::channel();
        self.call(NavigationCommand::Reconfigure { rates, reply }, rx).await
    }

    pub fn status(&self) -> watch::Receiver<NavigationStatus> {
        self.status.clone()
    }

    pub fn current_state(&self) -> CoordinatorState {
        self.status.borrow().state
    }

    /// Aborts a live episode, then stops both tasks.
    pub async fn shutdown(self) -> ApplicationResult<()> {
        // The control loop also stops when the command channel closes.
        let _ = self.commands.send(NavigationCommand::Shutdown).await;
        self.control_task
            .await
            .map_err(|e| ApplicationError::ServiceUnavailable(format!("control task failed: {}", e)))?;
        self.worker_task
            .await
            .map_err(|e| ApplicationError::ServiceUnavailable(format!("planning task failed: {}", e)))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleVerdict {
    OnTime,
    Missed { consecutive: u32 },
    Escalated { consecutive: u32 },
}

/// Counts control cycles that overran their period while agents were being controlled.
#[derive(Debug, Clone)]
pub struct CycleMonitor {
    consecutive_misses: u32,
    warn_threshold: u32,
}

impl CycleMonitor {
    pub fn new(warn_threshold: u32) -> Self {
        Self {
            consecutive_misses: 0,
            warn_threshold,
        }
    }

    pub fn record(&mut self, elapsed: Duration, period: Duration, controlling: bool) -> CycleVerdict {
        if !controlling || elapsed <= period {
            self.consecutive_misses = 0;
            return CycleVerdict::OnTime;
        }
        self.consecutive_misses += 1;
        if self.warn_threshold > 0 && self.consecutive_misses >= self.warn_threshold {
            CycleVerdict::Escalated {
                consecutive: self.consecutive_misses,
            }
        } else {
            CycleVerdict::Missed {
                consecutive: self.consecutive_misses,
            }
        }
    }
}

struct ControlLoop {
    coordinator: NavigationCoordinator,
    commands: mpsc::Receiver<NavigationCommand>,
    episodes: HashMap<EpisodeId, EpisodeSink>,
    status: watch::Sender<NavigationStatus>,
    control_period: Duration,
    monitor: CycleMonitor,
}

impl ControlLoop {
    async fn run(mut self) {
        let mut interval = Self::interval(self.control_period);

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(NavigationCommand::Shutdown) | None => break,
                    Some(command) => {
                        if let Some(period) = self.handle_command(command) {
                            interval = Self::interval(period);
                        }
                    }
                },
                _ = interval.tick() => self.run_cycle(),
            }
            self.publish_status();
        }

        info!("Navigation control loop shutting down");
        self.coordinator.shutdown();
        self.route_events();
        self.publish_status();
    }

    fn interval(period: Duration) -> tokio::time::Interval {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    /// Returns a new control period when one was requested.
    fn handle_command(&mut self, command: NavigationCommand) -> Option<Duration> {
        match command {
            NavigationCommand::Submit { request, reply } => {
                let result = self.coordinator.submit(&request).map(|id| {
                    let (feedback_tx, feedback_rx) = mpsc::channel(FEEDBACK_CAPACITY);
                    let (outcome_tx, outcome_rx) = oneshot::channel();
                    self.episodes.insert(
                        id,
                        EpisodeSink {
                            feedback: feedback_tx,
                            outcome: outcome_tx,
                        },
                    );
                    EpisodeHandle {
                        id,
                        feedback: feedback_rx,
                        outcome: outcome_rx,
                    }
                });
                self.route_events();
                self.publish_status();
                let _ = reply.send(result);
                None
            }
            NavigationCommand::Cancel { reply } => {
                let cancelled = self.coordinator.cancel();
                self.route_events();
                self.publish_status();
                let _ = reply.send(cancelled);
                None
            }
            NavigationCommand::ClearObstacleLayers { reply } => {
                self.coordinator.clear_obstacle_layers();
                let _ = reply.send(());
                None
            }
            NavigationCommand::Reconfigure { rates, reply } => {
                if let Some(period) = rates.planning_period {
                    info!(?period, "Planning period reconfigured");
                    self.coordinator.set_planning_period(period);
                }
                let control_period = rates.control_period.filter(|period| !period.is_zero());
                if let Some(period) = control_period {
                    info!(?period, "Control period reconfigured");
                    self.control_period = period;
                }
                let _ = reply.send(());
                control_period
            }
            NavigationCommand::Shutdown => None,
        }
    }

    fn run_cycle(&mut self) {
        let started = Instant::now();
        let state = self.coordinator.tick();
        self.route_events();

        let elapsed = started.elapsed();
        let controlling = state == CoordinatorState::Controlling;
        match self.monitor.record(elapsed, self.control_period, controlling) {
            CycleVerdict::OnTime => {}
            CycleVerdict::Missed { .. } => warn!(
                "Control loop missed its desired period of {:?}, the cycle took {:?}",
                self.control_period, elapsed
            ),
            CycleVerdict::Escalated { consecutive } => warn!(
                "Control loop missed its desired period of {:?} in {} consecutive cycles",
                self.control_period, consecutive
            ),
        }
    }

    fn route_events(&mut self) {
        for event in self.coordinator.drain_events() {
            debug!(event = event.event_type(), at = %event.occurred_at(), "navigation event");
            match &event {
                NavigationEvent::Feedback {
                    episode_id,
                    poses,
                    timestamp,
                } => {
                    if let Some(sink) = self.episodes.get(episode_id) {
                        let feedback = NavigationFeedback {
                            episode_id: *episode_id,
                            poses: poses.clone(),
                            timestamp: *timestamp,
                        };
                        // A slow client misses intermediate feedback instead of stalling the loop.
                        let _ = sink.feedback.try_send(feedback);
                    }
                }
                _ => {
                    let (Some(episode_id), Some(outcome)) = (event.episode_id(), event.outcome()) else {
                        continue;
                    };
                    if let Some(sink) = self.episodes.remove(&episode_id) {
                        info!(%episode_id, ?outcome, "Episode finished");
                        let _ = sink.outcome.send(outcome);
                    }
                }
            }
        }
    }

    fn publish_status(&self) {
        let status = NavigationStatus {
            state: self.coordinator.state(),
            episode_id: self.coordinator.current_episode(),
            active_goals: self.coordinator.active_goals().cloned().unwrap_or_default(),
        };
        self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
