#![allow(dead_code)]

use crowd_nav::adapters::outbound::{
    StaticCostmap, StaticTransformTree, StraightLinePlanner, TeleportController,
};
use crowd_nav::config::{ControllerConfig, PlannerConfig};
use crowd_nav::domains::logger::DomainLogger;
use crowd_nav::domains::navigation::*;
use crowd_nav::{DomainError, DomainResult};
use std::sync::{Arc, Mutex, RwLock};

pub const FRAME: &str = "map";

pub struct BridgeCapture {
    pub messages: Arc<Mutex<Vec<String>>>,
}

impl BridgeCapture {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.lock().unwrap().iter().any(|m| m.contains(needle))
    }
}

impl DomainLogger for BridgeCapture {
    fn info(&self, msg: &str) {
        self.messages.lock().unwrap().push(format!("INFO:{}", msg));
    }

    fn warn(&self, msg: &str) {
        self.messages.lock().unwrap().push(format!("WARN:{}", msg));
    }

    fn error(&self, msg: &str) {
        self.messages.lock().unwrap().push(format!("ERR:{}", msg));
    }
}

pub fn pose(x: f64, y: f64) -> StampedPose {
    StampedPose::planar(FRAME, x, y, 0.0)
}

/// 40 x 40 cells of one metre, centred on the world origin.
pub fn test_costmap() -> StaticCostmap {
    StaticCostmap::new(FRAME, 40, 40, 1.0, (-20.0, -20.0))
}

pub fn shared(costmap: StaticCostmap) -> Arc<RwLock<StaticCostmap>> {
    Arc::new(RwLock::new(costmap))
}

pub fn straight_line() -> Arc<dyn Planner> {
    Arc::new(StraightLinePlanner::new(&PlannerConfig::default()))
}

/// Straight line planner that refuses legs ending at the given world positions.
pub struct BlockingPlanner {
    inner: StraightLinePlanner,
    blocked: Vec<(f64, f64)>,
}

impl BlockingPlanner {
    pub fn new(blocked: Vec<(f64, f64)>) -> Self {
        Self {
            inner: StraightLinePlanner::new(&PlannerConfig::default()),
            blocked,
        }
    }
}

impl Planner for BlockingPlanner {
    fn name(&self) -> &str {
        "blocking"
    }

    fn compute_path(
        &self,
        costmap: &dyn Costmap,
        start: GridPoint,
        end: GridPoint,
    ) -> DomainResult<Vec<GridPoint>> {
        let (x, y) = costmap.cell_to_world(end);
        if self.blocked.iter().any(|(bx, by)| (bx - x).abs() < 1e-6 && (by - y).abs() < 1e-6) {
            return Err(DomainError::NoPath {
                reason: "blocked for test".to_string(),
            });
        }
        self.inner.compute_path(costmap, start, end)
    }
}

#[derive(Default)]
pub struct ControllerSpy {
    pub set_plans_calls: Vec<PoseMap>,
    pub reset_calls: usize,
    pub reject_plans: bool,
    pub fail_goals_reached: bool,
    pub fail_positions: bool,
}

/// Teleporting controller whose behaviour and calls are visible through a shared spy.
pub struct SpiedController {
    inner: TeleportController,
    spy: Arc<Mutex<ControllerSpy>>,
}

impl SpiedController {
    pub fn new() -> (Self, Arc<Mutex<ControllerSpy>>) {
        let spy = Arc::new(Mutex::new(ControllerSpy::default()));
        let controller = Self {
            inner: TeleportController::new(&ControllerConfig::default()),
            spy: spy.clone(),
        };
        (controller, spy)
    }
}

impl Controller for SpiedController {
    fn name(&self) -> &str {
        "spied"
    }

    fn set_plans(&mut self, plans: &PoseMap) -> DomainResult<()> {
        let mut spy = self.spy.lock().unwrap();
        spy.set_plans_calls.push(plans.clone());
        if spy.reject_plans {
            return Err(DomainError::ControllerRejected {
                reason: "rejected for test".to_string(),
            });
        }
        self.inner.set_plans(plans)
    }

    fn goals_reached(&mut self) -> DomainResult<Vec<AgentId>> {
        if self.spy.lock().unwrap().fail_goals_reached {
            return Err(DomainError::ControllerFailure {
                reason: "sensor dropout".to_string(),
            });
        }
        self.inner.goals_reached()
    }

    fn compute_agent_positions(&mut self, costmap: &dyn Costmap) -> DomainResult<PoseMap> {
        if self.spy.lock().unwrap().fail_positions {
            return Err(DomainError::ControllerFailure {
                reason: "no velocity".to_string(),
            });
        }
        self.inner.compute_agent_positions(costmap)
    }

    fn reset(&mut self) {
        self.spy.lock().unwrap().reset_calls += 1;
        self.inner.reset();
    }
}

pub struct Harness {
    pub coordinator: NavigationCoordinator,
    pub worker: PlanningWorker,
    pub spy: Arc<Mutex<ControllerSpy>>,
    pub planner_costmap: Arc<RwLock<StaticCostmap>>,
    pub controller_costmap: Arc<RwLock<StaticCostmap>>,
    pub logger: Arc<BridgeCapture>,
}

pub fn harness_with(
    planner: Arc<dyn Planner>,
    transforms: StaticTransformTree,
    settings: NavigationSettings,
) -> Harness {
    let (controller, spy) = SpiedController::new();
    let planner_costmap = shared(test_costmap());
    let controller_costmap = shared(test_costmap());
    let logger = Arc::new(BridgeCapture::new());

    let parts = NavigationParts {
        planner,
        controller: Box::new(controller),
        transformer: Arc::new(transforms),
        planner_costmap: planner_costmap.clone(),
        controller_costmap: controller_costmap.clone(),
        logger: logger.clone(),
    };
    let (coordinator, worker) = assemble(parts, settings);
    Harness {
        coordinator,
        worker,
        spy,
        planner_costmap,
        controller_costmap,
        logger,
    }
}

pub fn harness() -> Harness {
    harness_with(straight_line(), StaticTransformTree::new(FRAME), NavigationSettings::default())
}

impl Harness {
    /// Runs the pending planning pass synchronously, if one is requested.
    pub fn plan(&self) -> Option<PassReport> {
        let inputs = self.worker.next_pass_inputs()?;
        Some(self.worker.run_pass(&inputs))
    }

    /// Ticks until the coordinator is idle again, at most `limit` times.
    pub fn run_to_idle(&mut self, limit: usize) -> usize {
        for tick in 1..=limit {
            if self.coordinator.tick() == CoordinatorState::Idle {
                return tick;
            }
        }
        panic!("coordinator still {} after {} ticks", self.coordinator.state(), limit);
    }

    pub fn outcomes(&self) -> Vec<(EpisodeId, EpisodeOutcome)> {
        self.coordinator
            .uncommitted_events()
            .iter()
            .filter_map(|event| Some((event.episode_id()?, event.outcome()?)))
            .collect()
    }
}

pub fn two_agent_request() -> NavigationRequest {
    NavigationRequest::new()
        .with_agent(1, pose(0.0, 0.0), pose(10.0, 0.0))
        .with_agent(2, pose(0.0, 5.0), pose(10.0, 5.0))
}
