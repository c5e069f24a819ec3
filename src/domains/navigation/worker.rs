use crate::common::{DomainError, DomainResult};
use crate::domains::logger::DynLogger;
use super::plan_store::PlanStore;
use super::ports::{Costmap, Planner, SharedCostmap};
use super::requests::{PlanningInputs, PlanningRequests};
use super::types::{AgentId, GridPoint, Quaternion, StampedPose, Position3D};
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError};
use std::time::Instant;
use tokio::sync::mpsc;

/// Summary of one planning pass, sent to the coordinator after the commit.
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub generation: u64,
    pub planned_agents: Vec<AgentId>,
    pub committed: bool,
}

/// Background planner that turns `PlanningInputs` into a `Plan`.
///
/// One pass plans every agent independently through its sub-goals to its
/// goal. An agent whose route can not be completed gets no route at all.
#[derive(Clone)]
pub struct PlanningWorker {
    planner: Arc<dyn Planner>,
    costmap: SharedCostmap,
    plan_store: Arc<PlanStore>,
    requests: Arc<PlanningRequests>,
    reports: mpsc::UnboundedSender<PassReport>,
    logger: DynLogger,
}

impl PlanningWorker {
    pub fn new(
        planner: Arc<dyn Planner>,
        costmap: SharedCostmap,
        plan_store: Arc<PlanStore>,
        requests: Arc<PlanningRequests>,
        reports: mpsc::UnboundedSender<PassReport>,
        logger: DynLogger,
    ) -> Self {
        Self {
            planner,
            costmap,
            plan_store,
            requests,
            reports,
            logger,
        }
    }

    /// Inputs of the next pass, if planning is currently requested.
    pub fn next_pass_inputs(&self) -> Option<Arc<PlanningInputs>> {
        self.requests.next_inputs()
    }

    /// Runs until the request channel is shut down or the coordinator goes away.
    pub async fn run(self) {
        self.logger.info(&format!("Planning worker started with planner '{}'", self.planner.name()));

        while let Some(inputs) = self.wait_for_inputs().await {
            let started = Instant::now();
            let generation = inputs.generation;
            let worker = self.clone();
            if let Err(e) = tokio::task::spawn_blocking(move || worker.run_pass(&inputs)).await {
                self.logger.error(&format!("Planning pass for generation {} panicked: {}", generation, e));
                self.requests.finish_pass(generation, false);
                self.report(PassReport {
                    generation,
                    planned_agents: Vec::new(),
                    committed: false,
                });
            }

            if self.reports.is_closed() {
                self.logger.info("Coordinator has gone away, stopping the planning worker");
                break;
            }

            let period = self.requests.planning_period();
            if !period.is_zero() && self.requests.is_running() {
                let remaining = period.saturating_sub(started.elapsed());
                if !remaining.is_zero() {
                    tokio::select! {
                        _ = tokio::time::sleep(remaining) => {},
                        _ = self.requests.notified() => {},
                    }
                }
            }
        }

        self.logger.info("Planning worker stopped");
    }

    async fn wait_for_inputs(&self) -> Option<Arc<PlanningInputs>> {
        loop {
            if self.requests.is_shutdown() {
                return None;
            }
            if let Some(inputs) = self.requests.next_inputs() {
                return Some(inputs);
            }
            self.requests.notified().await;
        }
    }

    /// Plans, commits and reports one pass. Blocking; holds the planner costmap read lock.
    pub fn run_pass(&self, inputs: &PlanningInputs) -> PassReport {
        let generation = inputs.generation;
        let started = Instant::now();
        let mut plan = self.plan_store.begin_pass(generation);

        {
            let costmap = self.costmap.read().unwrap_or_else(PoisonError::into_inner);
            let stamp = Utc::now();
            for (agent_id, start) in &inputs.goals.starts {
                let Some(goal) = inputs.goals.goals.get(agent_id) else {
                    continue;
                };
                let sub_goals = inputs
                    .goals
                    .sub_goals
                    .get(agent_id)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                match self.plan_agent(&*costmap, *agent_id, start, sub_goals, goal, stamp) {
                    Ok(route) => plan.insert(*agent_id, route),
                    Err(e) => self.logger.warn(&format!("No plan for agent {}: {}", agent_id, e)),
                }
            }
        }

        let planned_agents: Vec<AgentId> = plan.agents().collect();
        let committed = if self.requests.is_current(generation) {
            self.plan_store.commit(plan)
        } else {
            self.logger.info(&format!("Discarding plans of superseded generation {}", generation));
            self.plan_store.release(plan);
            false
        };
        self.requests.finish_pass(generation, committed);

        self.logger.info(&format!(
            "Planning pass {} planned {} of {} agents in {:?}",
            generation,
            planned_agents.len(),
            inputs.goals.agent_count(),
            started.elapsed()
        ));

        let report = PassReport {
            generation,
            planned_agents,
            committed,
        };
        self.report(report.clone());
        report
    }

    fn report(&self, report: PassReport) {
        // Fails only once the coordinator is gone, which `run` checks after each pass.
        let _ = self.reports.send(report);
    }

    fn plan_agent(
        &self,
        costmap: &dyn Costmap,
        agent_id: AgentId,
        start: &StampedPose,
        sub_goals: &[StampedPose],
        goal: &StampedPose,
        stamp: DateTime<Utc>,
    ) -> DomainResult<Vec<StampedPose>> {
        let frame = costmap.global_frame();
        for pose in std::iter::once(start).chain(sub_goals).chain(std::iter::once(goal)) {
            if pose.frame_id != frame {
                return Err(DomainError::FrameMismatch {
                    expected: frame.to_string(),
                    actual: pose.frame_id.clone(),
                });
            }
        }

        let mut waypoints = vec![to_grid(costmap, start)?];
        for (index, sub_goal) in sub_goals.iter().enumerate() {
            match to_grid(costmap, sub_goal) {
                Ok(point) => waypoints.push(point),
                Err(_) => self.logger.warn(&format!(
                    "Skipping sub-goal {} of agent {}, it is off the costmap",
                    index, agent_id
                )),
            }
        }
        waypoints.push(to_grid(costmap, goal)?);

        let mut route = Vec::new();
        for (leg, ends) in waypoints.windows(2).enumerate() {
            let path = self.planner.compute_path(costmap, ends[0], ends[1])?;
            let skip = if leg == 0 { 0 } else { 1 };
            route.extend(
                path.into_iter()
                    .skip(skip)
                    .map(|point| grid_to_pose(costmap, point, stamp)),
            );
        }
        if route.is_empty() {
            return Err(DomainError::NoPath {
                reason: format!("planner '{}' returned an empty path", self.planner.name()),
            });
        }

        let mut exact_goal = goal.clone();
        exact_goal.stamp = Utc::now();
        route.push(exact_goal);
        Ok(route)
    }
}

fn to_grid(costmap: &dyn Costmap, pose: &StampedPose) -> DomainResult<GridPoint> {
    costmap
        .world_to_cell(pose.position.x, pose.position.y)
        .ok_or(DomainError::OffMap {
            x: pose.position.x,
            y: pose.position.y,
        })
}

fn grid_to_pose(costmap: &dyn Costmap, point: GridPoint, stamp: DateTime<Utc>) -> StampedPose {
    let (x, y) = costmap.cell_to_world(point);
    StampedPose {
        frame_id: costmap.global_frame().to_string(),
        stamp,
        position: Position3D { x, y, z: 0.0 },
        orientation: Quaternion::identity(),
    }
}
