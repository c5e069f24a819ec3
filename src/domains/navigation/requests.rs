use super::types::{PoseMap, ValidatedGoals};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// Inputs of one planning request, tagged with the generation that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningInputs {
    pub generation: u64,
    pub goals: ValidatedGoals,
}

#[derive(Debug, Default)]
struct RequestSlot {
    inputs: Option<Arc<PlanningInputs>>,
    generation: u64,
    run_planner: bool,
    plan_available: bool,
    planning_period: Duration,
    shutdown: bool,
}

/// Wake-up channel from the coordinator to the planning worker.
///
/// Holds the latest planning inputs, the `run_planner` flag and the current
/// generation. Every new request bumps the generation so results computed
/// for older inputs can be recognised and dropped.
#[derive(Debug, Default)]
pub struct PlanningRequests {
    slot: Mutex<RequestSlot>,
    wake: Notify,
}

impl PlanningRequests {
    pub fn new(planning_period: Duration) -> Self {
        Self {
            slot: Mutex::new(RequestSlot {
                planning_period,
                ..RequestSlot::default()
            }),
            wake: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RequestSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes new inputs and wakes the worker. Returns the new generation.
    pub fn request(&self, goals: ValidatedGoals) -> u64 {
        let generation = {
            let mut slot = self.lock();
            slot.generation += 1;
            slot.inputs = Some(Arc::new(PlanningInputs {
                generation: slot.generation,
                goals,
            }));
            slot.run_planner = true;
            slot.plan_available = false;
            slot.generation
        };
        self.wake.notify_one();
        generation
    }

    /// Replaces the start poses used by later passes of `generation`.
    ///
    /// Agents that are not part of the request are ignored.
    pub fn update_starts(&self, generation: u64, starts: &PoseMap) {
        let mut slot = self.lock();
        let Some(current) = slot.inputs.as_ref() else {
            return;
        };
        if current.generation != generation {
            return;
        }
        let mut goals = current.goals.clone();
        for (agent_id, pose) in starts {
            if let Some(start) = goals.starts.get_mut(agent_id) {
                *start = pose.clone();
            }
        }
        slot.inputs = Some(Arc::new(PlanningInputs { generation, goals }));
    }

    /// Stops planning until the next request.
    pub fn stop(&self) {
        let mut slot = self.lock();
        slot.run_planner = false;
        slot.inputs = None;
    }

    pub fn shutdown(&self) {
        {
            let mut slot = self.lock();
            slot.shutdown = true;
            slot.run_planner = false;
        }
        self.wake.notify_one();
    }

    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    pub fn is_running(&self) -> bool {
        self.lock().run_planner
    }

    pub fn current_generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Inputs for the next pass while planning is requested.
    pub fn next_inputs(&self) -> Option<Arc<PlanningInputs>> {
        let slot = self.lock();
        if slot.run_planner && !slot.shutdown {
            slot.inputs.clone()
        } else {
            None
        }
    }

    /// Records the end of a pass for `generation`.
    ///
    /// Without periodic replanning the planner stops after one pass. It also
    /// stops when a request has never produced a plan, since there is
    /// nothing to fall back on.
    pub fn finish_pass(&self, generation: u64, planned: bool) {
        let mut slot = self.lock();
        if slot.generation != generation {
            return;
        }
        if planned {
            slot.plan_available = true;
        }
        if slot.planning_period.is_zero() || !slot.plan_available {
            slot.run_planner = false;
        }
    }

    pub fn planning_period(&self) -> Duration {
        self.lock().planning_period
    }

    /// Zero disables periodic replanning.
    pub fn set_planning_period(&self, period: Duration) {
        let resume = {
            let mut slot = self.lock();
            slot.planning_period = period;
            if !period.is_zero() && slot.plan_available && slot.inputs.is_some() {
                slot.run_planner = true;
            }
            slot.run_planner
        };
        if resume {
            self.wake.notify_one();
        }
    }

    pub async fn notified(&self) {
        self.wake.notified().await
    }
}
