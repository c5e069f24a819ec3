use super::types::{AgentId, StampedPose};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Routes for every successfully planned agent, produced by one planning pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    generation: u64,
    routes: BTreeMap<AgentId, Vec<StampedPose>>,
}

impl Plan {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            routes: BTreeMap::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Empty routes are never stored.
    pub fn insert(&mut self, agent_id: AgentId, route: Vec<StampedPose>) {
        if !route.is_empty() {
            self.routes.insert(agent_id, route);
        }
    }

    pub fn route(&self, agent_id: AgentId) -> Option<&[StampedPose]> {
        self.routes.get(&agent_id).map(Vec::as_slice)
    }

    pub fn agents(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.routes.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &[StampedPose])> + '_ {
        self.routes.iter().map(|(id, route)| (*id, route.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn reset(&mut self, generation: u64) {
        self.generation = generation;
        self.routes.clear();
    }
}

#[derive(Debug, Default)]
struct Buffers {
    spare: Option<Plan>,
    pending: Option<Plan>,
    active: Arc<Plan>,
}

impl Buffers {
    fn recycle(&mut self, mut plan: Plan) {
        plan.reset(0);
        self.spare = Some(plan);
    }
}

/// Hand-off between the planning worker and the control loop.
///
/// The worker fills a working plan it owns exclusively and commits it as
/// pending; the control loop activates the pending plan at the start of a
/// cycle. All swaps happen under one short lock and never copy routes.
#[derive(Debug, Default)]
pub struct PlanStore {
    buffers: Mutex<Buffers>,
}

impl PlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Buffers> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Empty working plan for a new pass, reusing a released buffer when one is available.
    pub fn begin_pass(&self, generation: u64) -> Plan {
        let mut plan = self.lock().spare.take().unwrap_or_default();
        plan.reset(generation);
        plan
    }

    /// Publishes `plan` as pending unless it is empty. A pending plan that was
    /// never activated is replaced. Returns whether the plan was published.
    pub fn commit(&self, plan: Plan) -> bool {
        let mut buffers = self.lock();
        if plan.is_empty() {
            buffers.recycle(plan);
            return false;
        }
        if let Some(previous) = buffers.pending.replace(plan) {
            buffers.recycle(previous);
        }
        true
    }

    /// Hands a working plan back without publishing it.
    pub fn release(&self, plan: Plan) {
        self.lock().recycle(plan);
    }

    pub fn pending_generation(&self) -> Option<u64> {
        self.lock().pending.as_ref().map(Plan::generation)
    }

    /// Swaps the pending plan in as the active one.
    ///
    /// A pending plan older than `min_generation` is discarded instead.
    pub fn activate_pending(&self, min_generation: u64) -> Option<Arc<Plan>> {
        let mut buffers = self.lock();
        let pending = buffers.pending.take()?;
        if pending.generation < min_generation {
            buffers.recycle(pending);
            return None;
        }

        let activated = Arc::new(pending);
        let previous = std::mem::replace(&mut buffers.active, Arc::clone(&activated));
        if let Ok(previous) = Arc::try_unwrap(previous) {
            buffers.recycle(previous);
        }
        Some(activated)
    }

    pub fn active(&self) -> Arc<Plan> {
        Arc::clone(&self.lock().active)
    }

    /// Drops pending and active plans.
    pub fn clear(&self) {
        let mut buffers = self.lock();
        if let Some(pending) = buffers.pending.take() {
            buffers.recycle(pending);
        }
        buffers.active = Arc::new(Plan::default());
    }
}
