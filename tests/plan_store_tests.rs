mod common;

use common::*;
use crowd_nav::domains::navigation::*;
use std::sync::Arc;

fn plan(generation: u64, agents: &[u64]) -> Plan {
    let mut plan = Plan::new(generation);
    for agent in agents {
        plan.insert(AgentId(*agent), vec![pose(*agent as f64, 0.0), pose(*agent as f64, 1.0)]);
    }
    plan
}

#[test]
fn test_empty_plan_is_never_published() {
    let store = PlanStore::new();
    assert!(!store.commit(plan(1, &[])));
    assert_eq!(store.pending_generation(), None);
    assert!(store.activate_pending(0).is_none());
    assert!(store.active().is_empty());
}

#[test]
fn test_empty_route_is_not_stored() {
    let mut plan = Plan::new(1);
    plan.insert(AgentId(1), Vec::new());
    assert!(plan.is_empty());
    assert!(plan.route(AgentId(1)).is_none());
}

#[test]
fn test_latest_commit_wins_and_activation_is_atomic() {
    let store = PlanStore::new();
    assert!(store.commit(plan(1, &[1])));
    assert!(store.commit(plan(1, &[1, 2])));
    assert_eq!(store.pending_generation(), Some(1));

    let active = store.activate_pending(1).unwrap();
    assert_eq!(active.len(), 2);
    assert_eq!(store.pending_generation(), None);
    assert!(Arc::ptr_eq(&active, &store.active()));

    // Nothing new to activate
    assert!(store.activate_pending(1).is_none());
    assert_eq!(store.active().len(), 2);
}

#[test]
fn test_held_plan_survives_a_swap() {
    let store = PlanStore::new();
    store.commit(plan(1, &[1]));
    let held = store.activate_pending(1).unwrap();

    store.commit(plan(2, &[2, 3]));
    let newer = store.activate_pending(2).unwrap();

    assert_eq!(held.agents().collect::<Vec<_>>(), vec![AgentId(1)]);
    assert_eq!(held.route(AgentId(1)).unwrap().len(), 2);
    assert_eq!(newer.generation(), 2);
}

#[test]
fn test_stale_generation_is_discarded_on_activation() {
    let store = PlanStore::new();
    store.commit(plan(3, &[1]));
    assert!(store.activate_pending(4).is_none());
    assert_eq!(store.pending_generation(), None);
    assert!(store.active().is_empty());
}

#[test]
fn test_working_plan_starts_empty_after_recycling() {
    let store = PlanStore::new();
    store.commit(plan(1, &[1, 2]));
    store.activate_pending(1);
    store.commit(plan(2, &[3]));
    store.activate_pending(2);

    let working = store.begin_pass(7);
    assert!(working.is_empty());
    assert_eq!(working.generation(), 7);
    store.release(working);

    store.clear();
    assert!(store.active().is_empty());
}

#[test]
fn test_control_plan_cursor() {
    let mut plan = Plan::new(1);
    plan.insert(AgentId(1), vec![pose(0.0, 0.0), pose(1.0, 0.0), pose(2.0, 0.0)]);
    plan.insert(AgentId(2), vec![pose(0.0, 5.0)]);
    let mut control = ControlPlan::new(Arc::new(plan));

    assert_eq!(control.front_waypoints().len(), 2);
    assert_eq!(control.remaining(AgentId(1)), 3);

    let changed = control.advance(&[AgentId(1), AgentId(2), AgentId(9)]);
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[&AgentId(1)].position.x, 1.0);
    assert_eq!(control.remaining(AgentId(2)), 0);
    assert!(!control.is_complete());

    control.advance(&[AgentId(1)]);
    let changed = control.advance(&[AgentId(1)]);
    assert!(changed.is_empty());
    assert!(control.is_complete());

    // Exhausted agents stay exhausted
    assert!(control.advance(&[AgentId(1)]).is_empty());
    assert_eq!(control.remaining(AgentId(1)), 0);
}
