mod common;

use common::*;
use crowd_nav::adapters::inbound::{load_request, parse_request};
use crowd_nav::adapters::outbound::*;
use crowd_nav::config::{Config, ControllerConfig, CostmapConfig, PlannerConfig};
use crowd_nav::domains::navigation::*;
use crowd_nav::DomainError;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_costmap_conversions_follow_origin_and_offset() {
    let costmap = StaticCostmap::from_config(&CostmapConfig::default());

    // Left of or below the origin is off the map
    assert!(costmap.world_to_cell(-10.5, 0.0).is_none());
    assert!(costmap.world_to_cell(0.0, -10.01).is_none());
    assert!(costmap.world_to_cell(10.5, 0.0).is_none());

    let point = costmap.world_to_cell(0.0, 0.0).unwrap();
    assert!((point.x - 99.5).abs() < 1e-9);
    let (wx, wy) = costmap.cell_to_world(GridPoint::new(100.0, 100.0));
    assert!((wx - 0.05).abs() < 1e-9);
    assert!((wy - 0.05).abs() < 1e-9);

    let zero_offset = StaticCostmap::new(FRAME, 10, 10, 1.0, (0.0, 0.0)).with_convert_offset(0.0);
    assert_eq!(zero_offset.world_to_cell(3.0, 4.0), Some(GridPoint::new(3.0, 4.0)));
}

#[test]
fn test_costmap_layers() {
    let mut costmap = test_costmap();
    costmap.set_static_cost(1, 1, LETHAL_OBSTACLE);
    costmap.mark_obstacle(2, 2);
    assert!(costmap.mark_obstacle_at(0.0, 0.0));
    assert!(!costmap.mark_obstacle_at(100.0, 0.0));

    assert!(!costmap.is_traversable(1, 1, true));
    assert!(!costmap.is_traversable(2, 2, true));
    assert!(!costmap.is_traversable(40, 0, true));

    costmap.reset_layers();
    assert_eq!(costmap.cost(2, 2), FREE_SPACE);
    assert_eq!(costmap.cost(1, 1), LETHAL_OBSTACLE);

    costmap.set_static_cost(3, 3, NO_INFORMATION);
    assert!(costmap.is_traversable(3, 3, true));
    assert!(!costmap.is_traversable(3, 3, false));
}

#[test]
fn test_straight_line_planner() {
    let mut costmap = test_costmap();
    let planner = StraightLinePlanner::new(&PlannerConfig::default());
    let start = GridPoint::new(5.0, 5.0);
    let end = GridPoint::new(15.0, 5.0);

    let path = planner.compute_path(&costmap, start, end).unwrap();
    assert_eq!(path.first(), Some(&start));
    assert_eq!(path.last(), Some(&end));
    assert_eq!(path.len(), 11);

    costmap.mark_obstacle(10, 5);
    assert!(matches!(
        planner.compute_path(&costmap, start, end),
        Err(DomainError::NoPath { .. })
    ));
}

#[test]
fn test_grid_search_routes_around_a_wall() {
    let mut costmap = test_costmap();
    for y in 0..30 {
        costmap.mark_obstacle(10, y);
    }
    let start = GridPoint::new(5.0, 5.0);
    let end = GridPoint::new(15.0, 5.0);

    let straight = StraightLinePlanner::new(&PlannerConfig::default());
    assert!(straight.compute_path(&costmap, start, end).is_err());

    let planner = GridSearchPlanner::new(&PlannerConfig::default());
    let path = planner.compute_path(&costmap, start, end).unwrap();
    assert_eq!(path.first(), Some(&start));
    assert_eq!(path.last(), Some(&end));
    assert!(path.iter().any(|p| p.y >= 30.0));
    for point in &path {
        let (x, y) = point.cell().unwrap();
        assert!(costmap.is_traversable(x, y, true));
    }

    // Sealing the gap leaves no path
    for y in 30..40 {
        costmap.mark_obstacle(10, y);
    }
    assert!(matches!(
        planner.compute_path(&costmap, start, end),
        Err(DomainError::NoPath { .. })
    ));
}

#[test]
fn test_teleport_controller_reaches_targets_in_one_step() {
    let costmap = test_costmap();
    let mut controller = TeleportController::new(&ControllerConfig::default());
    let mut plans = PoseMap::new();
    plans.insert(AgentId(1), pose(1.0, 1.0));
    controller.set_plans(&plans).unwrap();

    assert!(controller.goals_reached().unwrap().is_empty());
    let positions = controller.compute_agent_positions(&costmap).unwrap();
    assert_eq!(positions[&AgentId(1)].position, pose(1.0, 1.0).position);
    assert_eq!(controller.goals_reached().unwrap(), vec![AgentId(1)]);

    controller.reset();
    assert!(controller.goals_reached().unwrap().is_empty());
}

#[test]
fn test_linear_controller_moves_at_bounded_speed() {
    let costmap = test_costmap();
    let config = ControllerConfig { goal_tolerance: 0.01, max_speed: 1.0 };
    let mut controller = LinearController::new(&config, Duration::from_millis(500));

    let mut plans = PoseMap::new();
    plans.insert(AgentId(1), pose(0.0, 0.0));
    controller.set_plans(&plans).unwrap();
    assert_eq!(controller.goals_reached().unwrap(), vec![AgentId(1)]);

    plans.insert(AgentId(1), pose(2.0, 0.0));
    controller.set_plans(&plans).unwrap();
    let step = controller.compute_agent_positions(&costmap).unwrap();
    assert!((step[&AgentId(1)].position.x - 0.5).abs() < 1e-9);
    assert!(controller.goals_reached().unwrap().is_empty());

    for _ in 0..3 {
        controller.compute_agent_positions(&costmap).unwrap();
    }
    assert_eq!(controller.goals_reached().unwrap(), vec![AgentId(1)]);
}

#[test]
fn test_registry_resolves_bundled_plugins() {
    let registry = PluginRegistry::with_defaults();
    let config = Config::default();

    assert_eq!(registry.planner_names(), vec!["grid_search", "straight_line"]);
    assert_eq!(registry.controller_names(), vec!["linear", "teleport"]);
    assert_eq!(registry.create_planner("grid_search", &config).unwrap().name(), "grid_search");
    assert_eq!(registry.create_controller("linear", &config).unwrap().name(), "linear");

    match registry.create_controller("pid", &config) {
        Err(DomainError::UnknownPlugin { kind, name }) => {
            assert_eq!(kind, "controller");
            assert_eq!(name, "pid");
        }
        _ => panic!("Expected UnknownPlugin"),
    }
}

#[test]
fn test_registry_accepts_custom_plugins() {
    let mut registry = PluginRegistry::empty();
    registry.register_planner("blocking", |_| std::sync::Arc::new(BlockingPlanner::new(Vec::new())) as std::sync::Arc<dyn Planner>);
    assert_eq!(registry.create_planner("blocking", &Config::default()).unwrap().name(), "blocking");
    assert!(registry.create_planner("straight_line", &Config::default()).is_err());
}

#[tokio::test]
async fn test_request_file_is_parsed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("request.json");
    std::fs::write(
        &path,
        r#"{
    "start_poses": [
        { "agent_id": 1, "pose": { "frame_id": "map", "position": { "x": 0.0, "y": 0.0, "z": 0.0 } } }
    ],
    "goal_poses": [
        { "agent_id": 1, "pose": { "frame_id": "map", "position": { "x": 4.0, "y": 2.0, "z": 0.0 },
          "orientation": { "x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0 } } }
    ]
}"#,
    )
    .unwrap();

    let request = load_request(&path).await.unwrap();

    assert_eq!(request.start_poses.len(), 1);
    assert_eq!(request.goal_poses[0].agent_id, AgentId(1));
    assert_eq!(request.goal_poses[0].pose.position.x, 4.0);
    assert_eq!(request.start_poses[0].pose.orientation, Quaternion::identity());
    assert!(request.sub_goal_poses.is_empty());

    assert!(matches!(parse_request("{ not json"), Err(DomainError::SerializationError(_))));
    assert!(load_request(dir.path().join("missing.json")).await.is_err());
}
