mod common;

use common::*;
use crowd_nav::adapters::outbound::StaticTransformTree;
use crowd_nav::domains::navigation::*;
use crowd_nav::DomainError;
use std::sync::Arc;

fn tree() -> StaticTransformTree {
    StaticTransformTree::new(FRAME)
        .with_frame("odom", 2.0, 1.0, 0.0)
        .with_frame("turned", 0.0, 0.0, std::f64::consts::FRAC_PI_2)
}

#[test]
fn test_transform_between_frames() {
    let tree = tree();
    let local = StampedPose::planar("odom", 1.0, 1.0, 0.0);

    let global = tree.transform_pose(&local, FRAME).unwrap();
    assert_eq!(global.frame_id, FRAME);
    assert!((global.position.x - 3.0).abs() < 1e-9);
    assert!((global.position.y - 2.0).abs() < 1e-9);
    assert_eq!(global.stamp, local.stamp);

    let turned = tree.transform_pose(&StampedPose::planar("turned", 1.0, 0.0, 0.0), FRAME).unwrap();
    assert!(turned.position.x.abs() < 1e-9);
    assert!((turned.position.y - 1.0).abs() < 1e-9);
    assert!((turned.orientation.yaw() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    assert!(is_orientation_valid(&turned.orientation));

    let back = tree.transform_pose(&global, "odom").unwrap();
    assert!((back.position.x - 1.0).abs() < 1e-9);
    assert!((back.position.y - 1.0).abs() < 1e-9);
}

#[test]
fn test_unknown_frame_fails() {
    let result = tree().transform_pose(&StampedPose::planar("nowhere", 0.0, 0.0, 0.0), FRAME);
    match result {
        Err(DomainError::TransformFailed { from, to, .. }) => {
            assert_eq!(from, "nowhere");
            assert_eq!(to, FRAME);
        }
        other => panic!("Expected TransformFailed, got {:?}", other),
    }
}

#[test]
fn test_normalizer_keeps_pose_when_transform_fails() {
    let logger = Arc::new(BridgeCapture::new());
    let normalizer = FrameNormalizer::new(Arc::new(tree()), logger.clone());

    let mut poses = PoseMap::new();
    poses.insert(AgentId(1), StampedPose::planar("odom", 0.0, 0.0, 0.0));
    poses.insert(AgentId(2), StampedPose::planar("nowhere", 4.0, 4.0, 0.0));

    let normalized = normalizer.to_target_frame(&poses, FRAME);

    assert_eq!(normalized[&AgentId(1)].frame_id, FRAME);
    assert!((normalized[&AgentId(1)].position.x - 2.0).abs() < 1e-9);
    assert_eq!(normalized[&AgentId(2)], poses[&AgentId(2)]);
    assert!(logger.contains("WARN:Failed to transform the pose from 'nowhere'"));
}

#[test]
fn test_normalizer_converts_all_goal_parts() {
    let normalizer = FrameNormalizer::new(Arc::new(tree()), Arc::new(BridgeCapture::new()));
    let odom = |x, y| StampedPose::planar("odom", x, y, 0.0);
    let goals = GoalValidator::new(Arc::new(BridgeCapture::new()))
        .validate(
            &NavigationRequest::new()
                .with_agent(1, odom(0.0, 0.0), odom(5.0, 0.0))
                .with_sub_goals(1, vec![odom(2.0, 0.0)]),
        )
        .unwrap();

    let normalized = normalizer.goals_to_target_frame(&goals, FRAME);

    assert_eq!(normalized.frame_id(), Some(FRAME));
    assert_eq!(normalized.starts[&AgentId(1)].frame_id, FRAME);
    assert!((normalized.sub_goals[&AgentId(1)][0].position.x - 4.0).abs() < 1e-9);
    assert!((normalized.goals[&AgentId(1)].position.x - 7.0).abs() < 1e-9);
}
