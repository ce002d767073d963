use glam::IVec2;

use crate::action::Action;
use crate::collision::{CollisionData, Motion};
use crate::geometry::Polygon;
use crate::search::SearchNode;
use crate::types::{DiscretePose, MapInfo, Pose2};

/// One body at one pose: its footprint there and its discretized key.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub pose: Pose2,
    pub polygon: Polygon,
    pub cell: IVec2,
    pub discrete: DiscretePose,
}

impl Configuration {
    pub fn new(pose: Pose2, polygon: Polygon, info: &MapInfo, rotation_unit_angle: f32) -> Self {
        Self {
            cell: info.world_to_cell_unchecked(pose.position),
            discrete: info.discretize(&pose, rotation_unit_angle),
            pose,
            polygon,
        }
    }
}

/// Key of a joint state: robot pose then obstacle pose.
pub type JointKey = (DiscretePose, DiscretePose);

/// Robot and grabbed obstacle, moved together by the last action.
///
/// Start configurations have no action. The swept hulls of the step that
/// produced a configuration are kept so that the final transfer path does
/// not have to compute them again.
#[derive(Debug, Clone)]
pub struct RobotObstacleConfiguration {
    pub robot: Configuration,
    pub obstacle: Configuration,
    pub action: Option<Action>,
    pub motion: Option<Motion>,
    pub robot_sweep: Option<CollisionData>,
    pub obstacle_sweep: Option<CollisionData>,
}

impl RobotObstacleConfiguration {
    pub fn at_rest(robot: Configuration, obstacle: Configuration) -> Self {
        Self {
            robot,
            obstacle,
            action: None,
            motion: None,
            robot_sweep: None,
            obstacle_sweep: None,
        }
    }
}

impl SearchNode for RobotObstacleConfiguration {
    type Key = JointKey;

    fn key(&self) -> JointKey {
        (self.robot.discrete, self.obstacle.discrete)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;

    #[test]
    fn test_key_ignores_sub_cell_offsets() {
        let info = MapInfo::square(10, 1.0);
        let body = |x: f32| {
            let pose = Pose2::new(x, 2.5, 0.0);
            Configuration::new(pose, Polygon::rectangle(pose.position, 0.5, 0.5), &info, 15.0)
        };
        let a = RobotObstacleConfiguration::at_rest(body(1.2), body(3.2));
        let b = RobotObstacleConfiguration::at_rest(body(1.8), body(3.7));
        let c = RobotObstacleConfiguration::at_rest(body(1.8), body(4.1));
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert_eq!(a.robot.cell, IVec2::new(1, 2));
        assert_eq!(a.obstacle.polygon.centroid(), Vec2::new(3.2, 2.5));
    }
}
