use glam::Vec2;

use super::Path;
use crate::action::Action;
use crate::collision::{CollisionCache, CollisionScene, Motion, check_swept_collisions};
use crate::types::{Pose2, Uid};

/// The robot carrying one obstacle.
///
/// Both paths share their indexes. State 0 is the robot at the end of the
/// preceding transit, the first action grabs the obstacle and the last one
/// releases it and backs off to the start of the next transit; the obstacle
/// stays still during these two steps.
#[derive(Debug, Clone)]
pub struct TransferPath {
    robot: Path,
    obstacle: Path,
    obstacle_uid: Uid,
    robot_collisions: CollisionCache,
    obstacle_collisions: CollisionCache,
    phys_cost: f32,
    social_cost: f32,
}

impl TransferPath {
    pub fn new(robot: Path, obstacle: Path, obstacle_uid: Uid, phys_cost: f32) -> Self {
        debug_assert_eq!(robot.poses().len(), obstacle.poses().len());
        Self {
            robot,
            obstacle,
            obstacle_uid,
            robot_collisions: CollisionCache::new(),
            obstacle_collisions: CollisionCache::new(),
            phys_cost,
            social_cost: 0.0,
        }
    }

    /// Seed the swept-hull caches with hulls computed while searching.
    pub fn with_collision_data(mut self, robot: CollisionCache, obstacle: CollisionCache) -> Self {
        self.robot_collisions = robot;
        self.obstacle_collisions = obstacle;
        self
    }

    pub fn with_social_cost(mut self, social_cost: f32) -> Self {
        self.social_cost = social_cost;
        self
    }

    pub fn robot_path(&self) -> &Path {
        &self.robot
    }

    pub fn obstacle_path(&self) -> &Path {
        &self.obstacle
    }

    pub fn obstacle_uid(&self) -> Uid {
        self.obstacle_uid
    }

    pub fn start_pose(&self) -> Option<&Pose2> {
        self.robot.start_pose()
    }

    pub fn end_pose(&self) -> Option<&Pose2> {
        self.robot.end_pose()
    }

    pub fn obstacle_end_pose(&self) -> Option<&Pose2> {
        self.obstacle.end_pose()
    }

    pub fn phys_cost(&self) -> f32 {
        self.phys_cost
    }

    pub fn social_cost(&self) -> f32 {
        self.social_cost
    }

    pub fn total_cost(&self) -> f32 {
        self.phys_cost + self.social_cost
    }

    pub fn len(&self) -> usize {
        self.robot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.robot.is_empty()
    }

    pub fn is_started(&self) -> bool {
        self.robot.is_started()
    }

    pub fn pop_next_step(&mut self) -> Option<Action> {
        self.obstacle.pop_next_step();
        self.robot.pop_next_step()
    }

    fn robot_motions(&self) -> Vec<Motion> {
        let poses = self.robot.poses();
        self.robot
            .actions()
            .iter()
            .enumerate()
            .map(|(i, action)| {
                action.motion(&poses[i]).unwrap_or_else(|| {
                    Motion::Translation(poses[i + 1].position - poses[i].position)
                })
            })
            .collect()
    }

    fn obstacle_motions(&self) -> Vec<Motion> {
        let mut motions = self.robot_motions();
        let last = motions.len().saturating_sub(1);
        for i in [0, last] {
            if let Some(motion) = motions.get_mut(i) {
                *motion = Motion::Translation(Vec2::ZERO);
            }
        }
        motions
    }

    /// Check the next `horizon` steps against `scene`, which must not hold
    /// the robot nor the carried obstacle.
    ///
    /// Before the first step, the obstacle must still be where the path
    /// expects to grab it.
    pub fn is_valid(
        &self,
        scene: &CollisionScene,
        obstacle_pose: &Pose2,
        horizon: Option<usize>,
    ) -> bool {
        if !self.robot.is_started()
            && self
                .obstacle
                .start_pose()
                .is_some_and(|start| !start.is_close(obstacle_pose))
        {
            return false;
        }
        let Some(states) = self.robot.horizon_states(horizon) else {
            return true;
        };
        let range = (*states.start(), *states.end());

        if range.0 == range.1 {
            return !scene.collides(&self.robot.polygons()[range.0])
                && !scene.collides(&self.obstacle.polygons()[range.0]);
        }

        let mut robot_cache = self.robot_collisions.clone();
        if check_swept_collisions(
            scene,
            self.robot.polygons(),
            &self.robot_motions(),
            range,
            &mut robot_cache,
        )
        .is_some()
        {
            return false;
        }
        let mut obstacle_cache = self.obstacle_collisions.clone();
        check_swept_collisions(
            scene,
            self.obstacle.polygons(),
            &self.obstacle_motions(),
            range,
            &mut obstacle_cache,
        )
        .is_none()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::geometry::Polygon;

    /// Robot at x=0 grabs a box at x=1, pushes it twice by 0.5 and backs off.
    fn push() -> TransferPath {
        let robot_x = [0.0, 0.4, 0.9, 1.4, 1.0];
        let obstacle_x = [1.0, 1.0, 1.5, 2.0, 2.0];
        let robot_poses: Vec<Pose2> = robot_x.iter().map(|x| Pose2::new(*x, 0.0, 0.0)).collect();
        let obstacle_poses: Vec<Pose2> =
            obstacle_x.iter().map(|x| Pose2::new(*x, 0.0, 0.0)).collect();
        let actions = vec![
            Action::Grab {
                vector: Vec2::new(0.4, 0.0),
                entity: 2,
            },
            Action::Translation {
                vector: Vec2::new(0.5, 0.0),
            },
            Action::Translation {
                vector: Vec2::new(0.5, 0.0),
            },
            Action::Release {
                vector: Vec2::new(-0.4, 0.0),
                entity: 2,
            },
        ];
        let robot_polygons = robot_poses
            .iter()
            .map(|p| Polygon::rectangle(p.position, 0.4, 0.4))
            .collect();
        let obstacle_polygons = obstacle_poses
            .iter()
            .map(|p| Polygon::rectangle(p.position, 0.4, 0.4))
            .collect();
        TransferPath::new(
            Path::new(robot_poses, robot_polygons, actions.clone()),
            Path::new(obstacle_poses, obstacle_polygons, actions),
            2,
            2.0,
        )
    }

    fn scene_with(x: f32) -> CollisionScene {
        let mut polygons = BTreeMap::new();
        polygons.insert(5, Polygon::rectangle(Vec2::new(x, 0.0), 0.2, 0.2));
        CollisionScene::new(polygons)
    }

    #[test]
    fn test_obstacle_must_be_at_start() {
        let mut path = push();
        let far = scene_with(10.0);
        assert!(path.is_valid(&far, &Pose2::new(1.0, 0.0, 0.0), None));
        assert!(!path.is_valid(&far, &Pose2::new(1.3, 0.0, 0.0), None));
        path.pop_next_step();
        assert!(path.is_valid(&far, &Pose2::new(1.3, 0.0, 0.0), None));
    }

    #[test]
    fn test_obstacle_sweep_is_checked() {
        let path = push();
        let start = Pose2::new(1.0, 0.0, 0.0);
        // Hit by the carried box on its second push only.
        let scene = scene_with(2.3);
        assert!(!path.is_valid(&scene, &start, None));
        assert!(path.is_valid(&scene, &start, Some(2)));
    }

    #[test]
    fn test_pop_keeps_paths_in_sync() {
        let mut path = push();
        assert_eq!(path.len(), 4);
        assert!(matches!(path.pop_next_step(), Some(Action::Grab { entity: 2, .. })));
        assert_eq!(path.robot_path().current_state(), path.obstacle_path().current_state());
        while path.pop_next_step().is_some() {}
        assert!(path.is_empty());
        assert!(path.pop_next_step().is_none());
    }
}
