use std::collections::HashMap;

use super::Workspace;
use super::configuration::{Configuration, RobotObstacleConfiguration};
use crate::collision::swept_step_collision;
use crate::grid::Traversable;
use crate::search::{SearchNode, SearchState};
use crate::types::DiscretePose;

/// Static collision results of both bodies, keyed by discretized pose.
#[derive(Debug, Default)]
pub struct StaticCollisionCache {
    robot: HashMap<DiscretePose, bool>,
    obstacle: HashMap<DiscretePose, bool>,
}

fn is_blocked_at(ws: &Workspace, config: &Configuration) -> bool {
    !config.polygon.is_within(&ws.map_bounds) || ws.scene.collides(&config.polygon)
}

impl StaticCollisionCache {
    pub fn robot_collides(&mut self, ws: &Workspace, robot: &Configuration) -> bool {
        *self
            .robot
            .entry(robot.discrete)
            .or_insert_with(|| is_blocked_at(ws, robot))
    }

    pub fn obstacle_collides(&mut self, ws: &Workspace, obstacle: &Configuration) -> bool {
        *self
            .obstacle
            .entry(obstacle.discrete)
            .or_insert_with(|| is_blocked_at(ws, obstacle))
    }

    pub fn len(&self) -> usize {
        self.robot.len() + self.obstacle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Successors of `current` under every motion primitive, with their
/// tentative g-scores.
///
/// A primitive that undoes the previous action is skipped. Each successor
/// must have both bodies on free cells of their grids, inside the map and
/// clear of the scene, at rest and while moving.
pub fn expand(
    ws: &Workspace,
    current: &RobotObstacleConfiguration,
    state: &SearchState<RobotObstacleConfiguration>,
    cache: &mut StaticCollisionCache,
) -> Vec<(RobotObstacleConfiguration, f32)> {
    let g = state.g_score(&current.key()).unwrap_or(f32::INFINITY);
    let rotation_unit = ws.actions.rotation_unit_angle();
    let mut successors = Vec::new();

    for primitive in ws.actions.primitives() {
        if current
            .action
            .as_ref()
            .is_some_and(|previous| primitive.undoes(previous))
        {
            continue;
        }
        let motion = primitive.motion(&current.robot.pose);
        let robot_pose = motion.apply_pose(&current.robot.pose);
        let obstacle_pose = motion.apply_pose(&current.obstacle.pose);
        let key = (
            ws.info.discretize(&robot_pose, rotation_unit),
            ws.info.discretize(&obstacle_pose, rotation_unit),
        );
        if state.is_closed(&key) {
            continue;
        }

        let robot = ws.configuration(robot_pose, motion.apply(&current.robot.polygon));
        let obstacle = ws.configuration(obstacle_pose, motion.apply(&current.obstacle.polygon));
        let cells_free = ws.info.contains_cell(robot.cell)
            && ws.info.contains_cell(obstacle.cell)
            && ws.robot_grid.is_free(robot.cell.as_uvec2())
            && ws.obstacle_grid.is_free(obstacle.cell.as_uvec2());
        if !cells_free {
            continue;
        }
        if cache.robot_collides(ws, &robot) || cache.obstacle_collides(ws, &obstacle) {
            continue;
        }

        let robot_sweep =
            swept_step_collision(&ws.scene, &current.robot.polygon, &robot.polygon, motion);
        if robot_sweep.colliding_uid.is_some() {
            continue;
        }
        let obstacle_sweep = swept_step_collision(
            &ws.scene,
            &current.obstacle.polygon,
            &obstacle.polygon,
            motion,
        );
        if obstacle_sweep.colliding_uid.is_some() {
            continue;
        }

        let tentative_g = g + ws.cost.g(&current.robot.pose, &robot.pose, true);
        successors.push((
            RobotObstacleConfiguration {
                robot,
                obstacle,
                action: Some(primitive.to_action()),
                motion: Some(motion),
                robot_sweep: Some(robot_sweep),
                obstacle_sweep: Some(obstacle_sweep),
            },
            tentative_g,
        ));
    }
    successors
}
