//! Acceptance tests for obstacle end placements.

use std::collections::{BTreeSet, HashMap};

use glam::UVec2;
use log::trace;

use super::candidates::{Contact, DestinationRanking, deduce_robot_goal_pose};
use super::configuration::{Configuration, JointKey, RobotObstacleConfiguration};
use super::Workspace;
use crate::geometry::Polygon;
use crate::grid::{OccupancyGrid, Traversable};
use crate::search::{SearchOutcome, grid_search};
use crate::types::{DiscretePose, Pose2, Uid};

/// Entities closer to `polygon` than `distance`, sorted.
fn blocking_set(ws: &Workspace, polygon: &Polygon, distance: f32) -> BTreeSet<Uid> {
    ws.scene
        .polygons()
        .iter()
        .filter(|(_, other)| polygon.distance_to_polygon(other) < distance)
        .map(|(uid, _)| *uid)
        .collect()
}

/// Tells whether leaving the obstacle somewhere lets the robot through.
///
/// Works on a private copy of the robot grid where the obstacle is inserted
/// at each tested placement. Results are cached by obstacle pose.
pub struct OpeningChecker {
    grid: OccupancyGrid,
    cache: HashMap<DiscretePose, bool>,
    /// Entities close to the obstacle before it moves, when local openings are checked first.
    initial_blocking: Option<BTreeSet<Uid>>,
}

impl OpeningChecker {
    pub fn new(ws: &Workspace) -> Self {
        let initial_blocking = ws.config.check_new_local_opening_before_global.then(|| {
            blocking_set(ws, &ws.obstacle.polygon, 2.0 * ws.robot_radius)
        });
        Self {
            grid: ws.robot_grid.clone(),
            cache: HashMap::new(),
            initial_blocking,
        }
    }

    /// Cell the robot must reach once the obstacle is out of the way.
    fn target_cell(&self, ws: &Workspace) -> Option<UVec2> {
        match ws.goal_cell {
            Some(goal) if ws.target.is_empty() || ws.target.contains(&goal) => Some(goal),
            _ => {
                let mut cells: Vec<UVec2> = ws.target.iter().copied().collect();
                cells.sort_unstable_by_key(|c| (c.y, c.x));
                cells.into_iter().find(|cell| self.grid.is_free(*cell))
            }
        }
    }

    fn opens_locally(&self, ws: &Workspace, obstacle: &Configuration) -> bool {
        let Some(initial) = &self.initial_blocking else {
            return true;
        };
        if initial.len() < 2 {
            return true;
        }
        let blocking = blocking_set(ws, &obstacle.polygon, 2.0 * ws.robot_radius);
        !initial.is_subset(&blocking)
    }

    pub fn creates_opening(&mut self, ws: &Workspace, obstacle: &Configuration) -> bool {
        if let Some(known) = self.cache.get(&obstacle.discrete) {
            return *known;
        }
        let opens = self.opens_locally(ws, obstacle) && {
            self.grid.insert(ws.obstacle.uid, &obstacle.polygon);
            let reachable = self
                .target_cell(ws)
                .is_some_and(|target| {
                    grid_search(&self.grid, ws.robot_cell, target, ws.config.neighborhood).is_some()
                });
            self.grid.remove(ws.obstacle.uid);
            reachable
        };
        trace!(
            "[ManipSearch] placement {:?} {} an opening",
            obstacle.discrete,
            if opens { "creates" } else { "does not create" }
        );
        self.cache.insert(obstacle.discrete, opens);
        opens
    }
}

/// The obstacle has moved, the robot can back off it and the robot path opens.
pub fn accepts(
    ws: &Workspace,
    opening: &mut OpeningChecker,
    candidate: &RobotObstacleConfiguration,
) -> bool {
    candidate.obstacle.discrete != ws.obstacle_start.discrete
        && ws.walk_back(&candidate.robot).is_some()
        && opening.creates_opening(ws, &candidate.obstacle)
}

/// Best ranked placement that is collision free, leaves room to release the
/// obstacle and creates an opening, with the robot still holding it.
///
/// Used as the goal of the manipulation search; it does not need to be
/// reachable by pushing.
pub fn first_pass(
    ws: &Workspace,
    ranking: &DestinationRanking,
    contacts: &[Contact],
    opening: &mut OpeningChecker,
) -> Option<RobotObstacleConfiguration> {
    let offsets = ws.actions.rotation_offsets();
    for (cell, _) in ranking.ranked() {
        let center = ws.info.cell_center(*cell);
        for offset in &offsets {
            let obstacle_pose = Pose2::from_position(center, ws.obstacle.pose.theta + offset);
            let obstacle_polygon = ws.obstacle_polygon_at(&obstacle_pose);
            if !obstacle_polygon.is_within(&ws.map_bounds) || ws.scene.collides(&obstacle_polygon)
            {
                continue;
            }
            let obstacle = ws.configuration(obstacle_pose, obstacle_polygon);
            let robot = contacts.iter().find_map(|contact| {
                let pose =
                    deduce_robot_goal_pose(&contact.transfer_start, &ws.obstacle.pose, &obstacle_pose);
                let polygon = ws.robot_polygon_at(&pose);
                (polygon.is_within(&ws.map_bounds) && !ws.scene.collides(&polygon))
                    .then(|| ws.configuration(pose, polygon))
            });
            let Some(robot) = robot else {
                continue;
            };
            let candidate = RobotObstacleConfiguration::at_rest(robot, obstacle);
            if accepts(ws, opening, &candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

/// Fallback over everything the search closed: the cheapest reached state
/// in the best ranked cell that is acceptable.
pub fn second_pass(
    ws: &Workspace,
    ranking: &DestinationRanking,
    outcome: &SearchOutcome<RobotObstacleConfiguration>,
    opening: &mut OpeningChecker,
) -> Option<JointKey> {
    let mut by_cell: HashMap<UVec2, Vec<(f32, JointKey)>> = HashMap::new();
    for key in outcome.closed_keys() {
        let Some(node) = outcome.node(key) else {
            continue;
        };
        if node.obstacle.cell.x < 0 || node.obstacle.cell.y < 0 {
            continue;
        }
        let g = outcome.g_score(key).unwrap_or(f32::INFINITY);
        by_cell
            .entry(node.obstacle.cell.as_uvec2())
            .or_default()
            .push((g, *key));
    }

    for (cell, _) in ranking.ranked() {
        let Some(reached) = by_cell.get_mut(cell) else {
            continue;
        };
        reached.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        for (_, key) in reached.iter() {
            if let Some(node) = outcome.node(key) {
                if accepts(ws, opening, node) {
                    return Some(*key);
                }
            }
        }
    }
    None
}
