//! Where the robot can grab the obstacle, and where the obstacle should go.

use std::collections::{HashMap, HashSet};

use glam::{IVec2, UVec2, Vec2};

use super::Workspace;
use crate::behavior::SocialCostmap;
use crate::collision::{CollisionData, Motion, swept_step_collision};
use crate::geometry::{Polygon, sample_poses_at_middle_of_inflated_sides};
use crate::grid::{Neighborhood, OccupancyGrid};
use crate::search::dijkstra;
use crate::types::{
    DEFAULT_GOAL_DISTANCE_WEIGHT, DEFAULT_OBSTACLE_DISTANCE_WEIGHT, DEFAULT_SOCIAL_WEIGHT, Pose2,
    RELEASE_MARGIN_CELLS, rotate_point,
};

/// A way of grabbing the obstacle.
///
/// The robot ends its transit at `transit_end`, then translates straight
/// into `transfer_start`, touching distance from one side of the obstacle.
#[derive(Debug, Clone)]
pub struct Contact {
    pub transit_end: Pose2,
    pub transfer_start: Pose2,
    pub transfer_polygon: Polygon,
    /// Hull swept by the robot while grabbing.
    pub sweep: CollisionData,
}

/// Contacts facing the middle of each obstacle side that the robot can
/// reach and grab from without hitting anything.
pub fn manipulation_contacts(ws: &Workspace) -> Vec<Contact> {
    let polygon = &ws.obstacle.polygon;
    let resolution = ws.info.resolution;
    let transfer_starts = sample_poses_at_middle_of_inflated_sides(polygon, ws.robot_radius);
    let transit_ends = sample_poses_at_middle_of_inflated_sides(
        polygon,
        ws.robot_radius + RELEASE_MARGIN_CELLS * resolution,
    );

    transit_ends
        .into_iter()
        .zip(transfer_starts)
        .filter_map(|(transit_end, transfer_start)| {
            let cell = ws.info.world_to_cell(transit_end.position)?;
            if !ws.accessible.contains(&cell) {
                return None;
            }
            let transfer_polygon = ws.robot_polygon_at(&transfer_start);
            if !transfer_polygon.is_within(&ws.map_bounds) || ws.scene.collides(&transfer_polygon) {
                return None;
            }
            let motion = Motion::Translation(transfer_start.position - transit_end.position);
            let sweep = swept_step_collision(
                &ws.scene,
                &ws.robot_polygon_at(&transit_end),
                &transfer_polygon,
                motion,
            );
            if sweep.colliding_uid.is_some() {
                return None;
            }
            Some(Contact {
                transit_end,
                transfer_start,
                transfer_polygon,
                sweep,
            })
        })
        .collect()
}

/// Robot pose that keeps the grasp `robot_manip_pose` once the obstacle has
/// moved rigidly from `obstacle_start` to `obstacle_goal`.
pub fn deduce_robot_goal_pose(
    robot_manip_pose: &Pose2,
    obstacle_start: &Pose2,
    obstacle_goal: &Pose2,
) -> Pose2 {
    let rotation = obstacle_goal.theta - obstacle_start.theta;
    let position = rotate_point(
        robot_manip_pose.position,
        obstacle_start.position,
        rotation,
    ) + (obstacle_goal.position - obstacle_start.position);
    Pose2::from_position(position, robot_manip_pose.theta + rotation)
}

/// Min-max normalization; a constant series maps to zeros.
fn normalized(values: &[f32]) -> Vec<f32> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let ptp = max - min;
    values
        .iter()
        .map(|v| if ptp > 0.0 { (v - min) / ptp } else { 0.0 })
        .collect()
}

/// Cells where the obstacle could be left, cheapest first.
///
/// A cell's cost mixes its social cost, the travel distance from the
/// obstacle's current cell and the distance to the robot goal, each
/// normalized over all candidate cells.
#[derive(Debug, Clone)]
pub struct DestinationRanking {
    ranked: Vec<(UVec2, f32)>,
    costs: HashMap<UVec2, f32>,
    bound: f32,
}

impl DestinationRanking {
    /// Rank every cell the obstacle can reach on `obstacle_grid`, except the
    /// `excluded` ones and the socially forbidden ones.
    ///
    /// `bound_percentage` of the ranked cells, the cheapest, fall below the
    /// bound quantile.
    pub fn compute(
        obstacle_grid: &OccupancyGrid,
        social: &SocialCostmap,
        obstacle_cell: UVec2,
        excluded: &HashSet<UVec2>,
        goal: Vec2,
        neighborhood: Neighborhood,
        bound_percentage: f32,
    ) -> Self {
        let info = obstacle_grid.info();
        let mut candidates: Vec<(UVec2, f32)> = dijkstra(obstacle_grid, obstacle_cell, neighborhood)
            .into_iter()
            .filter(|(cell, _)| !excluded.contains(cell) && !social.is_forbidden(*cell))
            .collect();
        candidates.sort_unstable_by_key(|(cell, _)| (cell.y, cell.x));

        let social_costs: Vec<f32> = candidates.iter().map(|(c, _)| social.cost(*c)).collect();
        let obstacle_distances: Vec<f32> = candidates.iter().map(|(_, d)| *d).collect();
        let goal_distances: Vec<f32> = candidates
            .iter()
            .map(|(c, _)| info.cell_center(*c).distance(goal))
            .collect();

        let social_costs = normalized(&social_costs);
        let obstacle_distances = normalized(&obstacle_distances);
        let goal_distances = normalized(&goal_distances);
        let total_weight =
            DEFAULT_SOCIAL_WEIGHT + DEFAULT_OBSTACLE_DISTANCE_WEIGHT + DEFAULT_GOAL_DISTANCE_WEIGHT;

        let mut ranked: Vec<(UVec2, f32)> = candidates
            .iter()
            .enumerate()
            .map(|(i, (cell, _))| {
                let cost = (DEFAULT_SOCIAL_WEIGHT * social_costs[i]
                    + DEFAULT_OBSTACLE_DISTANCE_WEIGHT * obstacle_distances[i]
                    + DEFAULT_GOAL_DISTANCE_WEIGHT * goal_distances[i])
                    / total_weight;
                (*cell, cost)
            })
            .collect();
        ranked.sort_by(|a, b| {
            a.1.total_cmp(&b.1)
                .then_with(|| (a.0.y, a.0.x).cmp(&(b.0.y, b.0.x)))
        });

        let bound = Self::bound_quantile(&ranked, bound_percentage);
        let costs = ranked.iter().copied().collect();
        Self {
            ranked,
            costs,
            bound,
        }
    }

    fn bound_quantile(ranked: &[(UVec2, f32)], percentage: f32) -> f32 {
        let n = ranked.len();
        if n == 0 {
            return f32::NEG_INFINITY;
        }
        // Position counted from the most expensive cell.
        let from_worst = ((n as f32 * (1.0 - percentage)).round() as usize)
            .saturating_sub(1)
            .min(n - 1);
        ranked[n - 1 - from_worst].1
    }

    pub fn ranked(&self) -> &[(UVec2, f32)] {
        &self.ranked
    }

    pub fn cost(&self, cell: UVec2) -> Option<f32> {
        self.costs.get(&cell).copied()
    }

    pub fn bound(&self) -> f32 {
        self.bound
    }

    /// True for ranked cells strictly cheaper than the bound quantile.
    pub fn is_within_bound(&self, cell: IVec2) -> bool {
        if cell.x < 0 || cell.y < 0 {
            return false;
        }
        self.cost(cell.as_uvec2())
            .is_some_and(|cost| cost < self.bound)
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}
