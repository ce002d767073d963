//! Searches over occupancy grid cells.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use glam::UVec2;

use super::astar::{AStarConfig, SearchNode, search};
use crate::grid::{Neighborhood, Traversable};
use crate::types::{MapInfo, Pose2, SQRT_2};

impl SearchNode for UVec2 {
    type Key = UVec2;

    fn key(&self) -> UVec2 {
        *self
    }
}

/// Length in meters of a step between two neighboring cells.
#[inline]
pub fn step_length(diagonal: bool, resolution: f32) -> f32 {
    if diagonal {
        resolution * SQRT_2
    } else {
        resolution
    }
}

/// Shortest free-cell path between two cells and its length in meters.
///
/// Returns `None` when either end is blocked or no path exists.
pub fn grid_search<G: Traversable + ?Sized>(
    grid: &G,
    start: UVec2,
    goal: UVec2,
    neighborhood: Neighborhood,
) -> Option<(Vec<UVec2>, f32)> {
    if grid.is_blocked(start) || grid.is_blocked(goal) {
        return None;
    }
    let resolution = grid.info().resolution;

    let outcome = search(
        [(start, 0.0)],
        &goal,
        &AStarConfig::default(),
        |current, goal| current == goal,
        |current, state| {
            let g = state.g_score(current).unwrap_or(f32::INFINITY);
            neighborhood
                .free_neighbors(grid, *current)
                .into_iter()
                .map(|n| (n.cell, g + step_length(n.diagonal, resolution)))
                .collect()
        },
        |current, goal| neighborhood.distance(*current, *goal) * resolution,
    );

    let end = *outcome.end_key()?;
    let cost = outcome.g_score(&end)?;
    Some((outcome.path_to(&end), cost))
}

#[derive(PartialEq)]
struct DijkstraEntry {
    cost: f32,
    cell: UVec2,
}

impl Eq for DijkstraEntry {}

impl Ord for DijkstraEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| (other.cell.y, other.cell.x).cmp(&(self.cell.y, self.cell.x)))
    }
}

impl PartialOrd for DijkstraEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Travel distance in meters from `start` to every reachable free cell.
///
/// The start cell itself is always included, even when blocked.
pub fn dijkstra<G: Traversable + ?Sized>(
    grid: &G,
    start: UVec2,
    neighborhood: Neighborhood,
) -> HashMap<UVec2, f32> {
    dijkstra_from(grid, [start], neighborhood)
}

/// Travel distance in meters from the closest of `starts` to every reachable
/// free cell.
pub fn dijkstra_from<G: Traversable + ?Sized>(
    grid: &G,
    starts: impl IntoIterator<Item = UVec2>,
    neighborhood: Neighborhood,
) -> HashMap<UVec2, f32> {
    let resolution = grid.info().resolution;
    let mut distances = HashMap::new();
    let mut open = BinaryHeap::new();
    for cell in starts {
        distances.insert(cell, 0.0);
        open.push(DijkstraEntry { cost: 0.0, cell });
    }

    while let Some(DijkstraEntry { cost, cell }) = open.pop() {
        if distances.get(&cell).is_some_and(|known| *known < cost) {
            continue;
        }
        for neighbor in neighborhood.free_neighbors(grid, cell) {
            let next = cost + step_length(neighbor.diagonal, resolution);
            if distances.get(&neighbor.cell).is_none_or(|known| next < *known) {
                distances.insert(neighbor.cell, next);
                open.push(DijkstraEntry {
                    cost: next,
                    cell: neighbor.cell,
                });
            }
        }
    }

    distances
}

/// Turn a cell path into world poses.
///
/// The path starts at `start`, passes through the centers of the
/// intermediate cells, each heading toward itself from the previous pose,
/// and ends exactly at `goal`.
pub fn real_path_from_cells(
    start: &Pose2,
    cells: &[UVec2],
    goal: &Pose2,
    info: &MapInfo,
) -> Vec<Pose2> {
    let mut poses = vec![*start];
    let inner = if cells.len() > 2 {
        &cells[1..cells.len() - 1]
    } else {
        &[]
    };
    for cell in inner {
        let position = info.cell_center(*cell);
        let previous = poses.last().map_or(start.position, |p| p.position);
        let direction = position - previous;
        poses.push(Pose2::from_position(
            position,
            direction.y.atan2(direction.x).to_degrees(),
        ));
    }
    poses.push(*goal);
    poses
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::grid::Grid2d;

    fn grid_with_wall() -> Grid2d<bool> {
        // Wall on column 2 with a gap at the top row.
        let mut grid = Grid2d::filled(MapInfo::square(5, 0.5), false);
        for y in 0..4 {
            grid.set(UVec2::new(2, y), true).unwrap();
        }
        grid
    }

    #[test]
    fn test_grid_search_goes_through_gap() {
        let grid = grid_with_wall();
        let (path, cost) =
            grid_search(&grid, UVec2::new(0, 0), UVec2::new(4, 0), Neighborhood::Chessboard)
                .unwrap();
        assert_eq!(path.first(), Some(&UVec2::new(0, 0)));
        assert_eq!(path.last(), Some(&UVec2::new(4, 0)));
        assert!(path.contains(&UVec2::new(2, 4)));
        assert!(cost > 4.0 * 0.5);
    }

    #[test]
    fn test_grid_search_blocked_endpoints() {
        let grid = grid_with_wall();
        assert!(grid_search(&grid, UVec2::new(2, 0), UVec2::new(4, 0), Neighborhood::Taxi).is_none());
    }

    #[test]
    fn test_taxi_cost() {
        let grid = Grid2d::filled(MapInfo::square(5, 1.0), false);
        let (path, cost) =
            grid_search(&grid, UVec2::new(0, 0), UVec2::new(2, 3), Neighborhood::Taxi).unwrap();
        assert_eq!(path.len(), 6);
        assert_relative_eq!(cost, 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dijkstra_distances() {
        let grid = Grid2d::filled(MapInfo::square(3, 1.0), false);
        let distances = dijkstra(&grid, UVec2::new(0, 0), Neighborhood::Chessboard);
        assert_eq!(distances.len(), 9);
        assert_relative_eq!(distances[&UVec2::new(2, 2)], 2.0 * SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(distances[&UVec2::new(2, 1)], 1.0 + SQRT_2, epsilon = 1e-6);
    }

    #[test]
    fn test_real_path_ends_on_exact_poses() {
        let info = MapInfo::square(5, 1.0);
        let start = Pose2::new(0.2, 0.3, 45.0);
        let goal = Pose2::new(2.7, 0.4, 180.0);
        let cells = [UVec2::new(0, 0), UVec2::new(1, 0), UVec2::new(2, 0)];
        let poses = real_path_from_cells(&start, &cells, &goal, &info);
        assert_eq!(poses.len(), 3);
        assert_eq!(poses[0], start);
        assert_eq!(poses[2], goal);
        assert_relative_eq!(poses[1].x(), 1.5, epsilon = 1e-6);
        assert_relative_eq!(poses[1].y(), 0.5, epsilon = 1e-6);
    }
}
