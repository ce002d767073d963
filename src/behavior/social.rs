use glam::UVec2;

use crate::grid::{Grid2d, Neighborhood, OccupancyGrid};
use crate::search::dijkstra_from;
use crate::types::FORBIDDEN_COST;

/// Per-cell cost of leaving an obstacle there.
///
/// Cells covered by static obstacles are forbidden. Every other cell costs
/// its clearance from the static obstacles normalized to `[0, 1]`, so
/// placements along walls are the cheapest.
#[derive(Debug, Clone)]
pub struct SocialCostmap {
    costs: Grid2d<f32>,
}

impl SocialCostmap {
    /// Build from a grid of the static obstacles, without inflation.
    pub fn from_static_grid(grid: &OccupancyGrid, neighborhood: Neighborhood) -> Self {
        let info = grid.info().clone();
        let static_cells: Vec<UVec2> = grid
            .blocked_mask()
            .iter_cells()
            .filter(|(_, blocked)| **blocked)
            .map(|(cell, _)| cell)
            .collect();

        let mut costs = Grid2d::filled(info, 0.0);
        if static_cells.is_empty() {
            return Self { costs };
        }

        let clearance = dijkstra_from(grid, static_cells.iter().copied(), neighborhood);
        let max_clearance = clearance.values().copied().fold(0.0f32, f32::max);
        for (cell, distance) in &clearance {
            if let Some(cost) = costs.get_mut(*cell) {
                *cost = if max_clearance > 0.0 {
                    distance / max_clearance
                } else {
                    0.0
                };
            }
        }
        for cell in static_cells {
            if let Some(cost) = costs.get_mut(cell) {
                *cost = FORBIDDEN_COST;
            }
        }
        Self { costs }
    }

    /// Cost of a cell; out-of-map cells are forbidden.
    pub fn cost(&self, cell: UVec2) -> f32 {
        self.costs.get(cell).copied().unwrap_or(FORBIDDEN_COST)
    }

    pub fn is_forbidden(&self, cell: UVec2) -> bool {
        self.cost(cell) == FORBIDDEN_COST
    }

    pub fn grid(&self) -> &Grid2d<f32> {
        &self.costs
    }
}
