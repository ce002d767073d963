use glam::{IVec2, UVec2};
use serde::Deserialize;

use super::Traversable;

const TAXI_OFFSETS: [IVec2; 4] = [
    IVec2::new(1, 0),
    IVec2::new(-1, 0),
    IVec2::new(0, 1),
    IVec2::new(0, -1),
];

const DIAGONAL_OFFSETS: [IVec2; 4] = [
    IVec2::new(1, 1),
    IVec2::new(-1, 1),
    IVec2::new(-1, -1),
    IVec2::new(1, -1),
];

const ALL_OFFSETS: [IVec2; 8] = [
    IVec2::new(1, 0),
    IVec2::new(-1, 0),
    IVec2::new(0, 1),
    IVec2::new(0, -1),
    IVec2::new(1, 1),
    IVec2::new(-1, 1),
    IVec2::new(-1, -1),
    IVec2::new(1, -1),
];

/// Cell adjacency used by every grid search and by component labelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Neighborhood {
    /// 4-connected.
    Taxi,
    /// 8-connected; a diagonal step needs both adjacent orthogonal cells free.
    #[default]
    Chessboard,
}

/// A reachable neighbor of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub cell: UVec2,
    pub diagonal: bool,
}

fn offset_cell<G: Traversable + ?Sized>(grid: &G, cell: UVec2, offset: IVec2) -> Option<UVec2> {
    let next = cell.as_ivec2() + offset;
    grid.info().contains_cell(next).then(|| next.as_uvec2())
}

impl Neighborhood {
    /// In-map, unblocked neighbors of `cell`, without corner cutting.
    pub fn free_neighbors<G: Traversable + ?Sized>(&self, grid: &G, cell: UVec2) -> Vec<Neighbor> {
        let mut neighbors = Vec::with_capacity(8);
        for offset in TAXI_OFFSETS {
            if let Some(next) = offset_cell(grid, cell, offset) {
                if !grid.is_blocked(next) {
                    neighbors.push(Neighbor {
                        cell: next,
                        diagonal: false,
                    });
                }
            }
        }

        if *self == Neighborhood::Chessboard {
            for offset in DIAGONAL_OFFSETS {
                let Some(next) = offset_cell(grid, cell, offset) else {
                    continue;
                };
                let side_x = offset_cell(grid, cell, IVec2::new(offset.x, 0));
                let side_y = offset_cell(grid, cell, IVec2::new(0, offset.y));
                let sides_free = [side_x, side_y]
                    .into_iter()
                    .all(|side| side.is_some_and(|c| !grid.is_blocked(c)));
                if sides_free && !grid.is_blocked(next) {
                    neighbors.push(Neighbor {
                        cell: next,
                        diagonal: true,
                    });
                }
            }
        }

        neighbors
    }

    /// Every in-map cell adjacent to `cell`, regardless of occupancy.
    pub fn all_neighbors<G: Traversable + ?Sized>(&self, grid: &G, cell: UVec2) -> Vec<UVec2> {
        let offsets: &[IVec2] = match self {
            Neighborhood::Taxi => &TAXI_OFFSETS,
            Neighborhood::Chessboard => &ALL_OFFSETS,
        };
        offsets
            .iter()
            .filter_map(|offset| offset_cell(grid, cell, *offset))
            .collect()
    }

    /// Admissible distance estimate between two cells, in cells.
    pub fn distance(&self, a: UVec2, b: UVec2) -> f32 {
        let d = (a.as_ivec2() - b.as_ivec2()).abs();
        match self {
            Neighborhood::Taxi => (d.x + d.y) as f32,
            Neighborhood::Chessboard => {
                let (lo, hi) = (d.x.min(d.y) as f32, d.x.max(d.y) as f32);
                hi - lo + lo * crate::types::SQRT_2
            }
        }
    }
}
