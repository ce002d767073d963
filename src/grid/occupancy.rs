use std::collections::BTreeMap;

use glam::{UVec2, Vec2};

use super::{Grid2d, Traversable};
use crate::geometry::Polygon;
use crate::inflation::inflated_footprint;
use crate::types::{MapInfo, Uid};

/// What occupies a cell of an [`OccupancyGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellOccupant {
    Free,
    Single(Uid),
    Multiple,
}

/// Grid counting, per cell, the inflated entity footprints covering it.
///
/// Every cell keeps the uids of the entities overlapping it so that the grid
/// can be updated entity by entity and can tell which obstacle is alone in a
/// cell.
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    cells: Grid2d<Vec<Uid>>,
    footprints: BTreeMap<Uid, Vec<UVec2>>,
    inflation_radius: f32,
}

impl OccupancyGrid {
    pub fn new(info: MapInfo, inflation_radius: f32) -> Self {
        Self {
            cells: Grid2d::filled(info, Vec::new()),
            footprints: BTreeMap::new(),
            inflation_radius,
        }
    }

    pub fn from_polygons<'a>(
        info: MapInfo,
        polygons: impl IntoIterator<Item = (&'a Uid, &'a Polygon)>,
        inflation_radius: f32,
    ) -> Self {
        let mut grid = Self::new(info, inflation_radius);
        for (uid, polygon) in polygons {
            grid.insert(*uid, polygon);
        }
        grid
    }

    pub fn info(&self) -> &MapInfo {
        self.cells.info()
    }

    pub fn inflation_radius(&self) -> f32 {
        self.inflation_radius
    }

    /// Number of inflated entities covering the cell; 0 outside the map.
    pub fn count(&self, cell: UVec2) -> usize {
        self.cells.get(cell).map_or(0, Vec::len)
    }

    pub fn uids_at(&self, cell: UVec2) -> &[Uid] {
        self.cells.get(cell).map_or(&[], Vec::as_slice)
    }

    pub fn only_obstacle_in_cell(&self, cell: UVec2) -> CellOccupant {
        match self.uids_at(cell) {
            [] => CellOccupant::Free,
            [uid] => CellOccupant::Single(*uid),
            _ => CellOccupant::Multiple,
        }
    }

    pub fn contains_uid(&self, uid: Uid) -> bool {
        self.footprints.contains_key(&uid)
    }

    pub fn footprint(&self, uid: Uid) -> Option<&[UVec2]> {
        self.footprints.get(&uid).map(Vec::as_slice)
    }

    /// Add an entity footprint, replacing any previous footprint of the same uid.
    pub fn insert(&mut self, uid: Uid, polygon: &Polygon) {
        self.remove(uid);
        let cells = inflated_footprint(self.info(), polygon, self.inflation_radius);
        for cell in &cells {
            if let Some(uids) = self.cells.get_mut(*cell) {
                uids.push(uid);
            }
        }
        self.footprints.insert(uid, cells);
    }

    /// Remove an entity footprint; returns false if the uid was not present.
    pub fn remove(&mut self, uid: Uid) -> bool {
        let Some(cells) = self.footprints.remove(&uid) else {
            return false;
        };
        for cell in cells {
            if let Some(uids) = self.cells.get_mut(cell) {
                uids.retain(|u| *u != uid);
            }
        }
        true
    }

    /// Apply a batch of footprint changes.
    pub fn update<'a>(
        &mut self,
        added: impl IntoIterator<Item = (&'a Uid, &'a Polygon)>,
        removed: impl IntoIterator<Item = Uid>,
    ) {
        for uid in removed {
            self.remove(uid);
        }
        for (uid, polygon) in added {
            self.insert(*uid, polygon);
        }
    }

    /// Rectangle polygon covering the whole map.
    pub fn bounding_polygon(&self) -> Polygon {
        Polygon::from_bounds(&self.info().bounds())
    }

    /// Boolean mask, `true` where at least one entity covers the cell.
    pub fn blocked_mask(&self) -> Grid2d<bool> {
        self.cells.map(|uids| !uids.is_empty())
    }

    pub fn cell_center(&self, cell: UVec2) -> Vec2 {
        self.info().cell_center(cell)
    }
}

impl Traversable for OccupancyGrid {
    fn info(&self) -> &MapInfo {
        self.cells.info()
    }

    fn is_blocked(&self, cell: UVec2) -> bool {
        self.cells.get(cell).is_none_or(|uids| !uids.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with_two_boxes() -> OccupancyGrid {
        let mut grid = OccupancyGrid::new(MapInfo::square(10, 1.0), 0.0);
        grid.insert(1, &Polygon::rectangle(Vec2::new(3.0, 3.0), 2.0, 2.0));
        grid.insert(2, &Polygon::rectangle(Vec2::new(4.0, 3.0), 2.0, 2.0));
        grid
    }

    #[test]
    fn test_counts_and_occupants() {
        let grid = grid_with_two_boxes();
        assert_eq!(grid.count(UVec2::new(2, 2)), 1);
        assert_eq!(grid.count(UVec2::new(3, 2)), 2);
        assert_eq!(grid.only_obstacle_in_cell(UVec2::new(2, 2)), CellOccupant::Single(1));
        assert_eq!(grid.only_obstacle_in_cell(UVec2::new(4, 3)), CellOccupant::Single(2));
        assert_eq!(grid.only_obstacle_in_cell(UVec2::new(3, 3)), CellOccupant::Multiple);
        assert_eq!(grid.only_obstacle_in_cell(UVec2::new(8, 8)), CellOccupant::Free);
        assert!(grid.is_blocked(UVec2::new(20, 0)));
    }

    #[test]
    fn test_remove_and_reinsert() {
        let mut grid = grid_with_two_boxes();
        assert!(grid.remove(1));
        assert!(!grid.remove(1));
        assert_eq!(grid.count(UVec2::new(2, 2)), 0);
        assert_eq!(grid.count(UVec2::new(3, 2)), 1);

        grid.insert(2, &Polygon::rectangle(Vec2::new(8.0, 8.0), 2.0, 2.0));
        assert_eq!(grid.count(UVec2::new(4, 3)), 0);
        assert_eq!(grid.count(UVec2::new(7, 7)), 1);
        assert_eq!(grid.footprint(2).map(<[UVec2]>::len), Some(4));
    }

    #[test]
    fn test_update_batch() {
        let mut grid = grid_with_two_boxes();
        let moved = Polygon::rectangle(Vec2::new(7.0, 7.0), 2.0, 2.0);
        grid.update([(&1, &moved)], [2]);
        assert!(!grid.contains_uid(2));
        assert_eq!(grid.count(UVec2::new(6, 6)), 1);
        assert_eq!(grid.count(UVec2::new(3, 2)), 0);
    }

    #[test]
    fn test_inflation_radius_blocks_neighbors() {
        let mut grid = OccupancyGrid::new(MapInfo::square(10, 1.0), 1.0);
        grid.insert(1, &Polygon::rectangle(Vec2::new(5.0, 5.0), 2.0, 2.0));
        assert!(grid.is_blocked(UVec2::new(3, 4)));
        assert!(!grid.is_blocked(UVec2::new(2, 4)));
    }
}
