use glam::UVec2;

use crate::types::MapInfo;

/// Grids that a search can walk on.
pub trait Traversable {
    fn info(&self) -> &MapInfo;

    /// True when the cell cannot be entered. Cells outside the map are blocked.
    fn is_blocked(&self, cell: UVec2) -> bool;

    fn width(&self) -> u32 {
        self.info().width
    }

    fn height(&self) -> u32 {
        self.info().height
    }

    fn is_free(&self, cell: UVec2) -> bool {
        !self.is_blocked(cell)
    }
}

/// A boolean mask where `true` marks a blocked cell.
impl Traversable for super::Grid2d<bool> {
    fn info(&self) -> &MapInfo {
        self.info()
    }

    fn is_blocked(&self, cell: UVec2) -> bool {
        self.get(cell).copied().unwrap_or(true)
    }
}
