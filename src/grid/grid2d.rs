use glam::{IVec2, UVec2, Vec2};

use crate::types::{MapInfo, NamoError};

#[derive(Debug, Clone, PartialEq)]
pub struct Grid2d<T> {
    info: MapInfo,
    data: Vec<T>,
}

impl<T> Grid2d<T> {
    pub fn new(info: MapInfo, data: Vec<T>) -> Result<Self, NamoError> {
        let expected_len = info.cell_count();
        if data.len() != expected_len {
            return Err(NamoError::InvalidMetadata(format!(
                "data length {} does not match map size {}",
                data.len(),
                expected_len
            )));
        }

        Ok(Self { info, data })
    }

    /// Grid with every cell set to `value`.
    pub fn filled(info: MapInfo, value: T) -> Self
    where
        T: Clone,
    {
        let data = vec![value; info.cell_count()];
        Self { info, data }
    }

    pub fn empty(info: MapInfo) -> Self
    where
        T: Clone + Default,
    {
        Self::filled(info, T::default())
    }

    pub fn info(&self) -> &MapInfo {
        &self.info
    }

    pub fn width(&self) -> u32 {
        self.info.width
    }

    pub fn height(&self) -> u32 {
        self.info.height
    }

    pub fn get(&self, pos: UVec2) -> Option<&T> {
        if pos.x >= self.info.width || pos.y >= self.info.height {
            return None;
        }
        let idx = self.index(pos);
        self.data.get(idx)
    }

    /// Signed lookup, `None` for cells outside the grid.
    pub fn get_signed(&self, pos: IVec2) -> Option<&T> {
        if !self.info.contains_cell(pos) {
            return None;
        }
        self.get(pos.as_uvec2())
    }

    pub fn get_mut(&mut self, pos: UVec2) -> Option<&mut T> {
        if pos.x >= self.info.width || pos.y >= self.info.height {
            return None;
        }
        let idx = self.index(pos);
        self.data.get_mut(idx)
    }

    pub fn set(&mut self, pos: UVec2, value: T) -> Result<(), NamoError> {
        let (width, height) = (self.info.width, self.info.height);
        let Some(cell) = self.get_mut(pos) else {
            return Err(NamoError::OutOfBounds(format!(
                "cell ({}, {}) out of bounds for map {}x{}",
                pos.x, pos.y, width, height
            )));
        };
        *cell = value;
        Ok(())
    }

    #[inline]
    fn index(&self, pos: UVec2) -> usize {
        (pos.y as usize) * (self.info.width as usize) + (pos.x as usize)
    }

    #[inline]
    fn cell_at(&self, index: usize) -> UVec2 {
        let width = self.info.width as usize;
        UVec2::new((index % width) as u32, (index / width) as u32)
    }

    pub fn map_to_world(&self, pos: Vec2) -> Vec2 {
        self.info.origin + pos * self.info.resolution
    }

    pub fn world_to_map(&self, pos: Vec2) -> Option<Vec2> {
        let map = self.info.world_to_map(pos);
        if map.x < 0.0
            || map.y < 0.0
            || map.x >= self.info.width as f32
            || map.y >= self.info.height as f32
        {
            return None;
        }
        Some(map)
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Row-major iteration over `(cell, value)` pairs.
    pub fn iter_cells(&self) -> impl Iterator<Item = (UVec2, &T)> + '_ {
        self.data
            .iter()
            .enumerate()
            .map(|(i, value)| (self.cell_at(i), value))
    }

    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Grid2d<U> {
        Grid2d {
            info: self.info.clone(),
            data: self.data.iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_to_map_to_world(grid: &Grid2d<i8>, pos: Vec2) -> Vec2 {
        let map_pos = grid.world_to_map(pos).unwrap();
        grid.map_to_world(map_pos)
    }

    #[test]
    fn test_world_to_map_to_world() {
        let grid = Grid2d::<i8>::new(MapInfo::square(10, 1.0), vec![0; 100]).unwrap();

        for pos in [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.5, 1.5),
            Vec2::new(1.5, 0.5),
        ] {
            assert_eq!(world_to_map_to_world(&grid, pos), pos);
        }
        assert_eq!(grid.world_to_map(Vec2::new(10.0, 0.0)), None);
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        let result = Grid2d::<u8>::new(MapInfo::square(4, 1.0), vec![0; 3]);
        assert!(matches!(result, Err(NamoError::InvalidMetadata(_))));
    }

    #[test]
    fn test_set_out_of_bounds() {
        let mut grid = Grid2d::<u8>::empty(MapInfo::square(4, 1.0));
        assert!(grid.set(UVec2::new(3, 3), 7).is_ok());
        assert_eq!(grid.get(UVec2::new(3, 3)), Some(&7));
        assert!(matches!(
            grid.set(UVec2::new(4, 0), 1),
            Err(NamoError::OutOfBounds(_))
        ));
        assert_eq!(grid.get_signed(IVec2::new(-1, 0)), None);
    }

    #[test]
    fn test_iter_cells_is_row_major() {
        let info = MapInfo {
            width: 3,
            height: 2,
            ..Default::default()
        };
        let grid = Grid2d::new(info, (0..6).collect()).unwrap();
        let cells: Vec<(UVec2, i32)> = grid.iter_cells().map(|(c, v)| (c, *v)).collect();
        assert_eq!(cells[1], (UVec2::new(1, 0), 1));
        assert_eq!(cells[4], (UVec2::new(1, 1), 4));
    }
}
