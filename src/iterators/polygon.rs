use glam::{IVec2, UVec2, Vec2};

use crate::geometry::Polygon;
use crate::types::MapInfo;

/// Boundary slack in cells; a polygon that only grazes a cell border does not touch it.
const EDGE_EPS: f32 = 1e-4;

/// Iterator over every grid cell touched by a polygon.
///
/// Rows are scanned as strips `[y, y + 1)` and each strip is filled between
/// the leftmost and rightmost point of the polygon inside it, so convex
/// polygons are rasterized exactly and concave ones conservatively.
/// Points are expected in world coordinates (meters).
pub struct PolygonIterator {
    points: Vec<Vec2>,
    y: i32,
    y_max: i32,
    x_end: i32,
    has_span: bool,
    grid_size: IVec2,
    cell: IVec2,
}

impl PolygonIterator {
    pub fn new(info: &MapInfo, polygon: &Polygon) -> Option<Self> {
        if polygon.is_empty() {
            return None;
        }
        let map_points = polygon
            .points()
            .iter()
            .map(|p| info.world_to_map(*p))
            .collect();
        Some(Self::new_map(map_points, info.width, info.height))
    }

    fn new_map(points: Vec<Vec2>, width: u32, height: u32) -> Self {
        let (min_y, max_y) = points
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(min_y, max_y), p| {
                (min_y.min(p.y), max_y.max(p.y))
            });
        let y_min = ((min_y + EDGE_EPS).floor() as i32).max(0);
        let y_max = ((max_y - EDGE_EPS).floor() as i32).min(height as i32 - 1);

        Self {
            points,
            y: y_min - 1,
            y_max,
            x_end: -1,
            has_span: false,
            grid_size: IVec2::new(width as i32, height as i32),
            cell: IVec2::ZERO,
        }
    }

    /// Horizontal extent of the polygon inside the strip of row `y`.
    fn row_span(&self, y: i32) -> Option<(f32, f32)> {
        let lo = y as f32 + EDGE_EPS;
        let hi = (y + 1) as f32 - EDGE_EPS;
        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;

        let n = self.points.len();
        for i in 0..n {
            let p0 = self.points[i];
            let p1 = self.points[(i + 1) % n];
            let (a, b) = if p0.y <= p1.y { (p0, p1) } else { (p1, p0) };
            if b.y < lo || a.y > hi {
                continue;
            }
            let x_at = |y_clip: f32| a.x + (y_clip - a.y) / (b.y - a.y) * (b.x - a.x);
            let xa = if a.y < lo { x_at(lo) } else { a.x };
            let xb = if b.y > hi { x_at(hi) } else { b.x };
            min_x = min_x.min(xa.min(xb));
            max_x = max_x.max(xa.max(xb));
        }

        (min_x <= max_x).then_some((min_x, max_x))
    }

    fn advance_row(&mut self) -> bool {
        while self.y <= self.y_max {
            if let Some((min_x, max_x)) = self.row_span(self.y) {
                let x_start = ((min_x + EDGE_EPS).floor() as i32).max(0);
                let x_end = ((max_x - EDGE_EPS).floor() as i32).min(self.grid_size.x - 1);

                if x_start <= x_end && self.y >= 0 && self.y < self.grid_size.y {
                    self.cell = IVec2::new(x_start, self.y);
                    self.x_end = x_end;
                    self.has_span = true;
                    return true;
                }
            }

            self.y += 1;
        }

        false
    }
}

impl Iterator for PolygonIterator {
    type Item = UVec2;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.has_span && self.cell.x <= self.x_end {
                let cell = self.cell.as_uvec2();
                self.cell.x += 1;
                return Some(cell);
            }

            self.has_span = false;
            self.y += 1;
            if !self.advance_row() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells_of(polygon: &Polygon) -> Vec<UVec2> {
        PolygonIterator::new(&MapInfo::square(8, 1.0), polygon)
            .unwrap()
            .collect()
    }

    #[test]
    fn polygon_iter_fills_aligned_rectangle_exactly() {
        let rect = Polygon::rectangle(Vec2::new(2.5, 2.0), 3.0, 2.0);
        let cells = cells_of(&rect);
        assert_eq!(cells.len(), 6);
        assert!(cells.contains(&UVec2::new(1, 1)));
        assert!(cells.contains(&UVec2::new(3, 2)));
        assert!(!cells.contains(&UVec2::new(4, 2)));
    }

    #[test]
    fn polygon_iter_includes_partially_covered_cells() {
        let rect = Polygon::rectangle(Vec2::new(2.0, 2.0), 1.0, 1.0);
        let cells = cells_of(&rect);
        assert_eq!(cells.len(), 4);
        assert!(cells.contains(&UVec2::new(1, 1)));
        assert!(cells.contains(&UVec2::new(2, 2)));
    }

    #[test]
    fn polygon_iter_handles_tiny_polygon() {
        let tiny = Polygon::rectangle(Vec2::new(5.5, 5.5), 0.1, 0.1);
        assert_eq!(cells_of(&tiny), vec![UVec2::new(5, 5)]);
    }

    #[test]
    fn polygon_iter_clips_to_grid() {
        let rect = Polygon::rectangle(Vec2::new(0.0, 0.0), 3.0, 3.0);
        let cells = cells_of(&rect);
        assert_eq!(cells.len(), 4);
        assert!(cells.iter().all(|c| c.x < 2 && c.y < 2));
    }

    #[test]
    fn polygon_iter_rotated_square() {
        let diamond = Polygon::new(vec![
            Vec2::new(4.0, 2.5),
            Vec2::new(5.5, 4.0),
            Vec2::new(4.0, 5.5),
            Vec2::new(2.5, 4.0),
        ]);
        let cells = cells_of(&diamond);
        assert!(cells.contains(&UVec2::new(3, 3)));
        assert!(cells.contains(&UVec2::new(4, 2)));
        assert!(!cells.contains(&UVec2::new(2, 2)));
    }
}
