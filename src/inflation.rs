//! Footprint rasterization with obstacle inflation.
//!
//! A polygon's inflated footprint is the set of cells it touches plus every
//! cell whose center lies within the inflation radius of the polygon. Grids
//! built from these footprints are the coarse collision layer used by the
//! planners; exact checks are done on polygons afterwards.

use glam::{IVec2, UVec2};

use crate::geometry::Polygon;
use crate::iterators::PolygonIterator;
use crate::types::{MapInfo, SQRT_2};

/// Convert an inflation radius in world units (meters) to a cell count.
///
/// Returns `ceil(radius / resolution)`. If resolution is zero or negative, or
/// if the result would be non-positive, returns 0.
#[inline]
pub fn inflation_radius_to_cells(radius_m: f32, resolution: f32) -> u32 {
    if resolution <= 0.0 || radius_m <= 0.0 {
        return 0;
    }
    (radius_m / resolution).ceil() as u32
}

/// Inflation of the grids the robot plans on: its circumscribed radius plus
/// half a cell diagonal, so that a free cell center guarantees a free disc.
pub fn robot_inflation_radius(robot: &Polygon, resolution: f32) -> f32 {
    robot.circumscribed_radius() + resolution * SQRT_2 * 0.5
}

/// Cells covered by `polygon` once inflated by `radius_m`, sorted row-major.
pub fn inflated_footprint(info: &MapInfo, polygon: &Polygon, radius_m: f32) -> Vec<UVec2> {
    let Some(touched) = PolygonIterator::new(info, polygon) else {
        return Vec::new();
    };
    let mut cells: Vec<UVec2> = touched.collect();

    let radius_cells = inflation_radius_to_cells(radius_m, info.resolution) as i32;
    if radius_cells > 0 {
        let bounds = polygon.aabb();
        let min = info.world_to_cell_unchecked(bounds.min) - IVec2::splat(radius_cells);
        let max = info.world_to_cell_unchecked(bounds.max) + IVec2::splat(radius_cells);
        let min = min.max(IVec2::ZERO);
        let max = max.min(IVec2::new(info.width as i32 - 1, info.height as i32 - 1));

        for y in min.y..=max.y {
            for x in min.x..=max.x {
                let cell = UVec2::new(x as u32, y as u32);
                if polygon.distance_to_point(info.cell_center(cell)) <= radius_m {
                    cells.push(cell);
                }
            }
        }
    }

    cells.sort_unstable_by_key(|c| (c.y, c.x));
    cells.dedup();
    cells
}
