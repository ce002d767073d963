use std::path::Path;

use glam::UVec2;
use image::{GrayImage, Luma};

use crate::behavior::SocialCostmap;
use crate::grid::{ConnectedComponents, Grid2d, OccupancyGrid};
use crate::types::NamoError;

const FREE_GRAY: u8 = 254;
const BLOCKED_GRAY: u8 = 0;
/// Forbidden cells of a social costmap.
const FORBIDDEN_GRAY: u8 = 205;

/// Render a grid cell by cell, writing row `y = 0` (lowest in map
/// coordinates) at the bottom of the image like map_server images.
fn grid_to_image<T>(grid: &Grid2d<T>, gray: impl Fn(&T) -> u8) -> GrayImage {
    let width = grid.width();
    let height = grid.height();
    let mut img = GrayImage::new(width, height);

    for y_img in 0..height {
        let y_grid = height - 1 - y_img;
        for x in 0..width {
            if let Some(value) = grid.get(UVec2::new(x, y_grid)) {
                img.put_pixel(x, y_img, Luma([gray(value)]));
            }
        }
    }

    img
}

/// Free cells white, cells covered by any obstacle black.
pub fn occupancy_grid_to_image(grid: &OccupancyGrid) -> GrayImage {
    grid_to_image(&grid.blocked_mask(), |blocked| {
        if *blocked { BLOCKED_GRAY } else { FREE_GRAY }
    })
}

/// Blocked cells black; each component gets its own gray level.
pub fn components_to_image(components: &ConnectedComponents) -> GrayImage {
    grid_to_image(components.labels(), |label| component_to_gray(*label))
}

fn component_to_gray(label: u32) -> u8 {
    if label == 0 {
        return BLOCKED_GRAY;
    }
    // Spread consecutive labels over the 64..=254 range.
    let step = (label.wrapping_mul(97) % 191) as u8;
    64 + step
}

/// Cheap cells dark, expensive cells bright, forbidden cells mid-gray.
pub fn social_costmap_to_image(social: &SocialCostmap) -> GrayImage {
    grid_to_image(social.grid(), |cost| {
        if *cost < 0.0 {
            FORBIDDEN_GRAY
        } else {
            (cost.clamp(0.0, 1.0) * 180.0) as u8
        }
    })
}

/// Write the occupancy of `grid` to a PNG file.
pub fn save_occupancy_png(grid: &OccupancyGrid, path: impl AsRef<Path>) -> Result<(), NamoError> {
    occupancy_grid_to_image(grid).save(path)?;
    Ok(())
}
