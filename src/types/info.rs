//! Map metadata.

use glam::{IVec2, UVec2, Vec2};
use serde::Deserialize;

use super::{Bounds, DiscretePose, Pose2};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapInfo {
    pub width: u32,
    pub height: u32,
    pub resolution: f32,
    /// Origin of cell (0, 0) in world coordinates (meters).
    #[serde(default)]
    pub origin: Vec2,
}

impl Default for MapInfo {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            resolution: 0.05,
            origin: Vec2::ZERO,
        }
    }
}

impl MapInfo {
    pub fn square(width: u32, resolution: f32) -> Self {
        Self {
            width,
            height: width,
            resolution,
            ..Default::default()
        }
    }

    /// Width of the map in world units (meters).
    #[inline]
    pub fn world_width(&self) -> f32 {
        self.width as f32 * self.resolution
    }

    /// Height of the map in world units (meters).
    #[inline]
    pub fn world_height(&self) -> f32 {
        self.height as f32 * self.resolution
    }

    /// Center of the map in 2D world coordinates.
    #[inline]
    pub fn world_center(&self) -> Vec2 {
        self.origin + Vec2::new(0.5 * self.world_width(), 0.5 * self.world_height())
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// World-space rectangle covered by the map.
    pub fn bounds(&self) -> Bounds {
        Bounds::new(
            self.origin,
            self.origin + Vec2::new(self.world_width(), self.world_height()),
        )
    }

    /// Continuous map coordinates (in cells) of a world point.
    #[inline]
    pub fn world_to_map(&self, p: Vec2) -> Vec2 {
        (p - self.origin) / self.resolution
    }

    /// Cell containing a world point, even if it lies outside the map.
    pub fn world_to_cell_unchecked(&self, p: Vec2) -> IVec2 {
        self.world_to_map(p).floor().as_ivec2()
    }

    /// Cell containing a world point, or `None` outside the map.
    pub fn world_to_cell(&self, p: Vec2) -> Option<UVec2> {
        let cell = self.world_to_cell_unchecked(p);
        self.contains_cell(cell).then(|| cell.as_uvec2())
    }

    pub fn contains_cell(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && (cell.x as u32) < self.width && (cell.y as u32) < self.height
    }

    /// World coordinates of the center of a cell.
    pub fn cell_center(&self, cell: UVec2) -> Vec2 {
        self.origin + (cell.as_vec2() + Vec2::splat(0.5)) * self.resolution
    }

    /// Discretize a pose into cell indices and a rotation step of `rotation_unit_angle` degrees.
    pub fn discretize(&self, pose: &Pose2, rotation_unit_angle: f32) -> DiscretePose {
        let cell = self.world_to_cell_unchecked(pose.position);
        let theta = if rotation_unit_angle > 0.0 {
            let steps = (360.0 / rotation_unit_angle).round().max(1.0) as i32;
            ((pose.theta / rotation_unit_angle).round() as i32).rem_euclid(steps)
        } else {
            pose.theta.round() as i32
        };
        DiscretePose {
            x: cell.x,
            y: cell.y,
            theta,
        }
    }
}
