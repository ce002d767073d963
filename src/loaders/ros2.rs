//! ROS map_server maps (`.yaml` metadata plus an image) as static walls.

use std::path::{Path, PathBuf};

use glam::{UVec2, Vec2};
use image::GenericImageView;
use serde::Deserialize;

use crate::geometry::Polygon;
use crate::grid::Grid2d;
use crate::types::{DEFAULT_FREE_THRESH, DEFAULT_OCCUPIED_THRESH, MapInfo, NamoError};

#[derive(Debug, Deserialize)]
struct RosMapMetadata {
    image: String,
    resolution: f32,
    origin: [f32; 3],
    #[serde(
        default = "default_occupied_thresh",
        deserialize_with = "deserialize_threshold"
    )]
    occupied_thresh: f32,
    #[serde(
        default = "default_free_thresh",
        deserialize_with = "deserialize_threshold"
    )]
    free_thresh: f32,
    #[serde(default = "default_negate")]
    negate: Negate,
    #[serde(default = "default_map_mode")]
    mode: MapMode,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Negate {
    Bool(bool),
    Int(i32),
}

impl Negate {
    fn is_negated(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Int(value) => *value != 0,
        }
    }
}

fn default_negate() -> Negate {
    Negate::Bool(false)
}

#[derive(Debug, Copy, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
enum MapMode {
    Trinary,
    Scale,
    Raw,
}

fn default_map_mode() -> MapMode {
    MapMode::Trinary
}

fn default_occupied_thresh() -> f32 {
    DEFAULT_OCCUPIED_THRESH
}

fn default_free_thresh() -> f32 {
    DEFAULT_FREE_THRESH
}

fn deserialize_threshold<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = f32::deserialize(deserializer)?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(serde::de::Error::custom(
            "thresholds must be in the range [0.0, 1.0]",
        ))
    }
}

/// Map geometry and the cells that must be treated as walls.
///
/// Unknown cells count as walls: the planner never moves through space it
/// has not seen.
#[derive(Debug, Clone)]
pub struct RosMap {
    pub info: MapInfo,
    pub blocked: Grid2d<bool>,
}

impl RosMap {
    /// One rectangle per horizontal run of blocked cells.
    pub fn wall_polygons(&self) -> Vec<Polygon> {
        let resolution = self.info.resolution;
        let mut polygons = Vec::new();
        for y in 0..self.info.height {
            let mut run_start = None;
            for x in 0..=self.info.width {
                let blocked = x < self.info.width
                    && self.blocked.get(UVec2::new(x, y)).copied().unwrap_or(false);
                match (blocked, run_start) {
                    (true, None) => run_start = Some(x),
                    (false, Some(start)) => {
                        let min = self.info.origin
                            + Vec2::new(start as f32, y as f32) * resolution;
                        let size = Vec2::new((x - start) as f32, 1.0) * resolution;
                        polygons.push(Polygon::rectangle(min + size * 0.5, size.x, size.y));
                        run_start = None;
                    }
                    _ => {}
                }
            }
        }
        polygons
    }
}

pub fn load_ros_map(yaml_path: impl AsRef<Path>) -> Result<RosMap, NamoError> {
    let yaml_path = yaml_path.as_ref();
    let yaml_str = std::fs::read_to_string(yaml_path)?;
    let metadata: RosMapMetadata = serde_yaml::from_str(&yaml_str)?;

    if matches!(metadata.mode, MapMode::Trinary | MapMode::Scale)
        && metadata.occupied_thresh <= metadata.free_thresh
    {
        return Err(NamoError::InvalidMetadata(
            "occupied_thresh must be greater than free_thresh".to_string(),
        ));
    }
    if metadata.resolution <= 0.0 {
        return Err(NamoError::InvalidMetadata(
            "resolution must be positive".to_string(),
        ));
    }

    let negate = metadata.negate.is_negated();
    let image_path = resolve_image_path(yaml_path, &metadata.image);
    let image = image::open(&image_path)?;
    let (width, height) = image.dimensions();
    let rgba = image.to_rgba8();

    let info = MapInfo {
        width,
        height,
        resolution: metadata.resolution,
        origin: Vec2::new(metadata.origin[0], metadata.origin[1]),
    };
    let mut blocked = Grid2d::filled(info.clone(), false);

    for y in 0..height {
        for x in 0..width {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            // Dark pixels are occupied unless the map is negated.
            let mut occupancy = 1.0 - (r as f32 + g as f32 + b as f32) / (3.0 * 255.0);
            if negate {
                occupancy = 1.0 - occupancy;
            }
            let alpha = a as f32 / 255.0;

            let is_free = match metadata.mode {
                MapMode::Trinary => occupancy <= metadata.free_thresh,
                MapMode::Scale => alpha >= 1.0 && occupancy <= metadata.free_thresh,
                MapMode::Raw => occupancy <= 0.0,
            };

            // Image rows go top to bottom.
            blocked.set(UVec2::new(x, height - y - 1), !is_free)?;
        }
    }

    Ok(RosMap { info, blocked })
}

pub(crate) fn resolve_image_path(yaml_path: &Path, image_ref: &str) -> PathBuf {
    let image_path = PathBuf::from(image_ref);
    if image_path.is_absolute() {
        return image_path;
    }

    match yaml_path.parent() {
        Some(parent) => parent.join(image_path),
        None => image_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(rows: &[&[bool]]) -> RosMap {
        let info = MapInfo {
            width: rows[0].len() as u32,
            height: rows.len() as u32,
            resolution: 0.5,
            origin: Vec2::new(-1.0, 0.0),
        };
        let mut blocked = Grid2d::filled(info.clone(), false);
        for (y, row) in rows.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                blocked.set(UVec2::new(x as u32, y as u32), *cell).unwrap();
            }
        }
        RosMap { info, blocked }
    }

    #[test]
    fn test_runs_merge_into_rectangles() {
        let map = map(&[&[true, true, false, true], &[false, false, false, false]]);
        let walls = map.wall_polygons();
        assert_eq!(walls.len(), 2);
        let first = walls[0].aabb();
        assert_eq!(first.min, Vec2::new(-1.0, 0.0));
        assert_eq!(first.max, Vec2::new(0.0, 0.5));
        let second = walls[1].aabb();
        assert_eq!(second.min, Vec2::new(0.5, 0.0));
    }

    #[test]
    fn test_resolves_relative_image() {
        let path = resolve_image_path(Path::new("/maps/office.yaml"), "office.png");
        assert_eq!(path, PathBuf::from("/maps/office.png"));
        let absolute = resolve_image_path(Path::new("/maps/office.yaml"), "/data/office.png");
        assert_eq!(absolute, PathBuf::from("/data/office.png"));
    }
}
