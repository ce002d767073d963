//! YAML scenario files: a map, its entities, the robot's goals and
//! optionally the planner settings.
//!
//! ```yaml
//! map: { width: 30, height: 20, resolution: 0.2, origin: [0.0, 0.0] }
//! map_image: office.yaml   # optional map_server map, its walls become static entities
//! entities:
//!   - { name: robot, kind: robot, polygon: [[1.0, 1.0], [1.4, 1.0], [1.4, 1.4], [1.0, 1.4]] }
//!   - { name: box, kind: movable, polygon: [[3.0, 1.0], [3.4, 1.0], [3.4, 2.0], [3.0, 2.0]], pose: [3.2, 1.5, 90.0] }
//! goals:
//!   - [5.0, 1.2, 0.0]
//! planner:
//!   forbid_rotations: true
//! ```

use std::path::Path;

use glam::Vec2;
use log::debug;
use serde::Deserialize;

use super::ros2::{load_ros_map, resolve_image_path};
use crate::behavior::PlannerConfig;
use crate::geometry::Polygon;
use crate::types::{MapInfo, NamoError, Pose2, Uid};
use crate::world::{Entity, EntityKind, World};

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    map: Option<MapInfo>,
    map_image: Option<String>,
    #[serde(default)]
    entities: Vec<EntityFile>,
    #[serde(default)]
    goals: Vec<[f32; 3]>,
    #[serde(default)]
    planner: PlannerConfig,
}

#[derive(Debug, Deserialize)]
struct EntityFile {
    name: String,
    kind: EntityKind,
    polygon: Vec<Vec2>,
    /// Defaults to the polygon centroid with a zero yaw.
    pose: Option<[f32; 3]>,
}

/// Everything needed to run one robot in a world.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub world: World,
    pub robot_uid: Uid,
    pub goals: Vec<Pose2>,
    pub config: PlannerConfig,
}

impl Scenario {
    /// Parse a scenario; `map_image` paths are resolved against `yaml_path`.
    pub fn from_yaml_str(yaml: &str, yaml_path: &Path) -> Result<Self, NamoError> {
        let file: ScenarioFile = serde_yaml::from_str(yaml)?;
        file.planner.validate()?;

        let ros_map = file
            .map_image
            .as_deref()
            .map(|image| load_ros_map(resolve_image_path(yaml_path, image)))
            .transpose()?;
        let info = match (&ros_map, file.map) {
            (Some(ros_map), _) => ros_map.info.clone(),
            (None, Some(info)) => info,
            (None, None) => {
                return Err(NamoError::InvalidMetadata(
                    "scenario needs a map or a map_image".to_string(),
                ));
            }
        };
        if info.width == 0 || info.height == 0 || info.resolution <= 0.0 {
            return Err(NamoError::InvalidMetadata(format!(
                "degenerate map {}x{} at resolution {}",
                info.width, info.height, info.resolution
            )));
        }

        let mut world = World::new(info);
        let mut robot_uid = None;
        for entity in file.entities {
            if entity.polygon.len() < 3 {
                return Err(NamoError::InvalidMetadata(format!(
                    "entity '{}' needs at least three points",
                    entity.name
                )));
            }
            let polygon = Polygon::new(entity.polygon);
            let pose = entity.pose.map_or_else(
                || Pose2::from_position(polygon.centroid(), 0.0),
                |[x, y, theta]| Pose2::new(x, y, theta),
            );
            let uid = world.next_uid();
            if entity.kind == EntityKind::Robot {
                if robot_uid.is_some() {
                    return Err(NamoError::InvalidMetadata(format!(
                        "second robot '{}', only one is supported",
                        entity.name
                    )));
                }
                robot_uid = Some(uid);
            }
            world.add_entity(Entity::new(uid, entity.name, entity.kind, pose, polygon))?;
        }
        let robot_uid = robot_uid
            .ok_or_else(|| NamoError::InvalidMetadata("scenario has no robot".to_string()))?;

        if let Some(ros_map) = ros_map {
            let walls = ros_map.wall_polygons();
            debug!("[Scenario] {} walls from the map image", walls.len());
            for (i, polygon) in walls.into_iter().enumerate() {
                let uid = world.next_uid();
                let pose = Pose2::from_position(polygon.centroid(), 0.0);
                world.add_entity(Entity::new(
                    uid,
                    format!("wall_{i}"),
                    EntityKind::Static,
                    pose,
                    polygon,
                ))?;
            }
        }

        Ok(Self {
            world,
            robot_uid,
            goals: file
                .goals
                .into_iter()
                .map(|[x, y, theta]| Pose2::new(x, y, theta))
                .collect(),
            config: file.planner,
        })
    }
}

pub fn load_scenario(yaml_path: impl AsRef<Path>) -> Result<Scenario, NamoError> {
    let yaml_path = yaml_path.as_ref();
    let yaml = std::fs::read_to_string(yaml_path)?;
    Scenario::from_yaml_str(&yaml, yaml_path)
}
