//! Entities and the world they live in.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::collision::CollisionScene;
use crate::geometry::Polygon;
use crate::types::{MapInfo, NO_UID, NamoError, Pose2, Uid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Robot,
    /// Can be grabbed and moved by a robot.
    Movable,
    /// Never moves.
    Static,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub uid: Uid,
    pub name: String,
    pub kind: EntityKind,
    pub pose: Pose2,
    pub polygon: Polygon,
}

impl Entity {
    pub fn new(
        uid: Uid,
        name: impl Into<String>,
        kind: EntityKind,
        pose: Pose2,
        polygon: Polygon,
    ) -> Self {
        Self {
            uid,
            name: name.into(),
            kind,
            pose,
            polygon,
        }
    }

    /// Copy of the entity moved rigidly to `pose`.
    pub fn with_pose(&self, pose: Pose2) -> Entity {
        Entity {
            polygon: self.polygon.set_pose(&self.pose, &pose),
            pose,
            ..self.clone()
        }
    }

    pub fn is_movable(&self) -> bool {
        self.kind == EntityKind::Movable
    }
}

/// Map metadata plus every entity, keyed by uid.
///
/// Entities live in a shared base map; moving an entity writes a copy into a
/// private overlay, so [`World::simulate`] copies are cheap and leave the
/// original untouched.
#[derive(Debug, Clone)]
pub struct World {
    info: MapInfo,
    base: Arc<BTreeMap<Uid, Entity>>,
    overlay: BTreeMap<Uid, Entity>,
}

impl World {
    pub fn new(info: MapInfo) -> Self {
        Self {
            info,
            base: Arc::new(BTreeMap::new()),
            overlay: BTreeMap::new(),
        }
    }

    pub fn info(&self) -> &MapInfo {
        &self.info
    }

    pub fn resolution(&self) -> f32 {
        self.info.resolution
    }

    /// Smallest unused uid.
    pub fn next_uid(&self) -> Uid {
        self.base.keys().next_back().map_or(NO_UID + 1, |uid| uid + 1)
    }

    pub fn add_entity(&mut self, entity: Entity) -> Result<(), NamoError> {
        if entity.uid == NO_UID {
            return Err(NamoError::InvalidMetadata(format!(
                "entity '{}' uses the reserved uid {NO_UID}",
                entity.name
            )));
        }
        if self.base.contains_key(&entity.uid) {
            return Err(NamoError::InvalidMetadata(format!(
                "duplicate entity uid {}",
                entity.uid
            )));
        }
        self.overlay.remove(&entity.uid);
        Arc::make_mut(&mut self.base).insert(entity.uid, entity);
        Ok(())
    }

    pub fn entity(&self, uid: Uid) -> Option<&Entity> {
        self.overlay.get(&uid).or_else(|| self.base.get(&uid))
    }

    pub fn try_entity(&self, uid: Uid) -> Result<&Entity, NamoError> {
        self.entity(uid).ok_or(NamoError::UnknownEntity(uid))
    }

    /// Every entity in uid order, with overlay changes applied.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.base
            .values()
            .map(move |entity| self.overlay.get(&entity.uid).unwrap_or(entity))
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Move an entity rigidly to `pose`.
    pub fn set_pose(&mut self, uid: Uid, pose: Pose2) -> Result<(), NamoError> {
        let moved = self.try_entity(uid)?.with_pose(pose);
        self.overlay.insert(uid, moved);
        Ok(())
    }

    /// Cheap copy for hypothetical planning.
    pub fn simulate(&self) -> World {
        self.clone()
    }

    /// Number of entities changed since this world's base was shared.
    pub fn changed_len(&self) -> usize {
        self.overlay.len()
    }

    pub fn polygons_excluding(&self, excluded: &[Uid]) -> BTreeMap<Uid, Polygon> {
        self.entities()
            .filter(|e| !excluded.contains(&e.uid))
            .map(|e| (e.uid, e.polygon.clone()))
            .collect()
    }

    /// Polygons of the entities `robot_uid` cannot move: static ones and other robots.
    pub fn unmovable_polygons(&self, robot_uid: Uid) -> BTreeMap<Uid, Polygon> {
        self.entities()
            .filter(|e| e.uid != robot_uid && !e.is_movable())
            .map(|e| (e.uid, e.polygon.clone()))
            .collect()
    }

    pub fn scene_excluding(&self, excluded: &[Uid]) -> CollisionScene {
        CollisionScene::new(self.polygons_excluding(excluded))
    }
}
