use std::collections::BTreeMap;

use glam::Vec2;

use super::AabbIndex;
use crate::geometry::Polygon;
use crate::types::{Bounds, Uid};

/// A set of entity polygons to test candidate shapes against.
#[derive(Debug, Clone, Default)]
pub struct CollisionScene {
    polygons: BTreeMap<Uid, Polygon>,
    index: AabbIndex,
}

impl CollisionScene {
    pub fn new(polygons: BTreeMap<Uid, Polygon>) -> Self {
        let mut index = AabbIndex::new();
        for (uid, polygon) in &polygons {
            index.insert(*uid, polygon.aabb());
        }
        Self { polygons, index }
    }

    pub fn insert(&mut self, uid: Uid, polygon: Polygon) {
        self.index.insert(uid, polygon.aabb());
        self.polygons.insert(uid, polygon);
    }

    pub fn remove(&mut self, uid: Uid) -> Option<Polygon> {
        self.index.remove(uid);
        self.polygons.remove(&uid)
    }

    /// Copy of the scene without the given entities.
    pub fn without(&self, excluded: &[Uid]) -> CollisionScene {
        let mut scene = self.clone();
        for uid in excluded {
            scene.remove(*uid);
        }
        scene
    }

    pub fn polygon(&self, uid: Uid) -> Option<&Polygon> {
        self.polygons.get(&uid)
    }

    pub fn polygons(&self) -> &BTreeMap<Uid, Polygon> {
        &self.polygons
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// First entity (lowest uid among AABB hits) intersecting `polygon`.
    pub fn first_collision(&self, polygon: &Polygon) -> Option<Uid> {
        let bounds = polygon.aabb();
        let mut hits: Vec<Uid> = self.index.overlap_values(&bounds).collect();
        hits.sort_unstable();
        hits.into_iter().find(|uid| {
            self.polygons
                .get(uid)
                .is_some_and(|other| other.intersects(polygon))
        })
    }

    pub fn collides(&self, polygon: &Polygon) -> bool {
        self.first_collision(polygon).is_some()
    }

    /// First entity within `radius` of the segment `[a, b]`.
    pub fn segment_collision(&self, a: Vec2, b: Vec2, radius: f32) -> Option<Uid> {
        let bounds = Bounds::from_points(&[a, b]).expanded(radius);
        let mut hits: Vec<Uid> = self.index.overlap_values(&bounds).collect();
        hits.sort_unstable();
        hits.into_iter().find(|uid| {
            self.polygons
                .get(uid)
                .is_some_and(|other| other.distance_to_segment(a, b) <= radius)
        })
    }
}
