//! Swept-volume collision checks for sequences of rigid motions.

use std::collections::HashMap;

use glam::Vec2;

use super::CollisionScene;
use crate::geometry::{Polygon, convex_hull};
use crate::types::{Pose2, Uid, rotate_point};

/// A rigid motion in the world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    Translation(Vec2),
    /// Counter-clockwise rotation in degrees around `center`.
    Rotation { angle: f32, center: Vec2 },
}

impl Motion {
    pub fn apply_point(&self, p: Vec2) -> Vec2 {
        match *self {
            Motion::Translation(v) => p + v,
            Motion::Rotation { angle, center } => rotate_point(p, center, angle),
        }
    }

    pub fn apply_pose(&self, pose: &Pose2) -> Pose2 {
        match *self {
            Motion::Translation(v) => Pose2::from_position(pose.position + v, pose.theta),
            Motion::Rotation { angle, center } => Pose2::from_position(
                rotate_point(pose.position, center, angle),
                pose.theta + angle,
            ),
        }
    }

    pub fn apply(&self, polygon: &Polygon) -> Polygon {
        match *self {
            Motion::Translation(v) => polygon.translated(v),
            Motion::Rotation { angle, center } => polygon.rotated(angle, center),
        }
    }
}

/// Hull swept over a range of motion steps, and the entity it hit, if any.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollisionData {
    pub hull: Polygon,
    pub colliding_uid: Option<Uid>,
}

/// Swept hulls keyed by `(first_state, last_state)` index ranges.
pub type CollisionCache = HashMap<(usize, usize), CollisionData>;

/// Points bounding the arc travelled by `p` when rotated around `center`.
fn push_arc_bound(out: &mut Vec<Vec2>, p: Vec2, center: Vec2, angle: f32) {
    let radius = p.distance(center);
    if radius < 1e-6 || angle.abs() < 1e-6 {
        return;
    }
    if angle.abs() >= 180.0 {
        out.extend([
            center + Vec2::new(radius, radius),
            center + Vec2::new(-radius, radius),
            center + Vec2::new(-radius, -radius),
            center + Vec2::new(radius, -radius),
        ]);
        return;
    }
    if angle.abs() > 90.0 {
        let half = angle * 0.5;
        let mid = rotate_point(p, center, half);
        out.push(mid);
        push_arc_bound(out, p, center, half);
        push_arc_bound(out, mid, center, half);
        return;
    }
    // Intersection of the tangents at both arc ends.
    let half = angle * 0.5;
    let direction = rotate_point(p, center, half) - center;
    out.push(center + direction / half.to_radians().cos());
}

/// Convex hull covering `polygons[0]` moved through every motion in turn.
///
/// `polygons` holds one more state than `motions`: `polygons[i + 1]` is
/// `polygons[i]` after `motions[i]`.
pub fn swept_hull(polygons: &[Polygon], motions: &[Motion]) -> Polygon {
    let mut points: Vec<Vec2> = polygons
        .iter()
        .flat_map(|polygon| polygon.points().iter().copied())
        .collect();
    for (polygon, motion) in polygons.iter().zip(motions) {
        if let Motion::Rotation { angle, center } = *motion {
            for p in polygon.points() {
                push_arc_bound(&mut points, *p, center, angle);
            }
        }
    }
    convex_hull(&points)
}

/// Find the first collision over the states `range.0..=range.1`.
///
/// The whole range is tested with one hull first and split in halves while
/// the hull collides, down to single steps. Every tested hull is stored in
/// `cache`; cached hulls are reused but always re-tested against `scene`.
pub fn check_swept_collisions(
    scene: &CollisionScene,
    polygons: &[Polygon],
    motions: &[Motion],
    range: (usize, usize),
    cache: &mut CollisionCache,
) -> Option<Uid> {
    let (first, last) = range;
    if last <= first || last >= polygons.len() || last > motions.len() {
        return None;
    }

    let data = cache.entry(range).or_insert_with(|| CollisionData {
        hull: swept_hull(&polygons[first..=last], &motions[first..last]),
        colliding_uid: None,
    });
    let hit = scene.first_collision(&data.hull);
    data.colliding_uid = hit;

    match hit {
        None => None,
        Some(uid) if last - first == 1 => Some(uid),
        Some(_) => {
            let middle = (first + last) / 2;
            check_swept_collisions(scene, polygons, motions, (first, middle), cache)
                .or_else(|| check_swept_collisions(scene, polygons, motions, (middle, last), cache))
        }
    }
}

/// Single-step swept check: `before` moved by `motion` into `after`.
pub fn swept_step_collision(
    scene: &CollisionScene,
    before: &Polygon,
    after: &Polygon,
    motion: Motion,
) -> CollisionData {
    let hull = swept_hull(&[before.clone(), after.clone()], &[motion]);
    let colliding_uid = scene.first_collision(&hull);
    CollisionData {
        hull,
        colliding_uid,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use approx::assert_relative_eq;

    use super::*;

    fn square() -> Polygon {
        Polygon::rectangle(Vec2::ZERO, 1.0, 1.0)
    }

    #[test]
    fn test_translation_hull_covers_the_gap() {
        let motion = Motion::Translation(Vec2::new(3.0, 0.0));
        let after = motion.apply(&square());
        let hull = swept_hull(&[square(), after], &[motion]);
        assert_relative_eq!(hull.area(), 4.0, epsilon = 1e-5);
        assert!(hull.contains_point(Vec2::new(1.5, 0.0)));
    }

    #[test]
    fn test_rotation_hull_contains_arc() {
        let center = Vec2::new(-2.0, 0.0);
        let motion = Motion::Rotation {
            angle: 90.0,
            center,
        };
        let after = motion.apply(&square());
        let hull = swept_hull(&[square(), after], &[motion]);
        // The middle of the arc followed by the far corner.
        let corner = Vec2::new(0.5, 0.5);
        let middle = rotate_point(corner, center, 45.0);
        assert!(hull.distance_to_point(middle) <= 1e-5);
    }

    #[test]
    fn test_motion_apply_pose() {
        let pose = Pose2::new(1.0, 0.0, 0.0);
        let rotated = Motion::Rotation {
            angle: 90.0,
            center: Vec2::ZERO,
        }
        .apply_pose(&pose);
        assert_relative_eq!(rotated.x(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(rotated.y(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(rotated.theta, 90.0, epsilon = 1e-4);
    }

    #[test]
    fn test_dichotomy_finds_colliding_step() {
        let mut polygons_map = BTreeMap::new();
        polygons_map.insert(9, Polygon::rectangle(Vec2::new(3.5, 0.0), 0.4, 0.4));
        let scene = CollisionScene::new(polygons_map);

        let step = Motion::Translation(Vec2::new(1.0, 0.0));
        let mut polygons = vec![square()];
        for _ in 0..6 {
            let next = step.apply(polygons.last().unwrap());
            polygons.push(next);
        }
        let motions = vec![step; 6];

        let mut cache = CollisionCache::new();
        assert_eq!(
            check_swept_collisions(&scene, &polygons, &motions, (0, 6), &mut cache),
            Some(9)
        );
        assert!(cache.contains_key(&(0, 6)));
        assert_eq!(cache[&(0, 6)].colliding_uid, Some(9));

        assert_eq!(
            check_swept_collisions(&scene, &polygons, &motions, (0, 2), &mut cache),
            None
        );
    }
}
