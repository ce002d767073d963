//! Simple 2D polygons in world coordinates.

use glam::Vec2;

use crate::types::{Bounds, Pose2, rotate_point};

/// Closed polygon, vertices in world coordinates (meters).
///
/// Vertices are stored without repeating the first point. Most operations
/// assume a simple (non self-intersecting) polygon; robot and obstacle
/// footprints are usually convex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    points: Vec<Vec2>,
}

impl Polygon {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle centered on `center`.
    pub fn rectangle(center: Vec2, width: f32, height: f32) -> Self {
        let half = Vec2::new(width, height) * 0.5;
        Self::new(vec![
            center - half,
            center + Vec2::new(half.x, -half.y),
            center + half,
            center + Vec2::new(-half.x, half.y),
        ])
    }

    pub fn from_bounds(bounds: &Bounds) -> Self {
        Self::rectangle(bounds.center(), bounds.max.x - bounds.min.x, bounds.max.y - bounds.min.y)
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Edges as `(start, end)` pairs, closing back to the first vertex.
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Shoelace area, positive for counter-clockwise winding.
    pub fn signed_area(&self) -> f32 {
        0.5 * self.edges().map(|(a, b)| a.perp_dot(b)).sum::<f32>()
    }

    pub fn area(&self) -> f32 {
        self.signed_area().abs()
    }

    /// Area centroid; falls back to the vertex mean for degenerate polygons.
    pub fn centroid(&self) -> Vec2 {
        if self.points.is_empty() {
            return Vec2::ZERO;
        }
        let area = self.signed_area();
        if area.abs() < 1e-9 {
            return self.points.iter().copied().sum::<Vec2>() / self.points.len() as f32;
        }
        let weighted: Vec2 = self.edges().map(|(a, b)| (a + b) * a.perp_dot(b)).sum();
        weighted / (6.0 * area)
    }

    pub fn aabb(&self) -> Bounds {
        Bounds::from_points(&self.points)
    }

    pub fn translated(&self, offset: Vec2) -> Polygon {
        Polygon::new(self.points.iter().map(|p| *p + offset).collect())
    }

    /// Rotate by `degrees` counter-clockwise around `center`.
    pub fn rotated(&self, degrees: f32, center: Vec2) -> Polygon {
        Polygon::new(
            self.points
                .iter()
                .map(|p| rotate_point(*p, center, degrees))
                .collect(),
        )
    }

    /// Move a polygon rigidly attached to `from` so that it follows `to`.
    pub fn set_pose(&self, from: &Pose2, to: &Pose2) -> Polygon {
        self.rotated(to.theta - from.theta, from.position)
            .translated(to.position - from.position)
    }

    /// Largest distance from the centroid to a vertex.
    pub fn circumscribed_radius(&self) -> f32 {
        let c = self.centroid();
        self.points
            .iter()
            .map(|p| p.distance(c))
            .fold(0.0, f32::max)
    }

    /// Smallest distance from the centroid to an edge.
    pub fn inscribed_radius(&self) -> f32 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let c = self.centroid();
        self.edges()
            .map(|(a, b)| segment_point_distance(c, a, b))
            .fold(f32::INFINITY, f32::min)
    }

    /// Even-odd point in polygon test.
    pub fn contains_point(&self, p: Vec2) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Distance from a point to the polygon area, zero inside.
    pub fn distance_to_point(&self, p: Vec2) -> f32 {
        if self.points.len() >= 3 && self.contains_point(p) {
            return 0.0;
        }
        match self.points.len() {
            0 => f32::INFINITY,
            1 => self.points[0].distance(p),
            _ => self
                .edges()
                .map(|(a, b)| segment_point_distance(p, a, b))
                .fold(f32::INFINITY, f32::min),
        }
    }

    /// Distance from a segment to the polygon area, zero when they touch.
    pub fn distance_to_segment(&self, a: Vec2, b: Vec2) -> f32 {
        if self.points.is_empty() {
            return f32::INFINITY;
        }
        if self.contains_point(a) || self.contains_point(b) {
            return 0.0;
        }
        let mut best = f32::INFINITY;
        for (p, q) in self.edges() {
            if segments_intersect(a, b, p, q) {
                return 0.0;
            }
            best = best
                .min(segment_point_distance(p, a, b))
                .min(segment_point_distance(a, p, q))
                .min(segment_point_distance(b, p, q));
        }
        best
    }

    /// Distance between the two polygon areas, zero when they touch.
    pub fn distance_to_polygon(&self, other: &Polygon) -> f32 {
        if self.intersects(other) {
            return 0.0;
        }
        other
            .edges()
            .map(|(a, b)| self.distance_to_segment(a, b))
            .fold(f32::INFINITY, f32::min)
    }

    /// Area intersection test; touching boundaries count as intersecting.
    pub fn intersects(&self, other: &Polygon) -> bool {
        if self.points.is_empty() || other.points.is_empty() {
            return false;
        }
        if !self.aabb().intersects(&other.aabb()) {
            return false;
        }
        for (a, b) in self.edges() {
            for (c, d) in other.edges() {
                if segments_intersect(a, b, c, d) {
                    return true;
                }
            }
        }
        self.contains_point(other.points[0]) || other.contains_point(self.points[0])
    }

    /// True when every vertex lies inside the closed rectangle.
    pub fn is_within(&self, bounds: &Bounds) -> bool {
        self.points.iter().all(|p| bounds.contains(*p))
    }
}

/// Distance from `p` to the segment `[a, b]`.
pub fn segment_point_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

fn orientation(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

fn on_segment(p: Vec2, a: Vec2, b: Vec2) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// Closed segment intersection, including collinear overlap and shared endpoints.
pub fn segments_intersect(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    let d1 = orientation(b1, b2, a1);
    let d2 = orientation(b1, b2, a2);
    let d3 = orientation(a1, a2, b1);
    let d4 = orientation(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(a1, b1, b2))
        || (d2 == 0.0 && on_segment(a2, b1, b2))
        || (d3 == 0.0 && on_segment(b1, a1, a2))
        || (d4 == 0.0 && on_segment(b2, a1, a2))
}
