//! Geometric and spatial types shared by the planners.

use glam::Vec2;

use super::{POSE_ATOL, POSE_RTOL};

/// Identifier of a world entity. `0` is reserved for "none".
pub type Uid = u32;

/// Wrap an angle in degrees into `[0, 360)`.
pub fn normalize_angle(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Shortest angular distance between two headings in degrees, in `[0, 180]`.
pub fn angle_distance(a: f32, b: f32) -> f32 {
    let d = normalize_angle(a - b);
    d.min(360.0 - d)
}

/// Rotate `point` by `degrees` counter-clockwise around `center`.
pub fn rotate_point(point: Vec2, center: Vec2, degrees: f32) -> Vec2 {
    center + Vec2::from_angle(degrees.to_radians()).rotate(point - center)
}

fn is_close_scalar(a: f32, b: f32) -> bool {
    (a - b).abs() <= POSE_ATOL + POSE_RTOL * b.abs()
}

/// Pose in world coordinates (meters), heading in degrees within `[0, 360)`.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Pose2 {
    pub position: Vec2,
    pub theta: f32,
}

impl Pose2 {
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self::from_position(Vec2::new(x, y), theta)
    }

    pub fn from_position(position: Vec2, theta: f32) -> Self {
        Self {
            position,
            theta: normalize_angle(theta),
        }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.position.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.position.y
    }

    /// Unit vector along the heading.
    pub fn heading(&self) -> Vec2 {
        Vec2::from_angle(self.theta.to_radians())
    }

    /// Express a robot-frame vector in the world frame.
    pub fn to_world_vector(&self, local: Vec2) -> Vec2 {
        self.heading().rotate(local)
    }

    /// Express a world-frame vector in the robot frame.
    pub fn to_local_vector(&self, world: Vec2) -> Vec2 {
        let h = self.heading();
        Vec2::new(h.x, -h.y).rotate(world)
    }

    pub fn distance(&self, other: &Pose2) -> f32 {
        self.position.distance(other.position)
    }

    /// Approximate equality on every component, using [`POSE_RTOL`] and [`POSE_ATOL`].
    pub fn is_close(&self, other: &Pose2) -> bool {
        is_close_scalar(self.position.x, other.position.x)
            && is_close_scalar(self.position.y, other.position.y)
            && angle_distance(self.theta, other.theta) <= POSE_ATOL + POSE_RTOL * other.theta.abs()
    }
}

/// Discretized pose: cell indices plus a rotation step index.
///
/// Cell indices are signed so that poses slightly outside the map still
/// have a well defined key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DiscretePose {
    pub x: i32,
    pub y: i32,
    pub theta: i32,
}

/// World-axis-aligned rectangle in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Bounds that contain nothing. Expand them with [`Bounds::expand_to_include`].
    pub fn empty() -> Self {
        Self {
            min: Vec2::new(f32::INFINITY, f32::INFINITY),
            max: Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec2>) -> Self {
        let mut bounds = Self::empty();
        for p in points {
            bounds.expand_to_include(*p);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn expand_to_include(&mut self, p: Vec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn expand_by(&mut self, margin: f32) {
        self.min -= Vec2::splat(margin);
        self.max += Vec2::splat(margin);
    }

    pub fn expanded(mut self, margin: f32) -> Self {
        self.expand_by(margin);
        self
    }

    /// Closed-interval overlap test; touching rectangles intersect.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn contains_bounds(&self, other: &Bounds) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}
