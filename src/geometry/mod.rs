//! Polygon geometry: footprints, hulls and contact sampling.

pub mod hull;
pub mod polygon;
pub mod sampling;

pub use hull::convex_hull;
pub use polygon::{Polygon, segment_point_distance, segments_intersect};
pub use sampling::sample_poses_at_middle_of_inflated_sides;
