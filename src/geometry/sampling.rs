use glam::Vec2;

use super::Polygon;
use crate::types::Pose2;

/// Poses facing the middle of every polygon side, `distance` meters away from it.
///
/// Each pose sits on the side's outward normal and looks at the side midpoint.
/// Degenerate (zero-length) sides are skipped.
pub fn sample_poses_at_middle_of_inflated_sides(polygon: &Polygon, distance: f32) -> Vec<Pose2> {
    let center = polygon.centroid();
    polygon
        .edges()
        .filter_map(|(a, b)| {
            let dir = (b - a).try_normalize()?;
            let middle = (a + b) * 0.5;
            let normal = Vec2::new(-dir.y, dir.x);
            let plus = middle + normal * distance;
            let minus = middle - normal * distance;
            let position = if plus.distance_squared(center) >= minus.distance_squared(center) {
                plus
            } else {
                minus
            };
            let facing = middle - position;
            Some(Pose2::from_position(
                position,
                facing.y.atan2(facing.x).to_degrees(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_samples_face_each_side() {
        let square = Polygon::rectangle(Vec2::ZERO, 2.0, 2.0);
        let poses = sample_poses_at_middle_of_inflated_sides(&square, 0.5);
        assert_eq!(poses.len(), 4);

        // Bottom side first: the pose sits below it, looking up.
        assert_relative_eq!(poses[0].x(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(poses[0].y(), -1.5, epsilon = 1e-6);
        assert_relative_eq!(poses[0].theta, 90.0, epsilon = 1e-4);

        for pose in &poses {
            assert_relative_eq!(square.distance_to_point(pose.position), 0.5, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_degenerate_sides_are_skipped() {
        let polygon = Polygon::new(vec![Vec2::ZERO, Vec2::ZERO, Vec2::X, Vec2::Y]);
        assert_eq!(sample_poses_at_middle_of_inflated_sides(&polygon, 0.1).len(), 3);
    }
}
