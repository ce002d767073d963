use super::Path;
use crate::action::Action;
use crate::collision::CollisionScene;
use crate::geometry::Polygon;
use crate::types::Pose2;

/// The robot moving alone, one `GoToPose` per step.
#[derive(Debug, Clone)]
pub struct TransitPath {
    path: Path,
    radius: f32,
    phys_cost: f32,
    social_cost: f32,
}

impl TransitPath {
    /// Build a path through `poses` for a robot whose footprint is
    /// `robot_polygon` when standing at `robot_pose`.
    pub fn from_poses(
        poses: Vec<Pose2>,
        robot_polygon: &Polygon,
        robot_pose: &Pose2,
        phys_cost: f32,
    ) -> Self {
        let polygons = poses
            .iter()
            .map(|pose| robot_polygon.set_pose(robot_pose, pose))
            .collect();
        let actions = poses.iter().skip(1).map(|pose| Action::GoToPose(*pose)).collect();
        Self {
            path: Path::new(poses, polygons, actions),
            radius: robot_polygon.circumscribed_radius(),
            phys_cost,
            social_cost: 0.0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn poses(&self) -> &[Pose2] {
        self.path.poses()
    }

    pub fn start_pose(&self) -> Option<&Pose2> {
        self.path.start_pose()
    }

    pub fn end_pose(&self) -> Option<&Pose2> {
        self.path.end_pose()
    }

    pub fn phys_cost(&self) -> f32 {
        self.phys_cost
    }

    pub fn social_cost(&self) -> f32 {
        self.social_cost
    }

    pub fn total_cost(&self) -> f32 {
        self.phys_cost + self.social_cost
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn pop_next_step(&mut self) -> Option<Action> {
        self.path.pop_next_step()
    }

    /// True when the robot disc swept along the next `horizon` segments
    /// touches nothing in `scene`.
    pub fn is_valid(&self, scene: &CollisionScene, horizon: Option<usize>) -> bool {
        let Some(states) = self.path.horizon_states(horizon) else {
            return true;
        };
        let poses = &self.path.poses()[states];
        if let [single] = poses {
            return scene
                .segment_collision(single.position, single.position, self.radius)
                .is_none();
        }
        poses.windows(2).all(|pair| {
            scene
                .segment_collision(pair[0].position, pair[1].position, self.radius)
                .is_none()
        })
    }
}
