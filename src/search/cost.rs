use crate::types::{Pose2, angle_distance};

/// Physical cost of moving the robot, with or without a carried obstacle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    /// Cost per meter.
    pub translation_factor: f32,
    /// Cost per degree.
    pub rotation_factor: f32,
    /// Multiplier applied while transferring an obstacle.
    pub transfer_coefficient: f32,
}

impl CostModel {
    pub fn new(
        translation_unit_cost: f32,
        translation_unit_length: f32,
        rotation_unit_cost: f32,
        rotation_unit_angle: f32,
        transfer_coefficient: f32,
    ) -> Self {
        Self {
            translation_factor: translation_unit_cost / translation_unit_length,
            rotation_factor: rotation_unit_cost / rotation_unit_angle,
            transfer_coefficient,
        }
    }

    /// Step cost between two poses.
    pub fn g(&self, from: &Pose2, to: &Pose2, is_transfer: bool) -> f32 {
        let translation = from.distance(to) * self.translation_factor;
        let rotation = angle_distance(from.theta, to.theta) * self.rotation_factor;
        let cost = translation + rotation;
        if is_transfer {
            cost * self.transfer_coefficient
        } else {
            cost
        }
    }

    /// Cost of going straight to `to`, without the transfer penalty.
    pub fn h(&self, from: &Pose2, to: &Pose2) -> f32 {
        from.distance(to) * self.translation_factor
            + angle_distance(from.theta, to.theta) * self.rotation_factor
    }

    /// Sum of step costs along a pose sequence.
    pub fn path_cost(&self, poses: &[Pose2], is_transfer: bool) -> f32 {
        poses
            .windows(2)
            .map(|pair| self.g(&pair[0], &pair[1], is_transfer))
            .sum()
    }
}
