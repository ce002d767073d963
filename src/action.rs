//! Robot actions, motion primitives and action outcomes.

use glam::Vec2;

use crate::behavior::PlannerConfig;
use crate::collision::Motion;
use crate::types::{NamoError, Pose2, Uid};

/// What an agent asks the world to do during one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Move along a vector expressed in the robot frame.
    Translation { vector: Vec2 },
    /// Rotate in place by `angle` degrees (counter-clockwise).
    Rotation { angle: f32 },
    /// Translate in the robot frame, then attach `entity`.
    Grab { vector: Vec2, entity: Uid },
    /// Detach `entity`, then translate in the robot frame.
    Release { vector: Vec2, entity: Uid },
    /// Go straight to a pose.
    GoToPose(Pose2),
    Wait,
    GoalSuccess(Pose2),
    GoalFailed(Pose2),
    GoalsFinished,
}

impl Action {
    /// World-frame motion of the robot when executing this action from `robot_pose`.
    pub fn motion(&self, robot_pose: &Pose2) -> Option<Motion> {
        match self {
            Action::Translation { vector }
            | Action::Grab { vector, .. }
            | Action::Release { vector, .. } => {
                Some(Motion::Translation(robot_pose.to_world_vector(*vector)))
            }
            Action::Rotation { angle } => Some(Motion::Rotation {
                angle: *angle,
                center: robot_pose.position,
            }),
            _ => None,
        }
    }

    /// Robot pose after executing this action from `robot_pose`.
    pub fn predict_pose(&self, robot_pose: &Pose2) -> Pose2 {
        match self {
            Action::GoToPose(pose) => *pose,
            _ => self
                .motion(robot_pose)
                .map_or(*robot_pose, |motion| motion.apply_pose(robot_pose)),
        }
    }

    /// Goal bookkeeping actions that do not move anything.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Action::GoalSuccess(_) | Action::GoalFailed(_) | Action::GoalsFinished
        )
    }
}

/// Elementary moves explored by the manipulation search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionPrimitive {
    /// Robot-frame translation along the heading (negative backs up).
    Translate { distance: f32 },
    Rotate { angle: f32 },
}

impl MotionPrimitive {
    pub fn to_action(&self) -> Action {
        match *self {
            MotionPrimitive::Translate { distance } => Action::Translation {
                vector: Vec2::new(distance, 0.0),
            },
            MotionPrimitive::Rotate { angle } => Action::Rotation { angle },
        }
    }

    /// World-frame motion from `robot_pose`; rotations turn around the robot position.
    pub fn motion(&self, robot_pose: &Pose2) -> Motion {
        match *self {
            MotionPrimitive::Translate { distance } => {
                Motion::Translation(robot_pose.to_world_vector(Vec2::new(distance, 0.0)))
            }
            MotionPrimitive::Rotate { angle } => Motion::Rotation {
                angle,
                center: robot_pose.position,
            },
        }
    }

    /// True when this primitive exactly undoes `previous`.
    pub fn undoes(&self, previous: &Action) -> bool {
        match (*self, previous) {
            (MotionPrimitive::Translate { distance }, Action::Translation { vector }) => {
                vector.y == 0.0 && vector.x == -distance
            }
            (MotionPrimitive::Rotate { angle }, Action::Rotation { angle: prev }) => *prev == -angle,
            _ => false,
        }
    }
}

/// The motion primitives available to the manipulation search.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSet {
    primitives: Vec<MotionPrimitive>,
    rotation_unit_angle: f32,
    forbid_rotations: bool,
}

impl ActionSet {
    /// Build a set from explicit primitives.
    ///
    /// Fails with [`NamoError::RotationsForbidden`] if a rotation is requested
    /// while rotations are forbidden.
    pub fn new(
        primitives: Vec<MotionPrimitive>,
        rotation_unit_angle: f32,
        forbid_rotations: bool,
    ) -> Result<Self, NamoError> {
        if forbid_rotations
            && primitives
                .iter()
                .any(|p| matches!(p, MotionPrimitive::Rotate { .. }))
        {
            return Err(NamoError::RotationsForbidden);
        }
        if rotation_unit_angle <= 0.0 {
            return Err(NamoError::InvalidConfig(format!(
                "rotation unit angle must be positive, got {rotation_unit_angle}"
            )));
        }
        Ok(Self {
            primitives,
            rotation_unit_angle,
            forbid_rotations,
        })
    }

    /// Forward and backward translations, plus both unit rotations when allowed.
    pub fn from_units(
        translation_unit_length: f32,
        rotation_unit_angle: f32,
        forbid_rotations: bool,
    ) -> Result<Self, NamoError> {
        let mut primitives = vec![
            MotionPrimitive::Translate {
                distance: translation_unit_length,
            },
            MotionPrimitive::Translate {
                distance: -translation_unit_length,
            },
        ];
        if !forbid_rotations {
            primitives.push(MotionPrimitive::Rotate {
                angle: rotation_unit_angle,
            });
            primitives.push(MotionPrimitive::Rotate {
                angle: -rotation_unit_angle,
            });
        }
        Self::new(primitives, rotation_unit_angle, forbid_rotations)
    }

    pub fn from_config(config: &PlannerConfig) -> Result<Self, NamoError> {
        Self::from_units(
            config.translation_unit_length,
            config.rotation_unit_angle,
            config.forbid_rotations,
        )
    }

    pub fn primitives(&self) -> &[MotionPrimitive] {
        &self.primitives
    }

    pub fn rotation_unit_angle(&self) -> f32 {
        self.rotation_unit_angle
    }

    pub fn forbid_rotations(&self) -> bool {
        self.forbid_rotations
    }

    /// Orientation offsets reachable by repeated unit rotations, starting with 0.
    pub fn rotation_offsets(&self) -> Vec<f32> {
        if self.forbid_rotations {
            return vec![0.0];
        }
        let steps = (360.0 / self.rotation_unit_angle).round().max(1.0) as u32;
        (0..steps)
            .map(|i| i as f32 * self.rotation_unit_angle)
            .collect()
    }
}

/// Outcome of executing an action in the world.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    Success,
    /// `entity` would hit the unmoving entity `other`.
    StaticCollision { entity: Uid, other: Uid },
    /// `entity` would hit `other` while `other` is carried by an agent.
    DynamicCollision { entity: Uid, other: Uid },
    /// The grab target is held by the agent `other`.
    GrabbedByOther { other: Uid },
    /// The agent tried to release something it does not hold.
    NotGrabbed { entity: Uid },
    /// The agent `by` already holds `entity`.
    AlreadyGrabbed { entity: Uid, by: Uid },
    /// The agent already holds another entity.
    GrabMoreThanOne,
}

impl ActionResult {
    pub fn is_failure(&self) -> bool {
        !matches!(self, ActionResult::Success)
    }

    /// Failures where another entity got in the way rather than a planning mistake.
    pub fn blames_other_agent(&self) -> bool {
        matches!(
            self,
            ActionResult::StaticCollision { .. }
                | ActionResult::DynamicCollision { .. }
                | ActionResult::GrabbedByOther { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_default_action_set() {
        let set = ActionSet::from_units(0.5, 15.0, false).unwrap();
        assert_eq!(set.primitives().len(), 4);
        assert_eq!(set.rotation_offsets().len(), 24);
        assert_eq!(set.rotation_offsets()[1], 15.0);

        let no_rotation = ActionSet::from_units(0.5, 15.0, true).unwrap();
        assert_eq!(no_rotation.primitives().len(), 2);
        assert_eq!(no_rotation.rotation_offsets(), vec![0.0]);
    }

    #[test]
    fn test_rotation_primitive_rejected_when_forbidden() {
        let result = ActionSet::new(vec![MotionPrimitive::Rotate { angle: 15.0 }], 15.0, true);
        assert!(matches!(result, Err(NamoError::RotationsForbidden)));
    }

    #[test]
    fn test_undoes_previous_action() {
        let forward = MotionPrimitive::Translate { distance: 0.5 };
        let backward = MotionPrimitive::Translate { distance: -0.5 };
        assert!(backward.undoes(&forward.to_action()));
        assert!(!forward.undoes(&forward.to_action()));

        let left = MotionPrimitive::Rotate { angle: 15.0 };
        let right = MotionPrimitive::Rotate { angle: -15.0 };
        assert!(right.undoes(&left.to_action()));
        assert!(!right.undoes(&forward.to_action()));
    }

    #[test]
    fn test_translation_is_in_robot_frame() {
        let pose = Pose2::new(1.0, 1.0, 90.0);
        let action = Action::Translation {
            vector: Vec2::new(2.0, 0.0),
        };
        let next = action.predict_pose(&pose);
        assert_relative_eq!(next.x(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(next.y(), 3.0, epsilon = 1e-5);
        assert_relative_eq!(next.theta, 90.0, epsilon = 1e-4);
    }

    #[test]
    fn test_failure_classification() {
        assert!(!ActionResult::Success.is_failure());
        let collision = ActionResult::StaticCollision { entity: 1, other: 2 };
        assert!(collision.is_failure());
        assert!(collision.blames_other_agent());
        assert!(ActionResult::GrabbedByOther { other: 5 }.blames_other_agent());
        let mistake = ActionResult::AlreadyGrabbed { entity: 2, by: 1 };
        assert!(mistake.is_failure());
        assert!(!mistake.blames_other_agent());
        assert!(!ActionResult::NotGrabbed { entity: 2 }.blames_other_agent());
    }
}
