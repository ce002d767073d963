//! Applies agent actions to a world.
//!
//! Moves are checked before they happen; a colliding action leaves the
//! world untouched and reports which entity was in the way.

use std::collections::BTreeMap;

use log::warn;

use crate::action::{Action, ActionResult};
use crate::collision::{CollisionScene, Motion, swept_step_collision};
use crate::geometry::Polygon;
use crate::types::{NamoError, Pose2, Uid, rotate_point};
use crate::world::World;

pub struct Simulator {
    world: World,
    /// Entity held by each robot.
    attachments: BTreeMap<Uid, Uid>,
    ticks: usize,
}

impl Simulator {
    pub fn new(world: World) -> Self {
        Self {
            world,
            attachments: BTreeMap::new(),
            ticks: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn into_world(self) -> World {
        self.world
    }

    /// Entity currently held by `robot_uid`.
    pub fn held_by(&self, robot_uid: Uid) -> Option<Uid> {
        self.attachments.get(&robot_uid).copied()
    }

    /// Robot holding `entity`, if any.
    pub fn holder_of(&self, entity: Uid) -> Option<Uid> {
        self.attachments
            .iter()
            .find(|(_, held)| **held == entity)
            .map(|(robot, _)| *robot)
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Execute `action` for `robot_uid`.
    pub fn step(&mut self, robot_uid: Uid, action: &Action) -> Result<ActionResult, NamoError> {
        self.ticks += 1;
        let result = match action {
            Action::Wait
            | Action::GoalSuccess(_)
            | Action::GoalFailed(_)
            | Action::GoalsFinished => ActionResult::Success,
            Action::GoToPose(pose) => self.go_to_pose(robot_uid, pose)?,
            Action::Translation { .. } | Action::Rotation { .. } => {
                self.move_robot(robot_uid, action, &[])?
            }
            Action::Grab { entity, .. } => self.grab(robot_uid, action, *entity)?,
            Action::Release { entity, .. } => self.release(robot_uid, action, *entity)?,
        };
        if result.is_failure() {
            warn!("[Sim] robot {robot_uid} failed {action:?}: {result:?}");
        }
        Ok(result)
    }

    fn collision_result(&self, entity: Uid, other: Uid) -> ActionResult {
        if self.holder_of(other).is_some() {
            ActionResult::DynamicCollision { entity, other }
        } else {
            ActionResult::StaticCollision { entity, other }
        }
    }

    /// Scene of everything but `excluded` and whatever the robot holds.
    fn scene_for(&self, robot_uid: Uid, excluded: &[Uid]) -> CollisionScene {
        let mut uids = vec![robot_uid];
        uids.extend(self.held_by(robot_uid));
        uids.extend_from_slice(excluded);
        self.world.scene_excluding(&uids)
    }

    fn go_to_pose(&mut self, robot_uid: Uid, pose: &Pose2) -> Result<ActionResult, NamoError> {
        let robot = self.world.try_entity(robot_uid)?;
        let scene = self.scene_for(robot_uid, &[]);
        let radius = robot.polygon.circumscribed_radius();
        if let Some(other) = scene.segment_collision(robot.pose.position, pose.position, radius) {
            return Ok(self.collision_result(robot_uid, other));
        }

        let robot_pose = robot.pose;
        if let Some(held) = self.held_by(robot_uid) {
            let entity = self.world.try_entity(held)?;
            let moved = entity.with_pose(carried_pose(&robot_pose, pose, &entity.pose));
            if let Some(other) = self.scene_for(robot_uid, &[]).first_collision(&moved.polygon) {
                return Ok(self.collision_result(held, other));
            }
            self.world.set_pose(held, moved.pose)?;
        }
        self.world.set_pose(robot_uid, *pose)?;
        Ok(ActionResult::Success)
    }

    /// Sweep the robot and its load along the motion of `action`; `ignored`
    /// entities are left out of the checks.
    fn move_robot(
        &mut self,
        robot_uid: Uid,
        action: &Action,
        ignored: &[Uid],
    ) -> Result<ActionResult, NamoError> {
        let robot = self.world.try_entity(robot_uid)?;
        let Some(motion) = action.motion(&robot.pose) else {
            return Ok(ActionResult::Success);
        };
        let scene = self.scene_for(robot_uid, ignored);
        if let Some(other) = sweep(&scene, &robot.polygon, motion) {
            return Ok(self.collision_result(robot_uid, other));
        }
        let robot_pose = motion.apply_pose(&robot.pose);

        let mut load_pose = None;
        if let Some(held) = self.held_by(robot_uid) {
            let entity = self.world.try_entity(held)?;
            if let Some(other) = sweep(&scene, &entity.polygon, motion) {
                return Ok(self.collision_result(held, other));
            }
            load_pose = Some((held, motion.apply_pose(&entity.pose)));
        }

        self.world.set_pose(robot_uid, robot_pose)?;
        if let Some((held, pose)) = load_pose {
            self.world.set_pose(held, pose)?;
        }
        Ok(ActionResult::Success)
    }

    fn grab(
        &mut self,
        robot_uid: Uid,
        action: &Action,
        entity: Uid,
    ) -> Result<ActionResult, NamoError> {
        self.world.try_entity(entity)?;
        if let Some(held) = self.held_by(robot_uid) {
            return Ok(if held == entity {
                ActionResult::AlreadyGrabbed {
                    entity,
                    by: robot_uid,
                }
            } else {
                ActionResult::GrabMoreThanOne
            });
        }
        if let Some(other) = self.holder_of(entity) {
            return Ok(ActionResult::GrabbedByOther { other });
        }
        let result = self.move_robot(robot_uid, action, &[entity])?;
        if !result.is_failure() {
            self.attachments.insert(robot_uid, entity);
        }
        Ok(result)
    }

    fn release(
        &mut self,
        robot_uid: Uid,
        action: &Action,
        entity: Uid,
    ) -> Result<ActionResult, NamoError> {
        if self.held_by(robot_uid) != Some(entity) {
            return Ok(ActionResult::NotGrabbed { entity });
        }
        self.attachments.remove(&robot_uid);
        let result = self.move_robot(robot_uid, action, &[entity])?;
        if result.is_failure() {
            self.attachments.insert(robot_uid, entity);
        }
        Ok(result)
    }
}

fn sweep(scene: &CollisionScene, polygon: &Polygon, motion: Motion) -> Option<Uid> {
    swept_step_collision(scene, polygon, &motion.apply(polygon), motion).colliding_uid
}

/// Pose of a load rigidly attached to a robot going from `from` to `to`.
fn carried_pose(from: &Pose2, to: &Pose2, load: &Pose2) -> Pose2 {
    let rotation = to.theta - from.theta;
    let offset = rotate_point(load.position, from.position, rotation) - from.position;
    Pose2::from_position(to.position + offset, load.theta + rotation)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::Vec2;

    use super::*;
    use crate::types::MapInfo;
    use crate::world::{Entity, EntityKind};

    const ROBOT: Uid = 1;
    const BOX: Uid = 2;
    const WALL: Uid = 3;

    fn add(world: &mut World, uid: Uid, kind: EntityKind, center: Vec2, size: Vec2) {
        world
            .add_entity(Entity::new(
                uid,
                format!("entity{uid}"),
                kind,
                Pose2::from_position(center, 0.0),
                Polygon::rectangle(center, size.x, size.y),
            ))
            .unwrap();
    }

    fn simulator() -> Simulator {
        let mut world = World::new(MapInfo::square(10, 1.0));
        add(&mut world, ROBOT, EntityKind::Robot, Vec2::new(2.0, 5.0), Vec2::splat(1.0));
        add(&mut world, BOX, EntityKind::Movable, Vec2::new(4.0, 5.0), Vec2::splat(1.0));
        add(&mut world, WALL, EntityKind::Static, Vec2::new(8.5, 5.0), Vec2::new(1.0, 10.0));
        Simulator::new(world)
    }

    fn grab() -> Action {
        Action::Grab {
            vector: Vec2::new(0.9, 0.0),
            entity: BOX,
        }
    }

    #[test]
    fn test_push_moves_the_held_entity() {
        let mut sim = simulator();
        assert_eq!(sim.step(ROBOT, &grab()).unwrap(), ActionResult::Success);
        assert_eq!(sim.held_by(ROBOT), Some(BOX));

        let push = Action::Translation {
            vector: Vec2::new(1.0, 0.0),
        };
        assert_eq!(sim.step(ROBOT, &push).unwrap(), ActionResult::Success);
        assert_relative_eq!(sim.world().entity(BOX).unwrap().pose.x(), 5.0, epsilon = 1e-5);
        assert_relative_eq!(sim.world().entity(ROBOT).unwrap().pose.x(), 3.9, epsilon = 1e-5);
    }

    #[test]
    fn test_blocked_push_leaves_world_unchanged() {
        let mut sim = simulator();
        sim.step(ROBOT, &grab()).unwrap();
        let push = Action::Translation {
            vector: Vec2::new(4.0, 0.0),
        };
        assert_eq!(
            sim.step(ROBOT, &push).unwrap(),
            ActionResult::StaticCollision {
                entity: BOX,
                other: WALL
            }
        );
        assert_relative_eq!(sim.world().entity(BOX).unwrap().pose.x(), 4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_grab_and_release_bookkeeping() {
        let mut sim = simulator();
        let release = Action::Release {
            vector: Vec2::new(-0.5, 0.0),
            entity: BOX,
        };
        assert_eq!(
            sim.step(ROBOT, &release).unwrap(),
            ActionResult::NotGrabbed { entity: BOX }
        );
        sim.step(ROBOT, &grab()).unwrap();
        let again = Action::Grab {
            vector: Vec2::ZERO,
            entity: BOX,
        };
        assert_eq!(
            sim.step(ROBOT, &again).unwrap(),
            ActionResult::AlreadyGrabbed {
                entity: BOX,
                by: ROBOT
            }
        );
        assert_eq!(sim.step(ROBOT, &release).unwrap(), ActionResult::Success);
        assert_eq!(sim.held_by(ROBOT), None);
        assert_relative_eq!(sim.world().entity(ROBOT).unwrap().pose.x(), 2.4, epsilon = 1e-5);
    }

    #[test]
    fn test_go_to_pose_checks_the_segment() {
        let mut sim = simulator();
        let through_box = Action::GoToPose(Pose2::new(6.0, 5.0, 0.0));
        assert_eq!(
            sim.step(ROBOT, &through_box).unwrap(),
            ActionResult::StaticCollision {
                entity: ROBOT,
                other: BOX
            }
        );
        let around = Action::GoToPose(Pose2::new(2.0, 8.0, 90.0));
        assert_eq!(sim.step(ROBOT, &around).unwrap(), ActionResult::Success);
        assert_eq!(sim.world().entity(ROBOT).unwrap().pose, Pose2::new(2.0, 8.0, 90.0));
        assert_eq!(sim.ticks(), 2);
    }
}
