//! Plans: sequences of transit and transfer paths executed one step per tick.

pub mod path;
pub mod transfer;
pub mod transit;

pub use path::Path;
pub use transfer::TransferPath;
pub use transit::TransitPath;

use crate::action::Action;
use crate::types::{Pose2, Uid};
use crate::world::World;

#[derive(Debug, Clone)]
pub enum PlanComponent {
    Transit(TransitPath),
    Transfer(TransferPath),
}

impl PlanComponent {
    pub fn len(&self) -> usize {
        match self {
            PlanComponent::Transit(path) => path.len(),
            PlanComponent::Transfer(path) => path.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pop_next_step(&mut self) -> Option<Action> {
        match self {
            PlanComponent::Transit(path) => path.pop_next_step(),
            PlanComponent::Transfer(path) => path.pop_next_step(),
        }
    }

    pub fn phys_cost(&self) -> f32 {
        match self {
            PlanComponent::Transit(path) => path.phys_cost(),
            PlanComponent::Transfer(path) => path.phys_cost(),
        }
    }

    pub fn social_cost(&self) -> f32 {
        match self {
            PlanComponent::Transit(path) => path.social_cost(),
            PlanComponent::Transfer(path) => path.social_cost(),
        }
    }

    pub fn end_pose(&self) -> Option<&Pose2> {
        match self {
            PlanComponent::Transit(path) => path.end_pose(),
            PlanComponent::Transfer(path) => path.end_pose(),
        }
    }

    /// The obstacle moved by this component, if it is a transfer.
    pub fn obstacle_uid(&self) -> Option<Uid> {
        match self {
            PlanComponent::Transit(_) => None,
            PlanComponent::Transfer(path) => Some(path.obstacle_uid()),
        }
    }
}

/// Ordered path components leading a robot to a goal.
///
/// A plan without components has an infinite cost and means the goal could
/// not be planned for.
#[derive(Debug, Clone)]
pub struct Plan {
    components: Vec<PlanComponent>,
    goal: Pose2,
    robot_uid: Uid,
}

impl Plan {
    pub fn new(components: Vec<PlanComponent>, goal: Pose2, robot_uid: Uid) -> Self {
        Self {
            components,
            goal,
            robot_uid,
        }
    }

    pub fn infinite(goal: Pose2, robot_uid: Uid) -> Self {
        Self::new(Vec::new(), goal, robot_uid)
    }

    pub fn goal(&self) -> &Pose2 {
        &self.goal
    }

    pub fn robot_uid(&self) -> Uid {
        self.robot_uid
    }

    pub fn components(&self) -> &[PlanComponent] {
        &self.components
    }

    pub fn transfers(&self) -> impl Iterator<Item = &TransferPath> {
        self.components.iter().filter_map(|c| match c {
            PlanComponent::Transfer(path) => Some(path),
            PlanComponent::Transit(_) => None,
        })
    }

    pub fn has_infinite_cost(&self) -> bool {
        self.components.is_empty()
    }

    pub fn phys_cost(&self) -> f32 {
        if self.has_infinite_cost() {
            return f32::INFINITY;
        }
        self.components.iter().map(PlanComponent::phys_cost).sum()
    }

    pub fn social_cost(&self) -> f32 {
        if self.has_infinite_cost() {
            return f32::INFINITY;
        }
        self.components.iter().map(PlanComponent::social_cost).sum()
    }

    pub fn total_cost(&self) -> f32 {
        self.phys_cost() + self.social_cost()
    }

    /// Robot pose once every component has been executed.
    pub fn final_robot_pose(&self) -> Option<&Pose2> {
        self.components.last().and_then(PlanComponent::end_pose)
    }

    /// Append the components of a plan computed from this plan's end state.
    pub fn append(mut self, future: Plan) -> Plan {
        self.components.extend(future.components);
        self
    }

    /// True when no step is left to execute.
    pub fn is_empty(&self) -> bool {
        self.components.iter().all(PlanComponent::is_empty)
    }

    pub fn pop_next_step(&mut self) -> Option<Action> {
        self.components
            .iter_mut()
            .find(|c| !c.is_empty())
            .and_then(PlanComponent::pop_next_step)
    }

    /// Re-check the next `horizon` steps (all of them for `None`) against `world`.
    ///
    /// Transit components ignore the obstacle released just before them;
    /// transfer components ignore the obstacle they carry. Earlier moved
    /// obstacles are checked at their current pose in `world`, so with
    /// several transfers only the steps up to the second one are reliable.
    pub fn is_valid(&self, world: &World, horizon: Option<usize>) -> bool {
        if self.has_infinite_cost() {
            return false;
        }
        let mut budget = horizon;
        let mut released: Option<Uid> = None;

        for component in &self.components {
            if budget == Some(0) {
                break;
            }
            if !component.is_empty() {
                let valid = match component {
                    PlanComponent::Transit(path) => {
                        let mut excluded = vec![self.robot_uid];
                        excluded.extend(released);
                        path.is_valid(&world.scene_excluding(&excluded), budget)
                    }
                    PlanComponent::Transfer(path) => {
                        let Some(obstacle) = world.entity(path.obstacle_uid()) else {
                            return false;
                        };
                        let scene = world.scene_excluding(&[self.robot_uid, path.obstacle_uid()]);
                        path.is_valid(&scene, &obstacle.pose, budget)
                    }
                };
                if !valid {
                    return false;
                }
                budget = budget.map(|b| b.saturating_sub(component.len()));
            }
            if let Some(uid) = component.obstacle_uid() {
                released = Some(uid);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::geometry::Polygon;
    use crate::types::MapInfo;
    use crate::world::{Entity, EntityKind};

    const ROBOT: Uid = 1;

    fn world() -> World {
        let mut world = World::new(MapInfo::square(10, 1.0));
        let pose = Pose2::new(1.0, 1.0, 0.0);
        world
            .add_entity(Entity::new(
                ROBOT,
                "robot",
                EntityKind::Robot,
                pose,
                Polygon::rectangle(pose.position, 0.5, 0.5),
            ))
            .unwrap();
        world
    }

    fn straight_plan(world: &World) -> Plan {
        let robot = world.entity(ROBOT).unwrap();
        let poses = (1..6).map(|x| Pose2::new(x as f32, 1.0, 0.0)).collect();
        let transit = TransitPath::from_poses(poses, &robot.polygon, &robot.pose, 4.0);
        Plan::new(
            vec![PlanComponent::Transit(transit)],
            Pose2::new(5.0, 1.0, 0.0),
            ROBOT,
        )
    }

    fn add_box(world: &mut World, uid: Uid, pose: Pose2) {
        world
            .add_entity(Entity::new(
                uid,
                format!("box{uid}"),
                EntityKind::Movable,
                pose,
                Polygon::rectangle(pose.position, 0.5, 0.5),
            ))
            .unwrap();
    }

    /// Robot at `(x, y)` pushes the box at `(x + 1, y)` one meter along x.
    fn push(uid: Uid, x: f32, y: f32) -> TransferPath {
        let robot_x = [x, x + 0.4, x + 0.9, x + 1.4, x + 1.0];
        let box_x = [x + 1.0, x + 1.0, x + 1.5, x + 2.0, x + 2.0];
        let poses = |xs: &[f32]| -> Vec<Pose2> {
            xs.iter().map(|x| Pose2::new(*x, y, 0.0)).collect()
        };
        let polygons = |poses: &[Pose2]| -> Vec<Polygon> {
            poses
                .iter()
                .map(|p| Polygon::rectangle(p.position, 0.5, 0.5))
                .collect()
        };
        let actions = vec![
            Action::Grab {
                vector: Vec2::new(0.4, 0.0),
                entity: uid,
            },
            Action::Translation {
                vector: Vec2::new(0.5, 0.0),
            },
            Action::Translation {
                vector: Vec2::new(0.5, 0.0),
            },
            Action::Release {
                vector: Vec2::new(-0.4, 0.0),
                entity: uid,
            },
        ];
        let robot_poses = poses(&robot_x);
        let box_poses = poses(&box_x);
        let robot_polygons = polygons(&robot_poses);
        let box_polygons = polygons(&box_poses);
        TransferPath::new(
            Path::new(robot_poses, robot_polygons, actions.clone()),
            Path::new(box_poses, box_polygons, actions),
            uid,
            4.0,
        )
    }

    fn transit(points: &[(f32, f32)]) -> TransitPath {
        let poses: Vec<Pose2> = points.iter().map(|(x, y)| Pose2::new(*x, *y, 0.0)).collect();
        let start = poses[0];
        TransitPath::from_poses(poses, &Polygon::rectangle(start.position, 0.5, 0.5), &start, 4.0)
    }

    #[test]
    fn test_only_last_released_obstacle_is_ignored() {
        let mut world = world();
        add_box(&mut world, 2, Pose2::new(2.0, 1.0, 0.0));
        add_box(&mut world, 3, Pose2::new(2.0, 5.0, 0.0));

        // Push box 2, walk up, push box 3, then come back through the cell
        // box 2 left.
        let plan = Plan::new(
            vec![
                PlanComponent::Transfer(push(2, 1.0, 1.0)),
                PlanComponent::Transit(transit(&[
                    (2.0, 1.0),
                    (1.0, 2.0),
                    (1.0, 3.0),
                    (1.0, 4.0),
                    (1.0, 5.0),
                ])),
                PlanComponent::Transfer(push(3, 1.0, 5.0)),
                PlanComponent::Transit(transit(&[
                    (2.0, 5.0),
                    (2.0, 4.0),
                    (2.0, 3.0),
                    (2.0, 2.0),
                    (2.0, 1.0),
                ])),
            ],
            Pose2::new(2.0, 1.0, 0.0),
            ROBOT,
        );

        // Up to the end of the second transfer every step is checked right.
        assert!(plan.is_valid(&world, Some(12)));
        // The last transit still sees box 2 at its initial pose.
        assert!(!plan.is_valid(&world, None));
    }

    #[test]
    fn test_infinite_plan() {
        let plan = Plan::infinite(Pose2::default(), ROBOT);
        assert!(plan.has_infinite_cost());
        assert!(plan.total_cost().is_infinite());
        assert!(!plan.is_valid(&world(), None));
        assert!(plan.is_empty());
    }

    #[test]
    fn test_valid_until_blocked() {
        let mut world = world();
        let plan = straight_plan(&world);
        assert!(plan.is_valid(&world, Some(10)));

        let blocker = Polygon::rectangle(Vec2::new(2.0, 1.0), 0.5, 0.5);
        world
            .add_entity(Entity::new(
                2,
                "box",
                EntityKind::Movable,
                Pose2::new(2.0, 1.0, 0.0),
                blocker,
            ))
            .unwrap();
        assert!(!plan.is_valid(&world, Some(10)));
        assert!(plan.is_valid(&world, Some(0)));
    }

    #[test]
    fn test_pop_through_components() {
        let world = world();
        let first = straight_plan(&world);
        let second = straight_plan(&world);
        let mut plan = first.append(second);
        assert_eq!(plan.components().len(), 2);
        let mut steps = 0;
        while plan.pop_next_step().is_some() {
            steps += 1;
        }
        assert_eq!(steps, 8);
        assert!(plan.is_empty());
        assert!(plan.pop_next_step().is_none());
        assert!(plan.is_valid(&world, None));
        assert_eq!(plan.final_robot_pose(), Some(&Pose2::new(5.0, 1.0, 0.0)));
    }
}
