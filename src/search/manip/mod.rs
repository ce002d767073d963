//! Focused manipulation search.
//!
//! Searches the joint robot and obstacle state space for a way to push or
//! rotate one obstacle so that the robot can reach a target component. The
//! search is focused on a goal placement picked among the best ranked
//! obstacle destinations, but exits early on any placement ranked within
//! the bound quantile that leaves room to release the obstacle and opens a
//! path. When it exhausts without exiting, the closed states are scanned
//! for the best acceptable placement.

pub mod candidates;
pub mod configuration;
pub mod end_config;
pub mod neighbors;

use std::collections::{HashMap, HashSet};

use glam::{UVec2, Vec2};
use log::debug;

pub use candidates::{Contact, DestinationRanking, deduce_robot_goal_pose, manipulation_contacts};
pub use configuration::{Configuration, JointKey, RobotObstacleConfiguration};
pub use end_config::OpeningChecker;
pub use neighbors::StaticCollisionCache;

use super::{CostModel, SearchNode, search};
use crate::action::{Action, ActionSet};
use crate::behavior::{PlannerConfig, SocialCostmap};
use crate::collision::{CollisionCache, CollisionData, CollisionScene, Motion, swept_step_collision};
use crate::geometry::Polygon;
use crate::grid::{OccupancyGrid, Traversable};
use crate::inflation::{inflated_footprint, robot_inflation_radius};
use crate::plan::{Path, TransferPath};
use crate::types::{Bounds, MapInfo, NamoError, Pose2, RELEASE_MARGIN_CELLS, Uid};
use crate::world::{Entity, World};

/// Planner-wide inputs shared by every manipulation search.
#[derive(Debug, Clone, Copy)]
pub struct ManipContext<'a> {
    pub config: &'a PlannerConfig,
    pub cost: &'a CostModel,
    pub actions: &'a ActionSet,
    pub social: &'a SocialCostmap,
}

/// One obstacle to move, in one world.
#[derive(Debug, Clone, Copy)]
pub struct ManipRequest<'a> {
    pub world: &'a World,
    pub robot_uid: Uid,
    pub obstacle_uid: Uid,
    pub goal: Pose2,
    /// Cells of the robot's free-space component.
    pub accessible: &'a HashSet<UVec2>,
    /// Cells of the component to open a way to; empty when the goal lies
    /// inside the obstacle's inflation.
    pub target: &'a HashSet<UVec2>,
}

/// Where the robot ends after releasing the obstacle.
#[derive(Debug, Clone)]
pub struct WalkBack {
    pub pose: Pose2,
    pub polygon: Polygon,
    pub sweep: CollisionData,
}

/// Everything fixed during one search.
///
/// The scene and both grids hold every entity except the robot and the
/// manipulated obstacle.
pub struct Workspace<'a> {
    pub config: &'a PlannerConfig,
    pub cost: &'a CostModel,
    pub actions: &'a ActionSet,
    pub social: &'a SocialCostmap,
    pub info: MapInfo,
    pub map_bounds: Bounds,
    pub robot: &'a Entity,
    pub obstacle: &'a Entity,
    pub obstacle_start: Configuration,
    /// Circumscribed radius of the robot.
    pub robot_radius: f32,
    pub release_distance: f32,
    pub scene: CollisionScene,
    /// Inflated for the robot center.
    pub robot_grid: OccupancyGrid,
    /// Inflated for the obstacle center.
    pub obstacle_grid: OccupancyGrid,
    pub robot_cell: UVec2,
    pub goal: Pose2,
    pub goal_cell: Option<UVec2>,
    pub accessible: &'a HashSet<UVec2>,
    pub target: &'a HashSet<UVec2>,
}

impl<'a> Workspace<'a> {
    pub fn new(ctx: &ManipContext<'a>, request: &ManipRequest<'a>) -> Result<Self, NamoError> {
        let world = request.world;
        let info = world.info().clone();
        let robot = world.try_entity(request.robot_uid)?;
        let obstacle = world.try_entity(request.obstacle_uid)?;
        let others = world.polygons_excluding(&[robot.uid, obstacle.uid]);

        let robot_cell = info.world_to_cell(robot.pose.position).ok_or_else(|| {
            NamoError::OutOfBounds(format!("robot {} is outside of the map", robot.uid))
        })?;
        let robot_radius = robot.polygon.circumscribed_radius();
        let robot_grid = OccupancyGrid::from_polygons(
            info.clone(),
            &others,
            robot_inflation_radius(&robot.polygon, info.resolution),
        );
        let obstacle_grid = OccupancyGrid::from_polygons(
            info.clone(),
            &others,
            obstacle.polygon.inscribed_radius(),
        );
        let rotation_unit = ctx.actions.rotation_unit_angle();

        Ok(Self {
            config: ctx.config,
            cost: ctx.cost,
            actions: ctx.actions,
            social: ctx.social,
            map_bounds: info.bounds(),
            obstacle_start: Configuration::new(
                obstacle.pose,
                obstacle.polygon.clone(),
                &info,
                rotation_unit,
            ),
            robot,
            obstacle,
            robot_radius,
            release_distance: robot_radius + RELEASE_MARGIN_CELLS * info.resolution,
            scene: CollisionScene::new(others),
            robot_grid,
            obstacle_grid,
            robot_cell,
            goal: request.goal,
            goal_cell: info.world_to_cell(request.goal.position),
            accessible: request.accessible,
            target: request.target,
            info,
        })
    }

    pub fn configuration(&self, pose: Pose2, polygon: Polygon) -> Configuration {
        Configuration::new(pose, polygon, &self.info, self.actions.rotation_unit_angle())
    }

    pub fn robot_polygon_at(&self, pose: &Pose2) -> Polygon {
        self.robot.polygon.set_pose(&self.robot.pose, pose)
    }

    pub fn obstacle_polygon_at(&self, pose: &Pose2) -> Polygon {
        self.obstacle.polygon.set_pose(&self.obstacle.pose, pose)
    }

    /// Robot-frame translation of the release step.
    pub fn release_vector(&self) -> Vec2 {
        Vec2::new(-self.release_distance, 0.0)
    }

    /// Back the robot off the obstacle it holds at `robot`, if there is room.
    pub fn walk_back(&self, robot: &Configuration) -> Option<WalkBack> {
        let motion = Motion::Translation(robot.pose.to_world_vector(self.release_vector()));
        let pose = motion.apply_pose(&robot.pose);
        let cell = self.info.world_to_cell(pose.position)?;
        if self.robot_grid.is_blocked(cell) {
            return None;
        }
        let polygon = motion.apply(&robot.polygon);
        let sweep = swept_step_collision(&self.scene, &robot.polygon, &polygon, motion);
        if sweep.colliding_uid.is_some() {
            return None;
        }
        Some(WalkBack {
            pose,
            polygon,
            sweep,
        })
    }
}

/// Search a transfer path moving `request.obstacle_uid` out of the way.
///
/// Returns `Ok(None)` when the obstacle cannot be grabbed or no acceptable
/// placement is reachable within the expansion budget.
pub fn focused_manip_search(
    ctx: &ManipContext,
    request: &ManipRequest,
) -> Result<Option<TransferPath>, NamoError> {
    let ws = Workspace::new(ctx, request)?;

    let contacts = manipulation_contacts(&ws);
    if contacts.is_empty() {
        debug!("[ManipSearch] obstacle {} cannot be grabbed", ws.obstacle.uid);
        return Ok(None);
    }

    let Some(obstacle_cell) = ws.info.world_to_cell(ws.obstacle.pose.position) else {
        return Ok(None);
    };
    let goal_footprint: HashSet<UVec2> =
        inflated_footprint(&ws.info, &ws.robot_polygon_at(&ws.goal), 0.0)
            .into_iter()
            .collect();
    let ranking = DestinationRanking::compute(
        &ws.obstacle_grid,
        ws.social,
        obstacle_cell,
        &goal_footprint,
        ws.goal.position,
        ws.config.neighborhood,
        ws.config.solution_interval_bound_percentage,
    );

    let mut opening = OpeningChecker::new(&ws);
    let Some(target) = end_config::first_pass(&ws, &ranking, &contacts, &mut opening) else {
        debug!(
            "[ManipSearch] no acceptable placement among {} ranked cells for obstacle {}",
            ranking.len(),
            ws.obstacle.uid
        );
        return Ok(None);
    };

    let mut start_contacts: HashMap<JointKey, &Contact> = HashMap::new();
    let mut starts = Vec::with_capacity(contacts.len());
    for contact in &contacts {
        let node = RobotObstacleConfiguration::at_rest(
            ws.configuration(contact.transfer_start, contact.transfer_polygon.clone()),
            ws.obstacle_start.clone(),
        );
        start_contacts.entry(node.key()).or_insert(contact);
        let g = ws.cost.g(&contact.transit_end, &contact.transfer_start, true);
        starts.push((node, g));
    }

    let mut collisions = StaticCollisionCache::default();
    let outcome = search(
        starts,
        &target,
        &ws.config.manip_astar(),
        |current, goal| {
            let in_place = current.obstacle.cell == goal.obstacle.cell
                || ranking.is_within_bound(current.obstacle.cell);
            in_place && end_config::accepts(&ws, &mut opening, current)
        },
        |current, state| neighbors::expand(&ws, current, state, &mut collisions),
        |current, goal| ws.cost.h(&current.robot.pose, &goal.robot.pose),
    );
    debug!(
        "[ManipSearch] obstacle {}: {} expansions, {} static checks cached",
        ws.obstacle.uid,
        outcome.expansions(),
        collisions.len()
    );

    let end_key = match outcome.end_key() {
        Some(key) => *key,
        None => match end_config::second_pass(&ws, &ranking, &outcome, &mut opening) {
            Some(key) => key,
            None => {
                debug!("[ManipSearch] no reached placement of obstacle {} is acceptable", ws.obstacle.uid);
                return Ok(None);
            }
        },
    };

    let configurations = outcome.path_to(&end_key);
    let Some(contact) = configurations
        .first()
        .and_then(|first| start_contacts.get(&first.key()))
    else {
        return Ok(None);
    };
    let g_end = outcome.g_score(&end_key).unwrap_or(f32::INFINITY);
    Ok(build_transfer_path(&ws, &configurations, contact, g_end))
}

/// Grab, the searched steps, then release.
fn build_transfer_path(
    ws: &Workspace,
    configurations: &[RobotObstacleConfiguration],
    contact: &Contact,
    g_end: f32,
) -> Option<TransferPath> {
    let first = configurations.first()?;
    let last = configurations.last()?;
    let walk_back = ws.walk_back(&last.robot)?;
    let entity = ws.obstacle.uid;

    let mut robot_poses = vec![contact.transit_end];
    let mut robot_polygons = vec![ws.robot_polygon_at(&contact.transit_end)];
    let mut obstacle_poses = vec![first.obstacle.pose];
    let mut obstacle_polygons = vec![first.obstacle.polygon.clone()];
    let mut actions = vec![Action::Grab {
        vector: contact
            .transit_end
            .to_local_vector(contact.transfer_start.position - contact.transit_end.position),
        entity,
    }];
    let mut robot_collisions = CollisionCache::new();
    let mut obstacle_collisions = CollisionCache::new();
    robot_collisions.insert((0, 1), contact.sweep.clone());

    for (i, config) in configurations.iter().enumerate() {
        robot_poses.push(config.robot.pose);
        robot_polygons.push(config.robot.polygon.clone());
        obstacle_poses.push(config.obstacle.pose);
        obstacle_polygons.push(config.obstacle.polygon.clone());
        if let Some(action) = &config.action {
            actions.push(action.clone());
        }
        if let Some(sweep) = &config.robot_sweep {
            robot_collisions.insert((i, i + 1), sweep.clone());
        }
        if let Some(sweep) = &config.obstacle_sweep {
            obstacle_collisions.insert((i, i + 1), sweep.clone());
        }
    }

    let last_state = robot_poses.len() - 1;
    robot_poses.push(walk_back.pose);
    robot_polygons.push(walk_back.polygon);
    obstacle_poses.push(last.obstacle.pose);
    obstacle_polygons.push(last.obstacle.polygon.clone());
    actions.push(Action::Release {
        vector: ws.release_vector(),
        entity,
    });
    robot_collisions.insert((last_state, last_state + 1), walk_back.sweep);

    let phys_cost = g_end + ws.cost.g(&last.robot.pose, &walk_back.pose, true);
    let social_cost = ws
        .info
        .world_to_cell(last.obstacle.pose.position)
        .map_or(0.0, |cell| ws.social.cost(cell).max(0.0));

    Some(
        TransferPath::new(
            Path::new(robot_poses, robot_polygons, actions.clone()),
            Path::new(obstacle_poses, obstacle_polygons, actions),
            entity,
            phys_cost,
        )
        .with_collision_data(robot_collisions, obstacle_collisions)
        .with_social_cost(social_cost),
    )
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::grid::{ConnectedComponents, Neighborhood};
    use crate::world::EntityKind;

    const ROBOT: Uid = 1;
    const BOX: Uid = 2;

    /// A 6 x 4 m room split by a wall at x = 3 whose only gap is plugged by a box.
    fn plugged_wall() -> World {
        let mut world = World::new(MapInfo {
            width: 30,
            height: 20,
            resolution: 0.2,
            origin: Vec2::ZERO,
        });
        let robot_pose = Pose2::new(1.1, 1.9, 0.0);
        world
            .add_entity(Entity::new(
                ROBOT,
                "robot",
                EntityKind::Robot,
                robot_pose,
                Polygon::rectangle(robot_pose.position, 0.3, 0.3),
            ))
            .unwrap();
        let box_pose = Pose2::new(3.1, 1.9, 0.0);
        world
            .add_entity(Entity::new(
                BOX,
                "box",
                EntityKind::Movable,
                box_pose,
                Polygon::rectangle(box_pose.position, 0.4, 0.7),
            ))
            .unwrap();
        for (uid, y_min, y_max) in [(3, 0.0, 1.52), (4, 2.28, 4.0)] {
            let center = Vec2::new(3.1, 0.5 * (y_min + y_max));
            world
                .add_entity(Entity::new(
                    uid,
                    format!("wall{uid}"),
                    EntityKind::Static,
                    Pose2::from_position(center, 0.0),
                    Polygon::rectangle(center, 0.4, y_max - y_min),
                ))
                .unwrap();
        }
        world
    }

    fn config() -> PlannerConfig {
        PlannerConfig {
            forbid_rotations: true,
            translation_unit_length: 0.2,
            ..PlannerConfig::default()
        }
    }

    fn components_of(world: &World) -> (ConnectedComponents, OccupancyGrid) {
        let robot = world.entity(ROBOT).unwrap();
        let grid = OccupancyGrid::from_polygons(
            world.info().clone(),
            &world.polygons_excluding(&[ROBOT]),
            robot_inflation_radius(&robot.polygon, world.resolution()),
        );
        (ConnectedComponents::label(&grid, Neighborhood::Chessboard), grid)
    }

    fn plan_push(world: &World, goal: Pose2) -> Option<TransferPath> {
        let config = config();
        let cost = config.cost_model();
        let actions = ActionSet::from_config(&config).unwrap();
        let statics = OccupancyGrid::from_polygons(
            world.info().clone(),
            &world.unmovable_polygons(ROBOT),
            0.0,
        );
        let social = SocialCostmap::from_static_grid(&statics, config.neighborhood);
        let (components, _) = components_of(world);
        let info = world.info();
        let robot_cell = info.world_to_cell(world.entity(ROBOT).unwrap().pose.position).unwrap();
        let goal_cell = info.world_to_cell(goal.position).unwrap();
        let accessible = components
            .component(components.label_of(robot_cell))
            .unwrap()
            .cells
            .clone();
        let target = components
            .component(components.label_of(goal_cell))
            .map(|c| c.cells.clone())
            .unwrap_or_default();
        let ctx = ManipContext {
            config: &config,
            cost: &cost,
            actions: &actions,
            social: &social,
        };
        let request = ManipRequest {
            world,
            robot_uid: ROBOT,
            obstacle_uid: BOX,
            goal,
            accessible: &accessible,
            target: &target,
        };
        focused_manip_search(&ctx, &request).unwrap()
    }

    #[test]
    fn test_contacts_face_reachable_sides() {
        let world = plugged_wall();
        let config = config();
        let cost = config.cost_model();
        let actions = ActionSet::from_config(&config).unwrap();
        let social = SocialCostmap::from_static_grid(
            &OccupancyGrid::new(world.info().clone(), 0.0),
            config.neighborhood,
        );
        let (components, _) = components_of(&world);
        let robot_cell = world.info().world_to_cell(Vec2::new(1.1, 1.9)).unwrap();
        let accessible = components
            .component(components.label_of(robot_cell))
            .unwrap()
            .cells
            .clone();
        let target = HashSet::new();
        let ctx = ManipContext {
            config: &config,
            cost: &cost,
            actions: &actions,
            social: &social,
        };
        let request = ManipRequest {
            world: &world,
            robot_uid: ROBOT,
            obstacle_uid: BOX,
            goal: Pose2::new(5.1, 1.9, 0.0),
            accessible: &accessible,
            target: &target,
        };
        let ws = Workspace::new(&ctx, &request).unwrap();
        let contacts = manipulation_contacts(&ws);

        // Only the side facing the robot's room can be reached.
        assert_eq!(contacts.len(), 1);
        let contact = &contacts[0];
        assert_relative_eq!(contact.transfer_start.theta, 0.0, epsilon = 1e-3);
        assert!(contact.transit_end.x() < contact.transfer_start.x());
        assert_relative_eq!(contact.transfer_start.x(), 2.9 - ws.robot_radius, epsilon = 1e-4);
    }

    #[test]
    fn test_pushes_box_through_the_gap() {
        let world = plugged_wall();
        let goal = Pose2::new(5.1, 1.9, 0.0);
        let transfer = plan_push(&world, goal).expect("the box can be pushed");

        let robot_path = transfer.robot_path();
        let actions = robot_path.actions();
        assert!(matches!(actions.first(), Some(Action::Grab { entity: BOX, .. })));
        assert!(matches!(actions.last(), Some(Action::Release { entity: BOX, .. })));
        assert!(
            actions[1..actions.len() - 1]
                .iter()
                .all(|a| matches!(a, Action::Translation { .. }))
        );

        // The box leaves the gap on one side, the robot backs off it.
        let obstacle_end = transfer.obstacle_end_pose().unwrap();
        assert!((obstacle_end.x() - 3.1).abs() > 1.0);
        assert_relative_eq!(obstacle_end.y(), 1.9, epsilon = 1e-4);
        let robot_end = transfer.end_pose().unwrap();
        assert!(robot_end.x() < obstacle_end.x());

        // The path is sound in the world it was planned in.
        let scene = world.scene_excluding(&[ROBOT, BOX]);
        let start = world.entity(BOX).unwrap().pose;
        assert!(transfer.is_valid(&scene, &start, None));
    }

    #[test]
    fn test_transfer_cost_covers_every_step() {
        let world = plugged_wall();
        let transfer = plan_push(&world, Pose2::new(5.1, 1.9, 0.0)).unwrap();
        let cost = config().cost_model();
        let expected = cost.path_cost(transfer.robot_path().poses(), true);
        assert_relative_eq!(transfer.phys_cost(), expected, epsilon = 1e-3);
    }

    #[test]
    fn test_unreachable_obstacle_is_not_searched() {
        let world = plugged_wall();
        let config = config();
        let cost = config.cost_model();
        let actions = ActionSet::from_config(&config).unwrap();
        let social = SocialCostmap::from_static_grid(
            &OccupancyGrid::new(world.info().clone(), 0.0),
            config.neighborhood,
        );
        let accessible = HashSet::new();
        let ctx = ManipContext {
            config: &config,
            cost: &cost,
            actions: &actions,
            social: &social,
        };
        let request = ManipRequest {
            world: &world,
            robot_uid: ROBOT,
            obstacle_uid: BOX,
            goal: Pose2::new(5.1, 1.9, 0.0),
            accessible: &accessible,
            target: &accessible,
        };
        assert!(focused_manip_search(&ctx, &request).unwrap().is_none());
    }
}
