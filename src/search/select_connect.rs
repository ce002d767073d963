//! Select-Connect: greedy obstacle selection with backtracking.
//!
//! A direct transit is tried first. Otherwise RCH names the first obstacle
//! in the way and Manip-Search tries to move it; on success the rest of the
//! plan is searched recursively in the simulated world where the obstacle
//! has been moved. Every (obstacle, component) pair that fails is added to
//! the avoid-list of the current call before RCH is asked again.

use log::debug;

use super::manip::{ManipContext, ManipRequest, focused_manip_search};
use super::rch::{AvoidList, RchInput, rch};
use super::{CostModel, grid_search, real_path_from_cells};
use crate::action::ActionSet;
use crate::behavior::{PlannerConfig, SocialCostmap};
use crate::grid::{ConnectedComponents, OccupancyGrid, Traversable};
use crate::inflation::robot_inflation_radius;
use crate::plan::{Plan, PlanComponent, TransferPath, TransitPath};
use crate::types::{NO_UID, NamoError, Pose2, Uid};
use crate::world::{Entity, World};

/// Plans for one robot.
pub struct Planner<'a> {
    robot_uid: Uid,
    config: &'a PlannerConfig,
    social: &'a SocialCostmap,
    cost: CostModel,
    actions: ActionSet,
}

impl<'a> Planner<'a> {
    pub fn new(
        robot_uid: Uid,
        config: &'a PlannerConfig,
        social: &'a SocialCostmap,
    ) -> Result<Self, NamoError> {
        Ok(Self {
            robot_uid,
            config,
            social,
            cost: config.cost_model(),
            actions: ActionSet::from_config(config)?,
        })
    }

    pub fn robot_uid(&self) -> Uid {
        self.robot_uid
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost
    }

    fn robot_radius(&self, world: &World) -> Result<f32, NamoError> {
        let robot = world.try_entity(self.robot_uid)?;
        Ok(robot_inflation_radius(&robot.polygon, world.resolution()))
    }

    /// Entities the robot cannot move, inflated for the robot center.
    pub fn static_grid(&self, world: &World) -> Result<OccupancyGrid, NamoError> {
        Ok(OccupancyGrid::from_polygons(
            world.info().clone(),
            &world.unmovable_polygons(self.robot_uid),
            self.robot_radius(world)?,
        ))
    }

    /// Every entity but the robot, inflated for the robot center.
    pub fn inflated_grid(&self, world: &World) -> Result<OccupancyGrid, NamoError> {
        Ok(OccupancyGrid::from_polygons(
            world.info().clone(),
            &world.polygons_excluding(&[self.robot_uid]),
            self.robot_radius(world)?,
        ))
    }

    /// Transit from the robot's pose to `goal` on `inflated_grid`.
    fn transit(
        &self,
        world: &World,
        robot: &Entity,
        inflated_grid: &OccupancyGrid,
        goal: &Pose2,
    ) -> Option<TransitPath> {
        let info = world.info();
        let start_cell = info.world_to_cell(robot.pose.position)?;
        let goal_cell = info.world_to_cell(goal.position)?;
        let (cells, _) =
            grid_search(inflated_grid, start_cell, goal_cell, self.config.neighborhood)?;
        let poses = real_path_from_cells(&robot.pose, &cells, goal, info);
        let cost = self.cost.path_cost(&poses, false);
        Some(TransitPath::from_poses(poses, &robot.polygon, &robot.pose, cost))
    }

    /// Direct transit to `goal`, without moving anything.
    pub fn find_path(
        &self,
        world: &World,
        goal: &Pose2,
    ) -> Result<Option<TransitPath>, NamoError> {
        let robot = world.try_entity(self.robot_uid)?;
        let inflated_grid = self.inflated_grid(world)?;
        Ok(self.transit(world, robot, &inflated_grid, goal))
    }

    /// Plan to `goal`, moving obstacles when needed.
    ///
    /// `components` caches the free-space labelling across calls; it is
    /// labelled on first use and updated incrementally afterwards. Returns
    /// `Ok(None)` when no plan is found.
    pub fn select_connect(
        &self,
        world: &World,
        static_grid: &OccupancyGrid,
        goal: &Pose2,
        components: &mut Option<ConnectedComponents>,
    ) -> Result<Option<Plan>, NamoError> {
        self.select_connect_at_depth(world, static_grid, goal, components, 0)
    }

    fn select_connect_at_depth(
        &self,
        world: &World,
        static_grid: &OccupancyGrid,
        goal: &Pose2,
        components: &mut Option<ConnectedComponents>,
        depth: usize,
    ) -> Result<Option<Plan>, NamoError> {
        let info = world.info();
        let robot = world.try_entity(self.robot_uid)?;
        let inflated_grid = self.inflated_grid(world)?;

        let robot_cell = info.world_to_cell(robot.pose.position).ok_or_else(|| {
            NamoError::OutOfBounds(format!("robot {} is outside of the map", robot.uid))
        })?;
        let Some(goal_cell) = info.world_to_cell(goal.position) else {
            debug!("[SelectConnect] goal {goal:?} is outside of the map");
            return Ok(None);
        };
        if inflated_grid.is_blocked(robot_cell) {
            debug!("[SelectConnect] robot cell {robot_cell} is too close to an obstacle");
            return Ok(None);
        }
        if static_grid.is_blocked(goal_cell) || inflated_grid.count(goal_cell) > 1 {
            debug!("[SelectConnect] goal cell {goal_cell} cannot be freed");
            return Ok(None);
        }

        if let Some(transit) = self.transit(world, robot, &inflated_grid, goal) {
            debug!(
                "[SelectConnect] direct path of {} steps at depth {depth}",
                transit.len()
            );
            return Ok(Some(Plan::new(
                vec![PlanComponent::Transit(transit)],
                *goal,
                self.robot_uid,
            )));
        }
        if depth >= self.config.max_manipulations {
            debug!("[SelectConnect] manipulation depth {depth} reached");
            return Ok(None);
        }

        let labelling = match components.take() {
            Some(mut labelling) => {
                labelling.update(&inflated_grid);
                labelling
            }
            None => ConnectedComponents::label(&inflated_grid, self.config.neighborhood),
        };
        let labelling: &ConnectedComponents = components.insert(labelling);

        let ctx = ManipContext {
            config: self.config,
            cost: &self.cost,
            actions: &self.actions,
            social: self.social,
        };
        let mut avoid_list = AvoidList::new();
        loop {
            let (obstacle_uid, component_uid) = rch(
                robot_cell,
                goal_cell,
                &RchInput {
                    static_grid,
                    inflated_grid: &inflated_grid,
                    components: labelling,
                    avoid_list: &avoid_list,
                    cost: &self.cost,
                    neighborhood: self.config.neighborhood,
                    config: self.config.astar(),
                },
            )?;
            if obstacle_uid == NO_UID {
                debug!(
                    "[SelectConnect] no obstacle left to move after {} failures",
                    avoid_list.len()
                );
                return Ok(None);
            }

            let accessible = labelling
                .component(labelling.label_of(robot_cell))
                .map(|c| c.cells.clone())
                .unwrap_or_default();
            let target = labelling
                .component(component_uid)
                .map(|c| c.cells.clone())
                .unwrap_or_default();
            let transfer = focused_manip_search(
                &ctx,
                &ManipRequest {
                    world,
                    robot_uid: self.robot_uid,
                    obstacle_uid,
                    goal: *goal,
                    accessible: &accessible,
                    target: &target,
                },
            )?;

            if let Some(transfer) = transfer {
                debug!(
                    "[SelectConnect] obstacle {obstacle_uid} can open component {component_uid}"
                );
                if let Some(plan) = self.connect(
                    world,
                    static_grid,
                    goal,
                    labelling,
                    &inflated_grid,
                    transfer,
                    depth,
                )? {
                    return Ok(Some(plan));
                }
            }
            debug!(
                "[SelectConnect] avoiding obstacle {obstacle_uid} toward component {component_uid}"
            );
            avoid_list.insert((obstacle_uid, component_uid));
        }
    }

    /// Plan the rest from the world where `transfer` has been executed, then
    /// prepend the transit to the transfer and the transfer itself.
    #[allow(clippy::too_many_arguments)]
    fn connect(
        &self,
        world: &World,
        static_grid: &OccupancyGrid,
        goal: &Pose2,
        labelling: &ConnectedComponents,
        inflated_grid: &OccupancyGrid,
        transfer: TransferPath,
        depth: usize,
    ) -> Result<Option<Plan>, NamoError> {
        let (Some(transit_end), Some(robot_end), Some(obstacle_end)) = (
            transfer.start_pose().copied(),
            transfer.end_pose().copied(),
            transfer.obstacle_end_pose().copied(),
        ) else {
            return Ok(None);
        };

        let mut simulated = world.simulate();
        simulated.set_pose(transfer.obstacle_uid(), obstacle_end)?;
        simulated.set_pose(self.robot_uid, robot_end)?;

        // The nested call relabels its own copy, so that component uids stay
        // stable for this call's avoid-list.
        let mut nested = Some(labelling.clone());
        let Some(future) =
            self.select_connect_at_depth(&simulated, static_grid, goal, &mut nested, depth + 1)?
        else {
            return Ok(None);
        };

        let robot = world.try_entity(self.robot_uid)?;
        let Some(transit) = self.transit(world, robot, inflated_grid, &transit_end) else {
            debug!(
                "[SelectConnect] grab pose of obstacle {} is unreachable",
                transfer.obstacle_uid()
            );
            return Ok(None);
        };
        Ok(Some(
            Plan::new(
                vec![
                    PlanComponent::Transit(transit),
                    PlanComponent::Transfer(transfer),
                ],
                *goal,
                self.robot_uid,
            )
            .append(future),
        ))
    }
}
