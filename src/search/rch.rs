//! Reachability search (RCH) over the free-space components.
//!
//! Finds the first movable obstacle that separates the robot from its goal,
//! and the free-space component the robot would reach by going through it.
//! States carry the first obstacle crossed and the first component entered
//! after it, so the search runs in three phases:
//!
//! 1. still in the robot's component (`obstacle == 0`),
//! 2. inside a single obstacle (`obstacle != 0`, `component == 0`),
//! 3. past the obstacle (`component != 0`), where any cell covered by at
//!    most one obstacle may be crossed.

use std::collections::HashSet;

use glam::UVec2;
use log::{debug, trace};

use super::astar::{AStarConfig, SearchNode, search};
use super::cost::CostModel;
use super::grid::step_length;
use crate::grid::{
    CellOccupant, ComponentUid, ConnectedComponents, Neighborhood, OccupancyGrid, Traversable,
};
use crate::types::{NO_UID, NamoError, Uid};

/// Pairs of (obstacle, component) the search must not propose again.
pub type AvoidList = HashSet<(Uid, ComponentUid)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RchConfiguration {
    pub cell: UVec2,
    pub first_obstacle: Uid,
    pub first_component: ComponentUid,
}

impl SearchNode for RchConfiguration {
    type Key = RchConfiguration;

    fn key(&self) -> RchConfiguration {
        *self
    }
}

/// Grids and bookkeeping the reachability search reads.
pub struct RchInput<'a> {
    /// Unmovable entities inflated by the robot radius.
    pub static_grid: &'a OccupancyGrid,
    /// Every entity except the robot, inflated by the robot radius.
    pub inflated_grid: &'a OccupancyGrid,
    pub components: &'a ConnectedComponents,
    pub avoid_list: &'a AvoidList,
    pub cost: &'a CostModel,
    pub neighborhood: Neighborhood,
    pub config: AStarConfig,
}

impl RchInput<'_> {
    /// Moves between cells once past the obstacle: never through a cell shared
    /// by several obstacles, and never from one obstacle straight into another.
    fn transition_allowed(&self, from: UVec2, to: UVec2) -> bool {
        let from_occupant = self.inflated_grid.only_obstacle_in_cell(from);
        let to_occupant = self.inflated_grid.only_obstacle_in_cell(to);
        match (from_occupant, to_occupant) {
            (CellOccupant::Multiple, _) | (_, CellOccupant::Multiple) => false,
            (CellOccupant::Free, _) | (_, CellOccupant::Free) => true,
            (CellOccupant::Single(a), CellOccupant::Single(b)) => a == b,
        }
    }

    fn successor(
        &self,
        current: &RchConfiguration,
        cell: UVec2,
        robot_component: ComponentUid,
    ) -> Option<RchConfiguration> {
        let label = self.components.label_of(cell);
        let occupant = self.inflated_grid.only_obstacle_in_cell(cell);

        if current.first_component != 0 {
            return self
                .transition_allowed(current.cell, cell)
                .then_some(RchConfiguration { cell, ..*current });
        }

        if current.first_obstacle != NO_UID {
            if label > 0 {
                let pair = (current.first_obstacle, label);
                return (label != robot_component && !self.avoid_list.contains(&pair))
                    .then_some(RchConfiguration {
                        cell,
                        first_obstacle: current.first_obstacle,
                        first_component: label,
                    });
            }
            return (occupant == CellOccupant::Single(current.first_obstacle)).then_some(
                RchConfiguration {
                    cell,
                    first_obstacle: current.first_obstacle,
                    first_component: 0,
                },
            );
        }

        if label > 0 {
            return Some(RchConfiguration {
                cell,
                first_obstacle: NO_UID,
                first_component: 0,
            });
        }
        match occupant {
            CellOccupant::Single(uid) => Some(RchConfiguration {
                cell,
                first_obstacle: uid,
                first_component: 0,
            }),
            _ => None,
        }
    }
}

fn check_preconditions(
    start: UVec2,
    goal: UVec2,
    input: &RchInput<'_>,
) -> Result<(), NamoError> {
    if input.inflated_grid.is_blocked(start) {
        return Err(NamoError::StartCellOccupied { cell: start });
    }
    if input.static_grid.is_blocked(goal) {
        return Err(NamoError::GoalCellInStaticObstacle { cell: goal });
    }
    if input.inflated_grid.count(goal) > 1 {
        return Err(NamoError::GoalCellInMultipleObstacles { cell: goal });
    }
    Ok(())
}

/// Full RCH state sequence from `start` to `goal`, or `None` if no
/// admissible route exists.
pub fn rch_path(
    start: UVec2,
    goal: UVec2,
    input: &RchInput<'_>,
) -> Result<Option<Vec<RchConfiguration>>, NamoError> {
    check_preconditions(start, goal, input)?;

    let info = input.static_grid.info();
    let resolution = info.resolution;
    let goal_center = info.cell_center(goal);
    let robot_component = input.components.label_of(start);
    let tf = input.cost.translation_factor;
    let coefficient = input.cost.transfer_coefficient;

    let start_config = RchConfiguration {
        cell: start,
        first_obstacle: NO_UID,
        first_component: 0,
    };
    let goal_config = RchConfiguration {
        cell: goal,
        first_obstacle: NO_UID,
        first_component: 0,
    };

    let outcome = search(
        [(start_config, 0.0)],
        &goal_config,
        &input.config,
        |current, goal| {
            // Ending inside the obstacle opens no component; such a pair is
            // avoided like any other.
            current.cell == goal.cell
                && !(current.first_component == 0
                    && input.avoid_list.contains(&(current.first_obstacle, 0)))
        },
        |current, state| {
            let g = state.g_score(current).unwrap_or(f32::INFINITY);
            input
                .neighborhood
                .free_neighbors(input.static_grid, current.cell)
                .into_iter()
                .filter_map(|neighbor| {
                    let next = input.successor(current, neighbor.cell, robot_component)?;
                    let mut step = step_length(neighbor.diagonal, resolution) * tf;
                    if input.inflated_grid.count(neighbor.cell) > 0 {
                        step *= coefficient;
                    }
                    Some((next, g + step))
                })
                .collect()
        },
        |current, _| tf * info.cell_center(current.cell).distance(goal_center),
    );

    trace!(
        "[RCH] {} expansions, goal {}",
        outcome.expansions(),
        if outcome.found() { "reached" } else { "unreachable" }
    );
    if !outcome.found() {
        return Ok(None);
    }
    Ok(Some(outcome.path()))
}

/// First obstacle to move and the component it opens, `(0, 0)` when none.
///
/// # Errors
///
/// - [`NamoError::StartCellOccupied`] if the start cell is covered by any
///   inflated obstacle.
/// - [`NamoError::GoalCellInStaticObstacle`] if the goal cell is in a static one.
/// - [`NamoError::GoalCellInMultipleObstacles`] if several obstacles cover it.
/// - [`NamoError::NoObstacleTraversed`] if the goal was reached without
///   crossing any obstacle.
pub fn rch(
    start: UVec2,
    goal: UVec2,
    input: &RchInput<'_>,
) -> Result<(Uid, ComponentUid), NamoError> {
    let Some(path) = rch_path(start, goal, input)? else {
        debug!("[RCH] no obstacle left to try");
        return Ok((NO_UID, 0));
    };
    let Some(end) = path.last() else {
        return Ok((NO_UID, 0));
    };
    if end.first_obstacle == NO_UID {
        return Err(NamoError::NoObstacleTraversed);
    }
    debug!(
        "[RCH] obstacle {} opens component {}",
        end.first_obstacle, end.first_component
    );
    Ok((end.first_obstacle, end.first_component))
}
