//! Per-tick decision making for one robot.

use std::collections::VecDeque;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{PlannerConfig, SocialCostmap};
use crate::action::{Action, ActionResult};
use crate::grid::{ConnectedComponents, OccupancyGrid};
use crate::plan::Plan;
use crate::search::Planner;
use crate::types::{NamoError, Pose2, Uid};
use crate::world::World;

/// A robot working through a queue of goals, one action per tick.
pub struct Agent {
    robot_uid: Uid,
    goals: VecDeque<Pose2>,
    goal: Option<Pose2>,
    plan: Option<Plan>,
    config: PlannerConfig,
    social: SocialCostmap,
    components: Option<ConnectedComponents>,
    wait_steps: u32,
    rng: StdRng,
}

impl Agent {
    /// Set up an agent for the robot `robot_uid` of `world`.
    ///
    /// The social costmap is computed once from the entities the robot
    /// cannot move.
    pub fn new(
        robot_uid: Uid,
        goals: impl IntoIterator<Item = Pose2>,
        config: PlannerConfig,
        world: &World,
    ) -> Result<Self, NamoError> {
        config.validate()?;
        world.try_entity(robot_uid)?;
        let static_grid = OccupancyGrid::from_polygons(
            world.info().clone(),
            &world.unmovable_polygons(robot_uid),
            0.0,
        );
        let social = SocialCostmap::from_static_grid(&static_grid, config.neighborhood);
        Ok(Self {
            robot_uid,
            goals: goals.into_iter().collect(),
            goal: None,
            plan: None,
            config,
            social,
            components: None,
            wait_steps: 0,
            rng: StdRng::from_entropy(),
        })
    }

    /// Use a seeded generator for wait durations.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn robot_uid(&self) -> Uid {
        self.robot_uid
    }

    pub fn goal(&self) -> Option<&Pose2> {
        self.goal.as_ref()
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn social_costmap(&self) -> &SocialCostmap {
        &self.social
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Ticks left to wait.
    pub fn wait_steps(&self) -> u32 {
        self.wait_steps
    }

    /// Decide the action for this tick.
    ///
    /// `last_result` is the outcome of the action returned on the previous
    /// tick, if any. Planning failures end the current goal with
    /// [`Action::GoalFailed`]; errors only report invalid inputs.
    pub fn think(
        &mut self,
        world: &World,
        last_result: Option<&ActionResult>,
    ) -> Result<Action, NamoError> {
        let goal = match self.goal {
            Some(goal) => goal,
            None => match self.goals.pop_front() {
                Some(goal) => {
                    debug!("[Agent {}] new goal {:?}", self.robot_uid, goal);
                    self.start_goal(goal);
                    goal
                }
                None => {
                    info!("[Agent {}] goals finished", self.robot_uid);
                    return Ok(Action::GoalsFinished);
                }
            },
        };

        if self.wait_steps > 0 {
            self.wait_steps -= 1;
            return Ok(Action::Wait);
        }

        let robot = world.try_entity(self.robot_uid)?;
        if robot.pose.is_close(&goal) {
            info!("[Agent {}] reached goal {:?}", self.robot_uid, goal);
            self.finish_goal();
            return Ok(Action::GoalSuccess(goal));
        }

        if let Some(result) = last_result.filter(|r| r.blames_other_agent()) {
            let steps = self
                .rng
                .gen_range(self.config.min_wait_steps..=self.config.max_wait_steps);
            debug!(
                "[Agent {}] {result:?}, waiting {steps} ticks before replanning",
                self.robot_uid
            );
            self.wait_steps = steps.saturating_sub(1);
            self.plan = None;
            return Ok(Action::Wait);
        }

        let last_failed = last_result.is_some_and(ActionResult::is_failure);
        let needs_plan = last_failed
            || self.plan.as_ref().is_none_or(|plan| {
                plan.is_empty() || !plan.is_valid(world, Some(self.config.check_horizon))
            });
        if needs_plan {
            let plan = self.replan(world, &goal)?;
            self.plan = Some(plan);
        }

        let step = self
            .plan
            .as_mut()
            .filter(|plan| !plan.has_infinite_cost())
            .and_then(Plan::pop_next_step);
        match step {
            Some(action) => Ok(action),
            None => {
                warn!("[Agent {}] no plan to goal {:?}", self.robot_uid, goal);
                self.finish_goal();
                Ok(Action::GoalFailed(goal))
            }
        }
    }

    fn replan(&mut self, world: &World, goal: &Pose2) -> Result<Plan, NamoError> {
        let planner = Planner::new(self.robot_uid, &self.config, &self.social)?;
        let static_grid = planner.static_grid(world)?;
        let plan = planner.select_connect(world, &static_grid, goal, &mut self.components)?;
        debug!(
            "[Agent {}] replanned: {}",
            self.robot_uid,
            plan.as_ref().map_or_else(
                || "no plan".to_string(),
                |p| format!("{} components, cost {}", p.components().len(), p.total_cost())
            )
        );
        Ok(plan.unwrap_or_else(|| Plan::infinite(*goal, self.robot_uid)))
    }

    fn start_goal(&mut self, goal: Pose2) {
        self.goal = Some(goal);
        self.plan = None;
        self.wait_steps = 0;
    }

    fn finish_goal(&mut self) {
        self.goal = None;
        self.plan = None;
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::geometry::Polygon;
    use crate::types::MapInfo;
    use crate::world::{Entity, EntityKind};

    fn world() -> World {
        let mut world = World::new(MapInfo::square(10, 1.0));
        let pose = Pose2::new(1.5, 1.5, 0.0);
        world
            .add_entity(Entity::new(
                1,
                "robot",
                EntityKind::Robot,
                pose,
                Polygon::rectangle(Vec2::new(1.5, 1.5), 0.5, 0.5),
            ))
            .unwrap();
        world
    }

    #[test]
    fn test_no_goals_finishes_immediately() {
        let world = world();
        let mut agent =
            Agent::new(1, Vec::<Pose2>::new(), PlannerConfig::default(), &world).unwrap();
        assert_eq!(agent.think(&world, None).unwrap(), Action::GoalsFinished);
    }

    #[test]
    fn test_goal_at_start_succeeds() {
        let world = world();
        let goal = Pose2::new(1.5, 1.5, 0.0);
        let mut agent = Agent::new(1, [goal], PlannerConfig::default(), &world).unwrap();
        assert_eq!(agent.think(&world, None).unwrap(), Action::GoalSuccess(goal));
        assert!(agent.goal().is_none());
        assert_eq!(agent.think(&world, None).unwrap(), Action::GoalsFinished);
    }

    #[test]
    fn test_blamed_failure_waits() {
        let world = world();
        let goal = Pose2::new(8.5, 8.5, 0.0);
        let config = PlannerConfig {
            min_wait_steps: 3,
            max_wait_steps: 3,
            ..PlannerConfig::default()
        };
        let mut agent = Agent::new(1, [goal], config, &world).unwrap().with_seed(7);
        assert!(matches!(
            agent.think(&world, None).unwrap(),
            Action::GoToPose(_)
        ));

        let blocked = ActionResult::StaticCollision {
            entity: 1,
            other: 2,
        };
        assert_eq!(agent.think(&world, Some(&blocked)).unwrap(), Action::Wait);
        assert_eq!(agent.wait_steps(), 2);
        assert_eq!(agent.think(&world, None).unwrap(), Action::Wait);
        assert_eq!(agent.think(&world, None).unwrap(), Action::Wait);
        assert!(matches!(
            agent.think(&world, None).unwrap(),
            Action::GoToPose(_)
        ));
    }

    #[test]
    fn test_unknown_robot_is_an_error() {
        let world = world();
        assert!(matches!(
            Agent::new(9, Vec::<Pose2>::new(), PlannerConfig::default(), &world),
            Err(NamoError::UnknownEntity(9))
        ));
    }
}
