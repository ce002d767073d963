mod common;

use namo::{OccupancyGrid, Planner, PlannerConfig, SocialCostmap, load_scenario};

use common::fixture;

fn plan_with(config: PlannerConfig) -> Option<namo::Plan> {
    let scenario = load_scenario(fixture("plugged_wall.yaml")).unwrap();
    let world = &scenario.world;
    let statics = OccupancyGrid::from_polygons(
        world.info().clone(),
        &world.unmovable_polygons(scenario.robot_uid),
        0.0,
    );
    let social = SocialCostmap::from_static_grid(&statics, config.neighborhood);
    let planner = Planner::new(scenario.robot_uid, &config, &social).unwrap();
    let static_grid = planner.static_grid(world).unwrap();
    planner
        .select_connect(world, &static_grid, &scenario.goals[0], &mut None)
        .unwrap()
}

fn base_config() -> PlannerConfig {
    PlannerConfig {
        forbid_rotations: true,
        translation_unit_length: 0.2,
        ..PlannerConfig::default()
    }
}

#[test]
fn failing_manipulation_ends_without_plan() {
    // Without expansions every manipulation search fails, so the only
    // candidate obstacle ends up avoided and the search gives up.
    let config = PlannerConfig {
        max_manip_expansions: 0,
        ..base_config()
    };
    assert!(plan_with(config).is_none());
}

#[test]
fn no_manipulation_allowed_ends_without_plan() {
    let config = PlannerConfig {
        max_manipulations: 0,
        ..base_config()
    };
    assert!(plan_with(config).is_none());
}
