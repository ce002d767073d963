use std::error::Error;

use log::info;

use namo::visualization::save_occupancy_png;
use namo::{Action, Agent, OccupancyGrid, Simulator, load_scenario};

const DEFAULT_MAX_TICKS: usize = 10_000;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let mut args = std::env::args();
    let _binary = args.next();
    let scenario_path = match args.next() {
        Some(path) => path,
        None => {
            eprintln!("usage: namo_sim <scenario.yaml> [max_ticks] [out.png]");
            return Ok(());
        }
    };
    let max_ticks = match args.next() {
        Some(ticks) => ticks.parse()?,
        None => DEFAULT_MAX_TICKS,
    };
    let image_path = args.next();

    let scenario = load_scenario(&scenario_path)?;
    let robot_uid = scenario.robot_uid;
    let mut agent = Agent::new(robot_uid, scenario.goals, scenario.config, &scenario.world)?;
    let mut sim = Simulator::new(scenario.world);

    let mut last_result = None;
    let mut successes = 0;
    let mut failures = 0;
    for tick in 0..max_ticks {
        let action = agent.think(sim.world(), last_result.as_ref())?;
        info!("[{tick}] {action:?}");
        match action {
            Action::GoalsFinished => break,
            Action::GoalSuccess(_) => successes += 1,
            Action::GoalFailed(_) => failures += 1,
            _ => {}
        }
        last_result = Some(sim.step(robot_uid, &action)?);
    }
    println!(
        "{} ticks, {successes} goals reached, {failures} goals failed",
        sim.ticks()
    );

    if let Some(path) = image_path {
        let world = sim.world();
        let grid = OccupancyGrid::from_polygons(
            world.info().clone(),
            &world.polygons_excluding(&[]),
            0.0,
        );
        save_occupancy_png(&grid, &path)?;
        println!("wrote {path}");
    }

    Ok(())
}
