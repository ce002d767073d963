#![allow(dead_code)]

use std::path::{Path, PathBuf};

use glam::Vec2;
use namo::{
    Action, ActionResult, Agent, Entity, EntityKind, MapInfo, Polygon, Pose2, Simulator, Uid,
    World,
};

pub const ROBOT: Uid = 1;

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn add_box(world: &mut World, uid: Uid, kind: EntityKind, center: Vec2, size: Vec2) {
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

/// Empty 10 x 10 m world at 1 m per cell with a 0.5 m robot at `robot`.
pub fn open_world(robot: Vec2) -> World {
    let mut world = World::new(MapInfo::square(10, 1.0));
    add_box(&mut world, ROBOT, EntityKind::Robot, robot, Vec2::splat(0.5));
    world
}

/// Run the agent against a simulator until its goals are done.
pub fn run(
    agent: &mut Agent,
    sim: &mut Simulator,
    max_ticks: usize,
) -> Vec<(Action, ActionResult)> {
    let mut log = Vec::new();
    let mut last_result = None;
    for _ in 0..max_ticks {
        let action = agent.think(sim.world(), last_result.as_ref()).unwrap();
        let result = sim.step(agent.robot_uid(), &action).unwrap();
        let finished = action == Action::GoalsFinished;
        log.push((action, result.clone()));
        if finished {
            break;
        }
        last_result = Some(result);
    }
    log
}
