use std::hint::black_box;
use std::path::Path;

use criterion::{Criterion, criterion_group, criterion_main};

use namo::{OccupancyGrid, Planner, SocialCostmap, load_scenario};

fn bench_select_connect(c: &mut Criterion) {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/plugged_wall.yaml");
    let scenario = load_scenario(path).expect("fixture scenario");
    let world = &scenario.world;
    let statics = OccupancyGrid::from_polygons(
        world.info().clone(),
        &world.unmovable_polygons(scenario.robot_uid),
        0.0,
    );
    let social = SocialCostmap::from_static_grid(&statics, scenario.config.neighborhood);
    let planner = Planner::new(scenario.robot_uid, &scenario.config, &social).unwrap();
    let static_grid = planner.static_grid(world).unwrap();
    let goal = scenario.goals[0];

    c.bench_function("select_connect_plugged_wall", |b| {
        b.iter(|| {
            let plan = planner
                .select_connect(world, &static_grid, &goal, &mut None)
                .unwrap();
            black_box(plan)
        });
    });

    c.bench_function("inflated_grid_plugged_wall", |b| {
        b.iter(|| black_box(planner.inflated_grid(black_box(world)).unwrap()));
    });
}

criterion_group!(benches, bench_select_connect);
criterion_main!(benches);
