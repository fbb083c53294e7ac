use platoon_formation_sim_core::config::{Config, DepartMethod};
use platoon_formation_sim_core::simulation::Simulation;

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn make_config(vehicles: u32) -> Config {
    let mut config = Config::default();
    config.vehicles = vehicles;
    config.depart_method = DepartMethod::Number;
    config.penetration = 0.4;
    config.road_length = 20_000.0;
    config.lanes = 4;
    config.time_limit = 200.0;
    config.step_length = 1.0;
    config.random_seed = 42;
    config
}

pub fn benchmark_step(c: &mut Criterion) {
    c.bench_function("simulation_run_500_vehicles", |b| {
        b.iter(|| {
            let sim = Simulation::new(black_box(make_config(500))).expect("valid config");
            let summary = sim.run().expect("no collisions under default policy");
            black_box(summary);
        })
    });
}

criterion_group!(benches, benchmark_step);
criterion_main!(benches);
