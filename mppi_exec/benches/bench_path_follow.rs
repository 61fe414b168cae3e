//! # Path Follow Critic Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use mppi_lib::{
    costmap::{Costmap, CostmapParams, FREE_SPACE, LETHAL_OBSTACLE},
    critics::{CriticFunction, PathFollowCritic},
    models::{CriticData, Path, Pose2, State, Trajectories},
};
use nalgebra::Vector2;
use ndarray::Array1;
use util::params::ParamStore;

/// Batch size of a typical controller
const BATCH_SIZE: usize = 2000;

/// Time steps of a typical controller
const TIME_STEPS: usize = 56;

fn path_follow_benchmark(c: &mut Criterion) {
    // ---- Build the scenario ----

    let mut costmap = Costmap::new(CostmapParams {
        size_x: 240,
        size_y: 120,
        resolution_m: 0.05,
        origin_m: [-1.0, -3.0],
        track_unknown_space: false,
        default_cost: FREE_SPACE,
    })
    .unwrap();
    costmap.fill_circle(Vector2::new(2.0, 0.0), 0.3, LETHAL_OBSTACLE);

    let path = Path::direct(Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0), 0.05).unwrap();

    let state = State::at(Pose2::new(0.0, 0.0, 0.0));
    let curvatures: Vec<f64> = Array1::linspace(-2.0, 2.0, BATCH_SIZE).to_vec();
    let trajs = Trajectories::arc_fan(&state.pose, 0.5, &curvatures, 0.1, TIME_STEPS);

    let mut critic = PathFollowCritic::default();
    critic.on_configure(
        "controller",
        "PathFollowCritic",
        &ParamStore::new(),
        costmap.into_shared(),
    );

    // ---- Benchmarks ----

    // Every cycle starts with empty caches, so this includes finding the furthest point and the
    // path point validity
    c.bench_function("PathFollowCritic::score", |b| {
        b.iter(|| {
            let mut costs = Array1::zeros(BATCH_SIZE);
            let mut data = CriticData::new(&state, &trajs, &path, &mut costs, 0.1);
            critic.score(&mut data);
            costs
        })
    });

    // Caches already filled by an earlier critic
    let caches = {
        let mut costs = Array1::zeros(BATCH_SIZE);
        let mut data = CriticData::new(&state, &trajs, &path, &mut costs, 0.1);
        critic.score(&mut data);
        (data.furthest_reached_path_point, data.path_pts_valid)
    };

    c.bench_function("PathFollowCritic::score::cached", |b| {
        b.iter(|| {
            let mut costs = Array1::zeros(BATCH_SIZE);
            let mut data = CriticData::new(&state, &trajs, &path, &mut costs, 0.1);
            data.furthest_reached_path_point = caches.0;
            data.path_pts_valid = caches.1.clone();
            critic.score(&mut data);
            costs
        })
    });
}

criterion_group!(benches, path_follow_benchmark);
criterion_main!(benches);
