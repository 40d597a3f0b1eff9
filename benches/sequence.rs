//! Benchmarks for the CPU side of a tick: physics, rasterization and the
//! collision grid.
//!
//! Run with: `cargo bench`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use image::Rgba;
use rand::Rng;

use dispersal::gravity::Gravity;
use dispersal::render::{Renderer, Viewport};
use dispersal::solver::{ParticleStore, Solver, SolverSettings};
use dispersal::spatial::{CollisionGrid, SpatialConfig};
use dispersal::Vec2;

const WORLD: f32 = 200.0;

fn pool() -> Arc<rayon::ThreadPool> {
    Arc::new(rayon::ThreadPoolBuilder::new().build().expect("thread pool"))
}

fn filled_solver(count: usize) -> Solver {
    let mut solver = Solver::new(
        SolverSettings {
            world_size: Vec2::splat(WORLD),
            sub_steps: 8,
            frame_dt: 1.0 / 60.0,
            particle_limit: count,
        },
        Gravity::CentralUneven,
        1.0,
        pool(),
    );
    let mut rng = rand::thread_rng();
    for _ in 0..count {
        let position = Vec2::new(rng.gen_range(1.0..WORLD - 1.0), rng.gen_range(1.0..WORLD - 1.0));
        solver.spawn(position, Vec2::ZERO, Rgba([255, 255, 255, 255]));
    }
    solver
}

fn bench_solver_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("solver_update");
    group.sample_size(20);

    for count in [1_000usize, 10_000, 26_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut solver = filled_solver(count);
            b.iter(|| solver.update(black_box(1.0 / 60.0), true))
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    for count in [1_000usize, 26_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let solver = filled_solver(count);
            let mut renderer = Renderer::new(Viewport::fit(Vec2::splat(WORLD), 1000), pool());
            b.iter(|| {
                renderer.render(black_box(solver.particles()));
            })
        });
    }

    group.finish();
}

fn bench_grid_rebuild(c: &mut Criterion) {
    let solver = filled_solver(26_000);
    let mut grid = CollisionGrid::new(SpatialConfig::covering(Vec2::splat(WORLD), 1.0));

    c.bench_function("grid_rebuild_26000", |b| {
        b.iter(|| grid.rebuild(solver.particles().iter().map(|p| p.position)))
    });
}

criterion_group!(benches, bench_solver_update, bench_render, bench_grid_rebuild);
criterion_main!(benches);
