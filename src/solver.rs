//! Verlet particle solver.
//!
//! Particles are equal circles of radius [`PARTICLE_RADIUS`]. Every frame is
//! split into substeps; each substep rebuilds the collision grid, separates
//! overlapping pairs, then applies gravity and integrates positions on the
//! worker pool. With borders enabled particles are kept inside the world;
//! without them, particles that leave the world are dropped.
//!
//! The lifecycle controller only sees the solver through [`ParticleStore`].

use std::sync::Arc;

use glam::Vec2;
use image::Rgba;
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::gravity::Gravity;
use crate::spatial::{CollisionGrid, SpatialConfig};

/// Radius of every particle in world units.
pub const PARTICLE_RADIUS: f32 = 0.5;

/// Fraction of an overlap corrected per collision.
const RESPONSE: f32 = 0.75;

/// How far past the world edge a particle may drift before it is dropped.
const ESCAPE_MARGIN: f32 = PARTICLE_RADIUS * 2.0;

/// The particle operations the lifecycle controller and emission presets use.
///
/// [`Solver`] is the real implementation; tests drive the controller with an
/// in-memory store.
pub trait ParticleStore {
    /// Number of live particles.
    fn len(&self) -> usize;

    /// Whether there are no live particles.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// World dimensions in world units.
    fn world_size(&self) -> Vec2;

    /// Position of the particle at `index` (spawn order).
    fn position(&self, index: usize) -> Vec2;

    /// Add a particle. Returns `false` if the store is full.
    fn spawn(&mut self, position: Vec2, velocity: Vec2, color: Rgba<u8>) -> bool;

    /// Remove every particle.
    fn clear(&mut self);

    /// Active gravity strategy.
    fn gravity(&self) -> Gravity;

    fn set_gravity(&mut self, gravity: Gravity);

    /// Scalar applied to the active gravity strategy.
    fn gravity_force(&self) -> f32;

    fn set_gravity_force(&mut self, force: f32);
}

/// A single simulated particle.
///
/// Velocity is implicit: it is the difference between the current and the
/// previous position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec2,
    pub last_position: Vec2,
    pub acceleration: Vec2,
    pub color: Rgba<u8>,
}

/// Static solver parameters.
#[derive(Clone, Copy, Debug)]
pub struct SolverSettings {
    /// World dimensions in world units.
    pub world_size: Vec2,
    /// Substeps per frame.
    pub sub_steps: u32,
    /// Duration of one frame in seconds.
    pub frame_dt: f32,
    /// Hard cap on live particles; spawns beyond it are rejected.
    pub particle_limit: usize,
}

pub struct Solver {
    particles: Vec<Particle>,
    settings: SolverSettings,
    gravity: Gravity,
    gravity_force: f32,
    grid: CollisionGrid,
    pool: Arc<ThreadPool>,
}

impl Solver {
    pub fn new(settings: SolverSettings, gravity: Gravity, gravity_force: f32, pool: Arc<ThreadPool>) -> Self {
        let grid = CollisionGrid::new(SpatialConfig::covering(
            settings.world_size,
            PARTICLE_RADIUS * 2.0,
        ));
        Self {
            particles: Vec::with_capacity(settings.particle_limit),
            settings,
            gravity,
            gravity_force,
            grid,
            pool,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Duration of one substep in seconds.
    #[inline]
    pub fn sub_dt(&self) -> f32 {
        self.settings.frame_dt / self.settings.sub_steps.max(1) as f32
    }

    /// Advance the simulation by `dt` seconds.
    pub fn update(&mut self, dt: f32, borders: bool) {
        let sub_steps = self.settings.sub_steps.max(1);
        let sub_dt = dt / sub_steps as f32;
        for _ in 0..sub_steps {
            self.solve_collisions();
            self.integrate(sub_dt, borders);
            if !borders {
                self.discard_escaped();
            }
        }
    }

    fn solve_collisions(&mut self) {
        self.grid.rebuild(self.particles.iter().map(|p| p.position));
        let particles = &mut self.particles;
        self.grid.for_each_pair(|a, b| collide(particles, a, b));
    }

    fn integrate(&mut self, dt: f32, borders: bool) {
        let world = self.settings.world_size;
        let gravity = self.gravity;
        let force = self.gravity_force;
        let min = Vec2::splat(PARTICLE_RADIUS);
        let max = (world - PARTICLE_RADIUS).max(min);
        let particles = &mut self.particles;

        self.pool.install(|| {
            particles.par_iter_mut().for_each(|p| {
                p.acceleration += gravity.acceleration(p.position, world, force);
                let displacement = p.position - p.last_position;
                p.last_position = p.position;
                p.position += displacement + p.acceleration * (dt * dt);
                p.acceleration = Vec2::ZERO;
                if borders {
                    p.position = p.position.clamp(min, max);
                }
            });
        });
    }

    fn discard_escaped(&mut self) {
        let world = self.settings.world_size;
        let before = self.particles.len();
        self.particles.retain(|p| {
            let pos = p.position;
            pos.x >= -ESCAPE_MARGIN
                && pos.y >= -ESCAPE_MARGIN
                && pos.x <= world.x + ESCAPE_MARGIN
                && pos.y <= world.y + ESCAPE_MARGIN
        });
        let dropped = before - self.particles.len();
        if dropped > 0 {
            tracing::trace!(target: "solver", dropped, remaining = self.particles.len(), "particles left the world");
        }
    }
}

/// Push two overlapping particles apart along their center axis.
fn collide(particles: &mut [Particle], a: usize, b: usize) {
    const MIN_DIST: f32 = PARTICLE_RADIUS * 2.0;
    let axis = particles[a].position - particles[b].position;
    let dist2 = axis.length_squared();
    if dist2 >= MIN_DIST * MIN_DIST {
        return;
    }
    let push = if dist2 > 1e-8 {
        let dist = dist2.sqrt();
        axis / dist * (0.5 * RESPONSE * (MIN_DIST - dist))
    } else {
        // Coincident centers: split along X.
        Vec2::X * (0.5 * RESPONSE * MIN_DIST)
    };
    particles[a].position += push;
    particles[b].position -= push;
}

impl ParticleStore for Solver {
    fn len(&self) -> usize {
        self.particles.len()
    }

    fn world_size(&self) -> Vec2 {
        self.settings.world_size
    }

    fn position(&self, index: usize) -> Vec2 {
        self.particles[index].position
    }

    fn spawn(&mut self, position: Vec2, velocity: Vec2, color: Rgba<u8>) -> bool {
        if self.particles.len() >= self.settings.particle_limit {
            return false;
        }
        self.particles.push(Particle {
            position,
            last_position: position - velocity * self.sub_dt(),
            acceleration: Vec2::ZERO,
            color,
        });
        true
    }

    fn clear(&mut self) {
        self.particles.clear();
    }

    fn gravity(&self) -> Gravity {
        self.gravity
    }

    fn set_gravity(&mut self, gravity: Gravity) {
        self.gravity = gravity;
    }

    fn gravity_force(&self) -> f32 {
        self.gravity_force
    }

    fn set_gravity_force(&mut self, force: f32) {
        self.gravity_force = force;
    }
}
