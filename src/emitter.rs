//! Emission presets.
//!
//! A preset injects a batch of particles from fixed nozzles near the world
//! corners. Each preset has a reverse variant that the lifecycle controller
//! switches to once the population passes the reverse threshold; reversing
//! changes where the stream enters and which way it sweeps.
//!
//! # Presets
//!
//! | Preset | Nozzles | Reverse |
//! |--------|---------|---------|
//! | [`Emitter::Single`] | top-left, shooting right | top-right, shooting left |
//! | [`Emitter::Dual`] | top-left and bottom-right | top-right and bottom-left |
//! | [`Emitter::Quadruple`] | all four corners, clockwise | all four corners, counter-clockwise |
//!
//! The `i`-th particle of a batch is colored from the shared
//! [`ColorBuffer`] at `prior_population + i`, so particle colors follow
//! spawn order.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::colors::ColorBuffer;
use crate::solver::ParticleStore;

/// Distance of every nozzle from the two nearest world edges.
pub const NOZZLE_MARGIN: f32 = 2.0;

/// Launch speed of the slowest particle in a batch, in world units per second.
pub const BASE_SPEED: f32 = 20.0;

/// Extra speed spread across the particles of one nozzle.
const SPEED_SPREAD: f32 = 10.0;

/// Spacing between particles stacked at the same nozzle.
const STACK_SPACING: f32 = 1.0;

/// Spawn pattern selected at startup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emitter {
    /// One nozzle.
    Single,
    /// Two nozzles in opposite corners.
    Dual,
    /// One nozzle per corner.
    #[default]
    Quadruple,
}

/// Where a stream enters the world and which way it travels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Nozzle {
    pub origin: Vec2,
    pub direction: Vec2,
}

impl Emitter {
    /// Every preset, in command-line index order.
    pub const ALL: [Emitter; 3] = [Emitter::Single, Emitter::Dual, Emitter::Quadruple];

    /// Look up a preset by its command-line index.
    ///
    /// Out-of-range indices fall back to [`Emitter::Single`].
    pub fn from_index(index: i64) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or(Emitter::Single)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Emitter::Single => "single",
            Emitter::Dual => "dual",
            Emitter::Quadruple => "quadruple",
        }
    }

    /// Nozzles for a world of `world_size`, forward or reversed.
    pub fn nozzles(&self, world_size: Vec2, reverse: bool) -> Vec<Nozzle> {
        let m = NOZZLE_MARGIN;
        let (w, h) = (world_size.x, world_size.y);
        let top_left = Vec2::new(m, m);
        let top_right = Vec2::new(w - m, m);
        let bottom_right = Vec2::new(w - m, h - m);
        let bottom_left = Vec2::new(m, h - m);
        let nozzle = |origin, direction| Nozzle { origin, direction };

        match (self, reverse) {
            (Emitter::Single, false) => vec![nozzle(top_left, Vec2::X)],
            (Emitter::Single, true) => vec![nozzle(top_right, Vec2::NEG_X)],
            (Emitter::Dual, false) => vec![
                nozzle(top_left, Vec2::X),
                nozzle(bottom_right, Vec2::NEG_X),
            ],
            (Emitter::Dual, true) => vec![
                nozzle(top_right, Vec2::NEG_X),
                nozzle(bottom_left, Vec2::X),
            ],
            (Emitter::Quadruple, false) => vec![
                nozzle(top_left, Vec2::X),
                nozzle(top_right, Vec2::Y),
                nozzle(bottom_right, Vec2::NEG_X),
                nozzle(bottom_left, Vec2::NEG_Y),
            ],
            (Emitter::Quadruple, true) => vec![
                nozzle(top_left, Vec2::Y),
                nozzle(bottom_left, Vec2::X),
                nozzle(bottom_right, Vec2::NEG_Y),
                nozzle(top_right, Vec2::NEG_X),
            ],
        }
    }

    /// Spawn `floor(count)` particles into `store`.
    ///
    /// Particles are dealt round-robin over the nozzles and stacked across
    /// each stream. Spawning stops quietly when the store is full. Returns the
    /// number actually spawned.
    pub fn spawn<S: ParticleStore>(
        &self,
        store: &mut S,
        colors: &ColorBuffer,
        count: f32,
        reverse: bool,
    ) -> usize {
        if !count.is_finite() || count < 1.0 {
            return 0;
        }
        let total = count.floor() as usize;
        let nozzles = self.nozzles(store.world_size(), reverse);
        let per_nozzle = total.div_ceil(nozzles.len());
        let prior = store.len();

        for i in 0..total {
            let nozzle = nozzles[i % nozzles.len()];
            let slot = i / nozzles.len();
            let across = nozzle.direction.perp();
            // Center the stack on the nozzle.
            let offset = (slot as f32 - (per_nozzle as f32 - 1.0) * 0.5) * STACK_SPACING;
            let position = nozzle.origin + across * offset;
            let speed = BASE_SPEED + SPEED_SPREAD * slot as f32 / per_nozzle.max(1) as f32;
            if !store.spawn(position, nozzle.direction * speed, colors.color_for(prior + i)) {
                tracing::trace!(target: "lifecycle", spawned = i, requested = total, "store full");
                return i;
            }
        }
        total
    }
}
