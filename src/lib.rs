//! # dispersal
//!
//! Grows a particle image, recolors it from a target picture, then blows it
//! apart, recording every frame after the recolor for a video.
//!
//! ## How a run goes
//!
//! 1. Particles stream in from the corners until the world holds `capacity`
//!    of them. Near 70% full the streams briefly reverse.
//! 2. The full pile is held for the destroy delay.
//! 3. **Snapshot**: every particle looks up the target image pixel under it.
//!    Those colors are stored by spawn order, the world is emptied, and frame
//!    recording starts.
//! 4. The world fills again in exactly the same way, so each particle lands
//!    close to where its predecessor sampled and the picture appears.
//! 5. After a second hold the borders open, gravity flips outward and grows
//!    every tick until the world is empty (or, with `-d`, the run simply ends).
//! 6. The recorded frames are handed to `ffmpeg`.
//!
//! The per-tick decision logic lives in [`PhaseController`]; the host loop is
//! [`Sequencer`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use dispersal::prelude::*;
//!
//! let settings = Config::default().normalize();
//! let target = TargetImage::open("face.png")?;
//! let mut sequencer = Sequencer::new(&settings, target)?;
//! sequencer.run_headless()?;
//! sequencer.finish()?;
//! ```
//!
//! ## Logging
//!
//! Everything logs through `tracing`. Targets: `lifecycle`, `solver`,
//! `recorder`, `export`, `display`, `config`.

pub mod colors;
pub mod config;
pub mod controller;
mod display;
pub mod emitter;
pub mod error;
pub mod export;
pub mod gravity;
pub mod recorder;
pub mod render;
pub mod sequencer;
mod shader;
pub mod solver;
pub mod spatial;
pub mod target;
pub mod window;

pub use colors::ColorBuffer;
pub use config::{Config, Invocation, Settings};
pub use controller::{Action, LifecycleSettings, Phase, PhaseController};
pub use emitter::Emitter;
pub use error::{ConfigError, DisplayError, ExportError, RecordError, RunError, TargetImageError};
pub use export::VideoExporter;
pub use glam::Vec2;
pub use gravity::Gravity;
pub use recorder::{FrameRecorder, FrameSequence};
pub use render::{Frame, Renderer, Viewport};
pub use sequencer::{Sequencer, Tick};
pub use solver::{Particle, ParticleStore, Solver, SolverSettings};
pub use target::TargetImage;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use dispersal::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{Config, Invocation, Settings};
    pub use crate::controller::{Action, Phase, PhaseController};
    pub use crate::emitter::Emitter;
    pub use crate::gravity::Gravity;
    pub use crate::sequencer::Sequencer;
    pub use crate::solver::ParticleStore;
    pub use crate::target::TargetImage;
    pub use crate::Vec2;
}
