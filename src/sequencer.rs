//! Host loop.
//!
//! A [`Sequencer`] owns the controller, the solver, the renderer and the
//! exporter, and runs one iteration per [`Sequencer::advance`]:
//!
//! 1. controller tick
//! 2. physics step (borders as the controller says)
//! 3. render
//! 4. capture, if recording
//!
//! The terminating tick still runs the whole iteration, so its frame is
//! captured. After that the caller tears down whatever it presents frames
//! with and calls [`Sequencer::finish`].

use std::process::ExitStatus;
use std::sync::Arc;

use crate::colors::COLOR_MARGIN;
use crate::config::{Settings, FRAME_DT};
use crate::controller::{Action, PhaseController};
use crate::error::{ExportError, RecordError, RunError};
use crate::export::VideoExporter;
use crate::recorder::{self, FrameRecorder};
use crate::render::{Frame, Renderer, Viewport};
use crate::solver::{Solver, SolverSettings};
use crate::target::TargetImage;

/// Outcome of one iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    pub action: Action,
    /// Id of the frame written this iteration.
    pub captured: Option<u64>,
    /// The controller has terminated.
    pub finished: bool,
}

pub struct Sequencer {
    controller: PhaseController,
    solver: Solver,
    renderer: Renderer,
    exporter: VideoExporter,
}

impl Sequencer {
    /// Build every component from `settings` and clear the frame directory.
    pub fn new(settings: &Settings, target: TargetImage) -> Result<Self, RunError> {
        let pool = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(settings.threads)
                .thread_name(|i| format!("dispersal-worker-{i}"))
                .build()?,
        );

        recorder::prepare(&settings.out_dir)?;

        let solver = Solver::new(
            SolverSettings {
                world_size: settings.world_size,
                sub_steps: settings.sub_steps,
                frame_dt: FRAME_DT,
                particle_limit: settings.lifecycle.capacity + COLOR_MARGIN,
            },
            settings.gravity,
            settings.gravity_force,
            Arc::clone(&pool),
        );
        let renderer = Renderer::new(Viewport::fit(settings.world_size, settings.window), pool);
        let controller = PhaseController::new(
            settings.lifecycle.clone(),
            target,
            FrameRecorder::new(&settings.out_dir),
        );
        let exporter = VideoExporter::new(&settings.encoder, settings.fps, &settings.video);

        Ok(Self {
            controller,
            solver,
            renderer,
            exporter,
        })
    }

    pub fn controller(&self) -> &PhaseController {
        &self.controller
    }

    pub fn solver(&self) -> &Solver {
        &self.solver
    }

    pub fn viewport(&self) -> &Viewport {
        self.renderer.viewport()
    }

    /// The most recently rendered frame.
    pub fn frame(&self) -> &Frame {
        self.renderer.frame()
    }

    pub fn is_finished(&self) -> bool {
        self.controller.is_terminated()
    }

    /// Run one iteration. Does nothing once finished.
    pub fn advance(&mut self) -> Result<Tick, RecordError> {
        if self.is_finished() {
            return Ok(Tick {
                action: Action::Idle,
                captured: None,
                finished: true,
            });
        }

        let action = self.controller.tick(&mut self.solver);
        self.solver.update(FRAME_DT, self.controller.borders_enabled());
        let frame = self.renderer.render(self.solver.particles());
        let captured = self.controller.capture(frame)?;

        Ok(Tick {
            action,
            captured,
            finished: self.controller.is_terminated(),
        })
    }

    /// Advance until the controller terminates. Returns the number of ticks.
    pub fn run_headless(&mut self) -> Result<u64, RecordError> {
        while !self.advance()?.finished {}
        tracing::info!(
            target: "lifecycle",
            ticks = self.controller.ticks(),
            frames = self.controller.recorded_frames(),
            "sequence finished"
        );
        Ok(self.controller.ticks())
    }

    /// Hand the recorded frames to the encoder.
    pub fn finish(mut self) -> Result<ExitStatus, ExportError> {
        let sequence = self.controller.finish_recording();
        self.exporter.export(&sequence)
    }
}
