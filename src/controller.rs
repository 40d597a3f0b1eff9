//! Lifecycle phase controller.
//!
//! The controller decides, once per tick, the single lifecycle action for that
//! tick. A run goes through four phases:
//!
//! | Phase | Counter | Ends when |
//! |-------|---------|-----------|
//! | [`Phase::Holding`] | `holding` counts down from the destroy delay while at capacity | it reaches 0: snapshot |
//! | [`Phase::SnapshotDone`] | `settling` counts up while at capacity again | it reaches `collapse_start` (release) or `terminate` |
//! | [`Phase::Collapsing`] | none, gravity force escalates | the population is empty |
//! | [`Phase::Collapsed`] | none | never (absorbing) |
//!
//! Every tick the guards of [`TRANSITIONS`] are evaluated in order against the
//! current population and counters; the first match performs its action and
//! the rest are skipped. No match means no action. The host loop steps physics
//! and renders regardless.
//!
//! Growth, the reverse burst near 70% capacity, and the collapse escalation
//! are all expressed as rows of the same table:
//!
//! ```text
//! 1 reverse           reverse_delay > 0 && population > 0.7 * capacity
//! 2 emit              emitting && population < capacity
//! 3 snapshot          holding == 0
//! 4 release borders   border release enabled && settling == collapse_start
//! 5 terminate         settling == terminate || population == 0
//! 6 escalate          !borders && !emitting
//! 7 count down        population >= capacity && before the terminate threshold
//! ```
//!
//! For logging and tests the two counters are also exposed as one signed
//! value, [`PhaseController::destroy_delay`]: `holding` while holding, then
//! `-1 - settling`, which hits `-(D + 1)` at both thresholds.

use glam::Vec2;

use crate::colors::ColorBuffer;
use crate::emitter::Emitter;
use crate::error::RecordError;
use crate::gravity::Gravity;
use crate::recorder::{FrameRecorder, FrameSequence};
use crate::render::Frame;
use crate::solver::ParticleStore;
use crate::target::TargetImage;

/// Population fraction above which the reverse burst triggers.
pub const REVERSE_THRESHOLD: f32 = 0.7;

/// Per-tick gravity multiplier while collapsing.
pub const ESCALATION: f32 = 1.1;

/// Gravity force applied when the borders are released.
pub const RELEASE_FORCE: f32 = -1.0;

/// Validated lifecycle parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct LifecycleSettings {
    /// Population at which growth stops.
    pub capacity: usize,
    /// Initial emission magnitude `NUM`.
    pub emission: f32,
    /// Emission growth per emit tick `STEP`.
    pub emission_step: f32,
    /// Reverse bursts allowed per cycle `D_r`.
    pub reverse_delay: u32,
    /// Ticks held at capacity before the snapshot, and again before release `D_d`.
    pub destroy_delay: u32,
    /// Release the borders and collapse after the second hold.
    pub release_borders: bool,
    /// Nozzle layout used by every emit.
    pub emitter: Emitter,
}

/// Where a run is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Growing and holding at capacity before the snapshot.
    Holding,
    /// Regrowing with sampled colors.
    SnapshotDone,
    /// Borders released, gravity inverted.
    Collapsing,
    /// Terminated.
    Collapsed,
}

/// What a tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Switched to the reverse nozzles and reset the emission magnitude.
    Reverse,
    /// Spawned a batch of particles.
    Emit,
    /// Sampled the target colors and emptied the world.
    Snapshot,
    /// Opened the borders and inverted gravity.
    ReleaseBorders,
    /// Ended the run.
    Terminate,
    /// Multiplied the outward gravity force.
    Escalate,
    /// Spent one tick of the hold at capacity.
    CountDown,
    /// No guard matched, or the controller has already terminated.
    Idle,
}

impl Action {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Reverse => "reverse",
            Action::Emit => "emit",
            Action::Snapshot => "snapshot",
            Action::ReleaseBorders => "release_borders",
            Action::Terminate => "terminate",
            Action::Escalate => "escalate",
            Action::CountDown => "count_down",
            Action::Idle => "idle",
        }
    }
}

/// One row of the transition table.
pub struct Transition {
    pub action: Action,
    /// Called with the controller and the current population.
    pub guard: fn(&PhaseController, usize) -> bool,
}

/// Transition table in priority order.
pub const TRANSITIONS: [Transition; 7] = [
    Transition { action: Action::Reverse, guard: reverse_due },
    Transition { action: Action::Emit, guard: below_capacity },
    Transition { action: Action::Snapshot, guard: hold_expired },
    Transition { action: Action::ReleaseBorders, guard: collapse_due },
    Transition { action: Action::Terminate, guard: termination_due },
    Transition { action: Action::Escalate, guard: released },
    Transition { action: Action::CountDown, guard: at_capacity },
];

fn reverse_due(c: &PhaseController, population: usize) -> bool {
    c.reverse_delay > 0 && population as f32 > c.settings.capacity as f32 * REVERSE_THRESHOLD
}

fn below_capacity(c: &PhaseController, population: usize) -> bool {
    c.emitting && population < c.settings.capacity
}

fn hold_expired(c: &PhaseController, _population: usize) -> bool {
    c.phase == Phase::Holding && c.holding == 0
}

fn collapse_due(c: &PhaseController, _population: usize) -> bool {
    c.settings.release_borders && c.phase == Phase::SnapshotDone && c.settling == c.collapse_start
}

fn termination_due(c: &PhaseController, population: usize) -> bool {
    (c.phase == Phase::SnapshotDone && c.settling == c.terminate) || population == 0
}

fn released(c: &PhaseController, _population: usize) -> bool {
    !c.borders_enabled && !c.emitting
}

fn at_capacity(c: &PhaseController, population: usize) -> bool {
    population >= c.settings.capacity
        && match c.phase {
            Phase::Holding => true,
            Phase::SnapshotDone => c.settling < c.terminate,
            Phase::Collapsing | Phase::Collapsed => false,
        }
}

/// Owns the lifecycle counters and flags, the color buffer, and the frame
/// recorder.
pub struct PhaseController {
    settings: LifecycleSettings,
    phase: Phase,
    reverse_delay: u32,
    holding: u32,
    settling: u32,
    collapse_start: u32,
    terminate: u32,
    emission: f32,
    emitting: bool,
    reverse: bool,
    borders_enabled: bool,
    colors: ColorBuffer,
    target: Option<TargetImage>,
    recorder: FrameRecorder,
    ticks: u64,
}

impl PhaseController {
    pub fn new(settings: LifecycleSettings, target: TargetImage, recorder: FrameRecorder) -> Self {
        Self {
            phase: Phase::Holding,
            reverse_delay: settings.reverse_delay,
            holding: settings.destroy_delay,
            settling: 0,
            collapse_start: settings.destroy_delay,
            terminate: settings.destroy_delay,
            emission: settings.emission,
            emitting: true,
            reverse: false,
            borders_enabled: true,
            colors: ColorBuffer::new(settings.capacity),
            target: Some(target),
            recorder,
            ticks: 0,
            settings,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_terminated(&self) -> bool {
        self.phase == Phase::Collapsed
    }

    pub fn reverse_delay(&self) -> u32 {
        self.reverse_delay
    }

    /// The holding and settling counters as one signed value.
    ///
    /// Non-negative while holding; `-1` right after the snapshot, then one
    /// lower per count-down and once more at the border release.
    pub fn destroy_delay(&self) -> i64 {
        match self.phase {
            Phase::Holding => i64::from(self.holding),
            _ => -1 - i64::from(self.settling),
        }
    }

    pub fn emission(&self) -> f32 {
        self.emission
    }

    pub fn is_emitting(&self) -> bool {
        self.emitting
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Whether the solver should keep particles inside the world.
    pub fn borders_enabled(&self) -> bool {
        self.borders_enabled
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_active()
    }

    /// Frames captured so far.
    pub fn recorded_frames(&self) -> usize {
        self.recorder.sequence().len()
    }

    pub fn colors(&self) -> &ColorBuffer {
        &self.colors
    }

    /// Ticks evaluated so far, including the terminating one.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick against `store` and return the action taken.
    pub fn tick<S: ParticleStore>(&mut self, store: &mut S) -> Action {
        if self.is_terminated() {
            return Action::Idle;
        }
        self.ticks += 1;
        let population = store.len();
        let action = TRANSITIONS
            .iter()
            .find(|t| (t.guard)(self, population))
            .map_or(Action::Idle, |t| t.action);
        self.apply(action, store);
        tracing::trace!(target: "lifecycle", tick = self.ticks, population, action = action.name());
        action
    }

    fn apply<S: ParticleStore>(&mut self, action: Action, store: &mut S) {
        match action {
            Action::Reverse => {
                if !self.reverse {
                    tracing::info!(target: "lifecycle", tick = self.ticks, population = store.len(), "reverse emission");
                }
                self.reverse = true;
                self.reverse_delay -= 1;
                self.emission = self.settings.emission;
            }
            Action::Emit => {
                let spawned = self.settings.emitter.spawn(store, &self.colors, self.emission, self.reverse);
                tracing::trace!(target: "lifecycle", tick = self.ticks, spawned, magnitude = self.emission, "emit");
                self.emission += self.settings.emission_step;
            }
            Action::Snapshot => self.snapshot(store),
            Action::ReleaseBorders => {
                self.borders_enabled = false;
                self.emitting = false;
                store.set_gravity_force(RELEASE_FORCE);
                store.set_gravity(Gravity::CentralUneven);
                self.settling += 1;
                self.phase = Phase::Collapsing;
                tracing::info!(target: "lifecycle", tick = self.ticks, population = store.len(), "borders released, collapsing");
            }
            Action::Terminate => {
                self.phase = Phase::Collapsed;
                tracing::info!(
                    target: "lifecycle",
                    tick = self.ticks,
                    population = store.len(),
                    destroy_delay = self.destroy_delay(),
                    "terminated"
                );
            }
            Action::Escalate => {
                let force = store.gravity_force() * ESCALATION;
                store.set_gravity_force(force);
                tracing::trace!(target: "lifecycle", tick = self.ticks, force, "escalate");
            }
            Action::CountDown => {
                match self.phase {
                    Phase::Holding => self.holding -= 1,
                    _ => self.settling += 1,
                }
                tracing::trace!(target: "lifecycle", tick = self.ticks, destroy_delay = self.destroy_delay(), "count down");
            }
            Action::Idle => {}
        }
    }

    /// Sample the target under every particle, then start over empty.
    fn snapshot<S: ParticleStore>(&mut self, store: &mut S) {
        let population = store.len();
        if let Some(target) = self.target.take() {
            let world: Vec2 = store.world_size();
            for i in 0..population {
                self.colors.set(i, target.sample(store.position(i), world));
            }
        }
        store.clear();
        self.emission = self.settings.emission;
        self.phase = Phase::SnapshotDone;
        self.settling = 0;
        self.reverse_delay = self.settings.reverse_delay;
        self.reverse = false;
        self.recorder.activate();
        tracing::info!(
            target: "lifecycle",
            tick = self.ticks,
            sampled = population,
            "snapshot taken, population cleared"
        );
    }

    /// Capture `frame` if recording.
    pub fn capture(&mut self, frame: &Frame) -> Result<Option<u64>, RecordError> {
        self.recorder.capture(frame)
    }

    /// Stop recording and hand over the captured frames.
    pub fn finish_recording(&mut self) -> FrameSequence {
        self.recorder.finish()
    }
}
