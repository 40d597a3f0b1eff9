//! Windowed host loop.
//!
//! Drives a [`Sequencer`] from the winit event loop: one iteration per
//! redraw, each frame presented through a [`Display`]. When the sequence
//! finishes the display and window are dropped before control returns, so the
//! caller can run the export with the render context already gone.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::display::Display;
use crate::error::{DisplayError, RunError};
use crate::sequencer::Sequencer;

/// Run `sequencer` in a window until it finishes.
///
/// Returns the finished sequencer, ready for [`Sequencer::finish`].
///
/// # Errors
///
/// [`RunError::Interrupted`] if the window is closed first, or whatever
/// stopped the window, display or recorder.
pub fn run(sequencer: Sequencer) -> Result<Sequencer, RunError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App::new(sequencer);
    event_loop.run_app(&mut app)?;
    app.into_result()
}

struct App {
    sequencer: Option<Sequencer>,
    window: Option<Arc<Window>>,
    display: Option<Display>,
    error: Option<RunError>,
    finished: bool,
}

impl App {
    fn new(sequencer: Sequencer) -> Self {
        Self {
            sequencer: Some(sequencer),
            window: None,
            display: None,
            error: None,
            finished: false,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: RunError) {
        tracing::error!(target: "display", %error, "stopping");
        self.error = Some(error);
        self.teardown();
        event_loop.exit();
    }

    fn teardown(&mut self) {
        self.display = None;
        self.window = None;
    }

    fn into_result(self) -> Result<Sequencer, RunError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        match self.sequencer {
            Some(sequencer) if self.finished => Ok(sequencer),
            _ => Err(RunError::Interrupted),
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(sequencer) = &mut self.sequencer else {
            return;
        };
        let tick = match sequencer.advance() {
            Ok(tick) => tick,
            Err(e) => return self.fail(event_loop, e.into()),
        };

        if let Some(display) = &mut self.display {
            match display.present(sequencer.frame()) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => display.reconfigure(),
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    return self.fail(event_loop, DisplayError::Present(wgpu::SurfaceError::OutOfMemory).into());
                }
                Err(e) => tracing::warn!(target: "display", error = %e, "frame skipped"),
            }
        }

        if tick.finished {
            self.finished = true;
            self.teardown();
            event_loop.exit();
        } else if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let Some(sequencer) = &self.sequencer else {
            return;
        };
        let viewport = *sequencer.viewport();

        let window_attrs = Window::default_attributes()
            .with_title("dispersal")
            .with_inner_size(winit::dpi::PhysicalSize::new(viewport.width, viewport.height));
        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        match pollster::block_on(Display::new(window.clone(), (viewport.width, viewport.height))) {
            Ok(display) => self.display = Some(display),
            Err(e) => return self.fail(event_loop, e.into()),
        }
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                tracing::warn!(target: "display", "window closed before the sequence finished");
                self.teardown();
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(display) = &mut self.display {
                    display.resize(physical_size);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}
