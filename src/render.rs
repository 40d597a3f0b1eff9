//! Software particle renderer.
//!
//! Particles are drawn as filled discs into an RGBA [`Frame`]. The frame is
//! cut into horizontal bands; particles are bucketed by the bands their disc
//! touches and the bands are rasterized in parallel on the worker pool.
//! Frames are plain images so the same pixels can be presented in a window
//! and written to disk by the recorder.

use std::sync::Arc;

use glam::Vec2;
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::solver::{Particle, PARTICLE_RADIUS};

/// A rendered frame.
pub type Frame = RgbaImage;

/// Pixel margin kept around the world when fitting it to the window.
pub const VIEW_MARGIN: f32 = 1.5;

/// Rows per parallel band.
const BAND_ROWS: u32 = 16;

/// Smallest disc radius in pixels, so every particle covers a pixel center.
const MIN_RADIUS_PX: f32 = 0.75;

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Maps world coordinates to frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixels per world unit.
    pub zoom: f32,
    /// World point drawn at the frame center.
    pub focus: Vec2,
}

impl Viewport {
    /// Fit `world_size` into a frame whose longest side is `longest_side`
    /// pixels, keeping the world's aspect ratio.
    pub fn fit(world_size: Vec2, longest_side: u32) -> Self {
        let longest = longest_side.max(1) as f32;
        let (width, height) = if world_size.x >= world_size.y {
            (longest, longest * world_size.y / world_size.x)
        } else {
            (longest * world_size.x / world_size.y, longest)
        };
        let width = (width.round() as u32).max(1);
        let height = (height.round() as u32).max(1);
        let zoom = ((height as f32 - VIEW_MARGIN) / world_size.y).max(f32::EPSILON);
        Self {
            width,
            height,
            zoom,
            focus: world_size * 0.5,
        }
    }

    /// Pixel position of a world point.
    #[inline]
    pub fn to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.focus) * self.zoom + Vec2::new(self.width as f32, self.height as f32) * 0.5
    }
}

pub struct Renderer {
    viewport: Viewport,
    frame: Frame,
    bands: Vec<Vec<u32>>,
    pool: Arc<ThreadPool>,
}

impl Renderer {
    pub fn new(viewport: Viewport, pool: Arc<ThreadPool>) -> Self {
        let band_count = viewport.height.div_ceil(BAND_ROWS) as usize;
        Self {
            frame: Frame::from_pixel(viewport.width, viewport.height, BACKGROUND),
            bands: vec![Vec::new(); band_count],
            viewport,
            pool,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// The most recently rendered frame.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Draw `particles` over a cleared frame.
    pub fn render(&mut self, particles: &[Particle]) -> &Frame {
        let viewport = self.viewport;
        let radius = (PARTICLE_RADIUS * viewport.zoom).max(MIN_RADIUS_PX);

        for band in &mut self.bands {
            band.clear();
        }
        let last_band = self.bands.len().saturating_sub(1) as i64;
        for (i, p) in particles.iter().enumerate() {
            let center = viewport.to_screen(p.position);
            let top = ((center.y - radius).floor() as i64).max(0);
            let bottom = ((center.y + radius).ceil() as i64).min(viewport.height as i64 - 1);
            if top > bottom || center.x + radius < 0.0 || center.x - radius > viewport.width as f32 {
                continue;
            }
            let first = (top / BAND_ROWS as i64).min(last_band);
            let last = (bottom / BAND_ROWS as i64).min(last_band);
            for band in first..=last {
                self.bands[band as usize].push(i as u32);
            }
        }

        let row_bytes = viewport.width as usize * 4;
        let bands = &self.bands;
        let buffer: &mut [u8] = &mut self.frame;
        self.pool.install(|| {
            buffer
                .par_chunks_mut(row_bytes * BAND_ROWS as usize)
                .zip(bands.par_iter())
                .enumerate()
                .for_each(|(b, (chunk, members))| {
                    for px in chunk.chunks_exact_mut(4) {
                        px.copy_from_slice(&BACKGROUND.0);
                    }
                    let y0 = b as u32 * BAND_ROWS;
                    for &i in members {
                        let p = &particles[i as usize];
                        draw_disc(chunk, y0, &viewport, viewport.to_screen(p.position), radius, p.color);
                    }
                });
        });
        &self.frame
    }
}

/// Fill the pixels of one band whose centers fall inside the disc.
fn draw_disc(chunk: &mut [u8], y0: u32, viewport: &Viewport, center: Vec2, radius: f32, color: Rgba<u8>) {
    let row_bytes = viewport.width as usize * 4;
    let rows = (chunk.len() / row_bytes) as u32;
    let r2 = radius * radius;
    let y_start = ((center.y - radius).floor().max(y0 as f32)) as u32;
    let y_end = ((center.y + radius).ceil().min((y0 + rows) as f32)) as u32;
    for y in y_start..y_end {
        let dy = y as f32 + 0.5 - center.y;
        let span2 = r2 - dy * dy;
        if span2 < 0.0 {
            continue;
        }
        let span = span2.sqrt();
        let x_start = (center.x - span - 0.5).ceil().max(0.0) as u32;
        let x_end = ((center.x + span - 0.5).floor() + 1.0).clamp(0.0, viewport.width as f32) as u32;
        let row = (y - y0) as usize * row_bytes;
        for x in x_start..x_end {
            let at = row + x as usize * 4;
            chunk[at..at + 4].copy_from_slice(&color.0);
        }
    }
}
