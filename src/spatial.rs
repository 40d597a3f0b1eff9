//! Uniform-grid broad phase for particle collisions.
//!
//! Particles are bucketed into square cells with a counting sort (cell
//! start offsets plus a flat index list), rebuilt every substep. Candidate
//! pairs come from each cell and half of its neighbours, so every pair is
//! visited once.

use glam::Vec2;

/// Half-neighbourhood offsets: self, right, and the three cells below.
const NEIGHBOURS: [(i32, i32); 5] = [(0, 0), (1, 0), (-1, 1), (0, 1), (1, 1)];

/// Grid layout for a world of a given size.
#[derive(Clone, Copy, Debug)]
pub struct SpatialConfig {
    /// Size of each cell in world units
    pub cell_size: f32,
    /// Number of columns
    pub columns: u32,
    /// Number of rows
    pub rows: u32,
}

impl SpatialConfig {
    /// Cover `world_size` with cells of `cell_size`.
    pub fn covering(world_size: Vec2, cell_size: f32) -> Self {
        let cell_size = cell_size.max(f32::EPSILON);
        Self {
            cell_size,
            columns: (world_size.x / cell_size).ceil().max(1.0) as u32,
            rows: (world_size.y / cell_size).ceil().max(1.0) as u32,
        }
    }

    /// Total number of cells in the grid
    pub fn total_cells(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Cell coordinates for a position. Outside positions clamp to the edge.
    #[inline]
    pub fn cell_of(&self, position: Vec2) -> (u32, u32) {
        let cx = (position.x / self.cell_size).floor();
        let cy = (position.y / self.cell_size).floor();
        (
            clamp_cell(cx, self.columns),
            clamp_cell(cy, self.rows),
        )
    }
}

#[inline]
fn clamp_cell(v: f32, count: u32) -> u32 {
    if v.is_nan() || v <= 0.0 {
        0
    } else {
        (v as u32).min(count - 1)
    }
}

/// Bucketed particle indices.
#[derive(Clone, Debug)]
pub struct CollisionGrid {
    config: SpatialConfig,
    /// `cell_start[c]..cell_start[c + 1]` indexes `entries` for cell `c`.
    cell_start: Vec<u32>,
    entries: Vec<u32>,
}

impl CollisionGrid {
    pub fn new(config: SpatialConfig) -> Self {
        Self {
            config,
            cell_start: vec![0; config.total_cells() + 1],
            entries: Vec::new(),
        }
    }

    /// Re-bucket all positions.
    pub fn rebuild<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = Vec2>,
        I::IntoIter: Clone,
    {
        let positions = positions.into_iter();
        let config = self.config;
        let columns = config.columns as usize;
        let cell_index = |p: Vec2| {
            let (x, y) = config.cell_of(p);
            y as usize * columns + x as usize
        };

        self.cell_start.iter_mut().for_each(|c| *c = 0);
        let mut count = 0usize;
        for p in positions.clone() {
            self.cell_start[cell_index(p) + 1] += 1;
            count += 1;
        }
        for c in 1..self.cell_start.len() {
            self.cell_start[c] += self.cell_start[c - 1];
        }

        self.entries.clear();
        self.entries.resize(count, 0);
        let mut cursor: Vec<u32> = self.cell_start[..self.cell_start.len() - 1].to_vec();
        for (i, p) in positions.enumerate() {
            let c = cell_index(p);
            self.entries[cursor[c] as usize] = i as u32;
            cursor[c] += 1;
        }
    }

    /// Particle indices in cell `(x, y)`.
    #[inline]
    pub fn cell(&self, x: u32, y: u32) -> &[u32] {
        let c = y as usize * self.config.columns as usize + x as usize;
        let start = self.cell_start[c] as usize;
        let end = self.cell_start[c + 1] as usize;
        &self.entries[start..end]
    }

    /// Visit every candidate pair `(a, b)` with `a != b` exactly once.
    pub fn for_each_pair<F: FnMut(usize, usize)>(&self, mut visit: F) {
        let columns = self.config.columns as i32;
        let rows = self.config.rows as i32;
        for y in 0..rows {
            for x in 0..columns {
                let here = self.cell(x as u32, y as u32);
                if here.is_empty() {
                    continue;
                }
                for &(dx, dy) in &NEIGHBOURS {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || nx >= columns || ny >= rows {
                        continue;
                    }
                    if dx == 0 && dy == 0 {
                        for (k, &a) in here.iter().enumerate() {
                            for &b in &here[k + 1..] {
                                visit(a as usize, b as usize);
                            }
                        }
                    } else {
                        let there = self.cell(nx as u32, ny as u32);
                        for &a in here {
                            for &b in there {
                                visit(a as usize, b as usize);
                            }
                        }
                    }
                }
            }
        }
    }
}
