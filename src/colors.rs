//! Color buffer shared between the snapshot and the emission presets.
//!
//! Slot `i` belongs to the `i`-th particle in spawn order. Slots stay empty
//! until the snapshot fills them from the target image; empty slots resolve
//! to a rainbow gradient over the buffer so the first growth pass is still
//! colorful.

use image::Rgba;

/// Extra slots beyond the particle capacity.
///
/// Emission presets may overshoot capacity within a single tick.
pub const COLOR_MARGIN: usize = 500;

/// Spawn-order color storage.
#[derive(Clone, Debug)]
pub struct ColorBuffer {
    slots: Vec<Option<Rgba<u8>>>,
}

impl ColorBuffer {
    /// Create an empty buffer for a population of `capacity` particles.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity + COLOR_MARGIN],
        }
    }

    /// Number of slots (capacity plus margin).
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the buffer has no slots at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The stored color at `index`, if the snapshot wrote one.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Rgba<u8>> {
        self.slots.get(index).copied().flatten()
    }

    /// Store a sampled color. Indices past the end are ignored.
    pub fn set(&mut self, index: usize, color: Rgba<u8>) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(color);
        }
    }

    /// Color for the particle spawned at `index`: stored or default.
    pub fn color_for(&self, index: usize) -> Rgba<u8> {
        self.get(index)
            .unwrap_or_else(|| rainbow(index, self.slots.len()))
    }

    /// Number of slots written by the snapshot.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// Hue gradient by position in the buffer.
fn rainbow(index: usize, len: usize) -> Rgba<u8> {
    let hue = index as f32 / len.max(1) as f32;
    let [r, g, b] = hsv_to_rgb(hue, 0.75, 1.0);
    Rgba([to_byte(r), to_byte(g), to_byte(b), 255])
}

fn to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Convert HSV to RGB.
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let c = v * s;
    let x = c * (1.0 - ((h * 6.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match (h * 6.0) as u32 % 6 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    [r + m, g + m, b + m]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_includes_margin() {
        let buffer = ColorBuffer::new(100);
        assert_eq!(buffer.len(), 100 + COLOR_MARGIN);
        assert_eq!(buffer.filled(), 0);
    }

    #[test]
    fn test_set_and_get() {
        let mut buffer = ColorBuffer::new(10);
        let red = Rgba([255, 0, 0, 255]);
        buffer.set(3, red);
        assert_eq!(buffer.get(3), Some(red));
        assert_eq!(buffer.get(4), None);
        assert_eq!(buffer.color_for(3), red);
        assert_eq!(buffer.filled(), 1);
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut buffer = ColorBuffer::new(0);
        buffer.set(COLOR_MARGIN + 10, Rgba([1, 2, 3, 255]));
        assert_eq!(buffer.filled(), 0);
        assert_eq!(buffer.get(COLOR_MARGIN + 10), None);
    }

    #[test]
    fn test_default_colors_vary_by_index() {
        let buffer = ColorBuffer::new(1000);
        assert_ne!(buffer.color_for(0), buffer.color_for(500));
        assert_eq!(buffer.color_for(0)[3], 255);
    }

    #[test]
    fn test_hsv_to_rgb() {
        // Red
        let red = hsv_to_rgb(0.0, 1.0, 1.0);
        assert!((red[0] - 1.0).abs() < 0.001);
        assert!(red[1] < 0.001);
        assert!(red[2] < 0.001);
    }
}
