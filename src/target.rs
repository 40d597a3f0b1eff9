//! Target image loading and sampling.
//!
//! The target image is decoded once at startup. During the snapshot every
//! live particle looks up the pixel under its world position; the resulting
//! colors become the particles' colors on the second growth pass.
//!
//! # Supported Formats
//!
//! - PNG
//! - JPEG

use std::path::Path;

use glam::Vec2;
use image::{Rgba, RgbaImage};

use crate::error::TargetImageError;

/// Decoded target image, stored as RGBA8.
#[derive(Debug, Clone)]
pub struct TargetImage {
    pixels: RgbaImage,
}

impl TargetImage {
    /// Load the target image from a file.
    ///
    /// # Errors
    ///
    /// Fails if the path is empty, the file cannot be decoded, or the image
    /// has no pixels.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TargetImageError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(TargetImageError::Missing);
        }
        let pixels = image::open(path)
            .map_err(|source| TargetImageError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .into_rgba8();
        Self::from_rgba(pixels)
    }

    /// Wrap already-decoded pixels.
    ///
    /// # Errors
    ///
    /// [`TargetImageError::Empty`] if either dimension is zero.
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self, TargetImageError> {
        let (width, height) = pixels.dimensions();
        if width == 0 || height == 0 {
            return Err(TargetImageError::Empty { width, height });
        }
        Ok(Self { pixels })
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Pixel coordinates under a world position.
    ///
    /// `pixel = floor(world * image_size / world_size)`, clamped to the image
    /// so particles pressed against or past the border sample the edge.
    pub fn pixel_at(&self, position: Vec2, world_size: Vec2) -> (u32, u32) {
        let kx = self.width() as f32 / world_size.x;
        let ky = self.height() as f32 / world_size.y;
        (
            clamp_axis(position.x * kx, self.width()),
            clamp_axis(position.y * ky, self.height()),
        )
    }

    /// Color under a world position.
    pub fn sample(&self, position: Vec2, world_size: Vec2) -> Rgba<u8> {
        let (x, y) = self.pixel_at(position, world_size);
        *self.pixels.get_pixel(x, y)
    }
}

fn clamp_axis(v: f32, size: u32) -> u32 {
    if !v.is_finite() || v <= 0.0 {
        return 0;
    }
    (v.floor() as u32).min(size - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> TargetImage {
        // 4x2: left half red, right half blue, bottom-right pixel green
        let mut img = RgbaImage::from_pixel(4, 2, Rgba([255, 0, 0, 255]));
        for y in 0..2 {
            for x in 2..4 {
                img.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        img.put_pixel(3, 1, Rgba([0, 255, 0, 255]));
        TargetImage::from_rgba(img).unwrap()
    }

    #[test]
    fn test_pixel_mapping_scales_by_ratio() {
        let target = checker();
        let world = Vec2::new(40.0, 20.0);
        // kx = 4/40 = 0.1, ky = 2/20 = 0.1
        assert_eq!(target.pixel_at(Vec2::new(0.0, 0.0), world), (0, 0));
        assert_eq!(target.pixel_at(Vec2::new(19.9, 9.9), world), (1, 0));
        assert_eq!(target.pixel_at(Vec2::new(20.0, 10.0), world), (2, 1));
        assert_eq!(target.pixel_at(Vec2::new(35.0, 15.0), world), (3, 1));
    }

    #[test]
    fn test_out_of_bounds_clamps() {
        let target = checker();
        let world = Vec2::new(40.0, 20.0);
        assert_eq!(target.pixel_at(Vec2::new(-5.0, -1.0), world), (0, 0));
        assert_eq!(target.pixel_at(Vec2::new(40.0, 20.0), world), (3, 1));
        assert_eq!(target.pixel_at(Vec2::new(1e9, 1e9), world), (3, 1));
        assert_eq!(target.pixel_at(Vec2::new(f32::NAN, 5.0), world), (0, 0));
    }

    #[test]
    fn test_sample() {
        let target = checker();
        let world = Vec2::new(40.0, 20.0);
        assert_eq!(target.sample(Vec2::new(5.0, 5.0), world), Rgba([255, 0, 0, 255]));
        assert_eq!(target.sample(Vec2::new(25.0, 5.0), world), Rgba([0, 0, 255, 255]));
        assert_eq!(target.sample(Vec2::new(39.0, 19.0), world), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_from_rgba_rejects_empty_images() {
        for (w, h) in [(0, 0), (0, 3), (3, 0)] {
            assert!(matches!(
                TargetImage::from_rgba(RgbaImage::new(w, h)),
                Err(TargetImageError::Empty { width, height }) if width == w && height == h
            ));
        }
        assert!(TargetImage::from_rgba(RgbaImage::new(1, 1)).is_ok());
    }

    #[test]
    fn test_open_missing_path() {
        assert!(matches!(TargetImage::open(""), Err(TargetImageError::Missing)));
    }

    #[test]
    fn test_open_undecodable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(matches!(
            TargetImage::open(&path),
            Err(TargetImageError::Decode { .. })
        ));
    }

    #[test]
    fn test_open_roundtrip_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.png");
        RgbaImage::from_pixel(3, 5, Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        let target = TargetImage::open(&path).unwrap();
        assert_eq!((target.width(), target.height()), (3, 5));
    }
}
