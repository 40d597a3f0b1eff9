//! Gravity strategies.
//!
//! A gravity strategy turns a particle position into an acceleration. Exactly
//! one strategy is active in the solver at a time; the lifecycle controller
//! may swap it and scale its force, but never evaluates it itself.
//!
//! | Strategy | Direction | Magnitude |
//! |----------|-----------|-----------|
//! | [`Gravity::Normal`] | +Y (down the image) | constant |
//! | [`Gravity::CentralUneven`] | toward world center | grows with distance |
//! | [`Gravity::CentralUniform`] | toward world center | constant |
//!
//! A negative force flips every strategy, so `CentralUneven` with force `-1`
//! flings particles outward, harder the further out they already are.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Base acceleration in world units per second squared at force `1.0`.
pub const GRAVITY: f32 = 20.0;

/// Acceleration field applied to every particle each substep.
///
/// # Example
///
/// ```ignore
/// let g = Gravity::CentralUniform;
/// let acc = g.acceleration(Vec2::new(10.0, 50.0), Vec2::new(100.0, 100.0), 1.0);
/// assert!(acc.x > 0.0); // pulled toward x = 50
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gravity {
    /// Uniform downward pull.
    #[default]
    Normal,
    /// Pull toward the world center, stronger with distance.
    CentralUneven,
    /// Pull toward the world center with constant strength.
    CentralUniform,
}

impl Gravity {
    /// Every strategy, in command-line index order.
    pub const ALL: [Gravity; 3] = [Gravity::Normal, Gravity::CentralUneven, Gravity::CentralUniform];

    /// Look up a strategy by its command-line index.
    ///
    /// Out-of-range indices fall back to [`Gravity::Normal`].
    pub fn from_index(index: i64) -> Self {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .unwrap_or_default()
    }

    /// Human-readable name, as printed in the startup settings.
    pub fn name(&self) -> &'static str {
        match self {
            Gravity::Normal => "normal",
            Gravity::CentralUneven => "uneven_central",
            Gravity::CentralUniform => "uniform_central",
        }
    }

    /// Acceleration for a particle at `position` in a world of `world_size`.
    pub fn acceleration(&self, position: Vec2, world_size: Vec2, force: f32) -> Vec2 {
        match self {
            Gravity::Normal => Vec2::new(0.0, GRAVITY * force),
            Gravity::CentralUneven => {
                let (direction, distance) = toward_center(position, world_size);
                let reach = (world_size.min_element() * 0.5).max(f32::EPSILON);
                let ratio = distance / reach;
                direction * GRAVITY * force * ratio * ratio
            }
            Gravity::CentralUniform => {
                let (direction, _) = toward_center(position, world_size);
                direction * GRAVITY * force
            }
        }
    }
}

/// Unit vector from `position` to the world center, and the distance to it.
///
/// A particle sitting exactly on the center gets +Y so that it still moves
/// once the force is inverted.
fn toward_center(position: Vec2, world_size: Vec2) -> (Vec2, f32) {
    let offset = world_size * 0.5 - position;
    let distance = offset.length();
    if distance > 1e-4 {
        (offset / distance, distance)
    } else {
        (Vec2::Y, distance.max(1e-4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD: Vec2 = Vec2::new(100.0, 100.0);

    #[test]
    fn test_from_index_clamps() {
        assert_eq!(Gravity::from_index(0), Gravity::Normal);
        assert_eq!(Gravity::from_index(1), Gravity::CentralUneven);
        assert_eq!(Gravity::from_index(2), Gravity::CentralUniform);
        assert_eq!(Gravity::from_index(3), Gravity::Normal);
        assert_eq!(Gravity::from_index(-1), Gravity::Normal);
    }

    #[test]
    fn test_normal_ignores_position() {
        let a = Gravity::Normal.acceleration(Vec2::new(3.0, 4.0), WORLD, 2.0);
        let b = Gravity::Normal.acceleration(Vec2::new(90.0, 10.0), WORLD, 2.0);
        assert_eq!(a, b);
        assert_eq!(a, Vec2::new(0.0, GRAVITY * 2.0));
    }

    #[test]
    fn test_central_uniform_constant_magnitude() {
        let near = Gravity::CentralUniform.acceleration(Vec2::new(45.0, 50.0), WORLD, 1.0);
        let far = Gravity::CentralUniform.acceleration(Vec2::new(0.0, 50.0), WORLD, 1.0);
        assert!((near.length() - far.length()).abs() < 1e-4);
        assert!(near.x > 0.0 && far.x > 0.0);
    }

    #[test]
    fn test_central_uneven_grows_with_distance() {
        let near = Gravity::CentralUneven.acceleration(Vec2::new(45.0, 50.0), WORLD, 1.0);
        let far = Gravity::CentralUneven.acceleration(Vec2::new(5.0, 50.0), WORLD, 1.0);
        assert!(far.length() > near.length() * 10.0);
        assert!(far.x > 0.0);
    }

    #[test]
    fn test_negative_force_pushes_outward() {
        let acc = Gravity::CentralUneven.acceleration(Vec2::new(80.0, 50.0), WORLD, -1.0);
        assert!(acc.x > 0.0, "should point away from center, got {acc:?}");
    }

    #[test]
    fn test_center_still_moves() {
        let acc = Gravity::CentralUniform.acceleration(WORLD * 0.5, WORLD, -1.0);
        assert!(acc.length() > 0.0);
    }
}
