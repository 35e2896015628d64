// Core ECS components for the scene
// The controller reads and writes these; rendering only reads them

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};

/// Position and orientation of an entity in 3D space
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Default::default() }
    }

    /// Local +Z expressed in world space. The character walks along this axis.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }
}

/// Marks the entity driven by the character controller. Exactly one is expected.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

/// Minable rock. `remaining` never underflows; a depleted deposit stays in the
/// world for rendering but is no longer eligible for mining.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OreDeposit {
    pub remaining: u32,
    pub capacity: u32,
}

impl OreDeposit {
    pub fn new(amount: u32) -> Self {
        Self { remaining: amount, capacity: amount }
    }

    pub fn is_depleted(&self) -> bool {
        self.remaining == 0
    }

    /// Remove one unit of ore. Returns false if already empty.
    pub fn extract(&mut self) -> bool {
        match self.remaining.checked_sub(1) {
            Some(left) => {
                self.remaining = left;
                true
            }
            None => false,
        }
    }

    /// Fraction of ore left in [0, 1]. Empty deposits with zero capacity report 0.
    pub fn fill_fraction(&self) -> f32 {
        if self.capacity == 0 {
            0.0
        } else {
            self.remaining as f32 / self.capacity as f32
        }
    }
}

/// RGB color for rendering
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Tint {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Tint {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as f32 / 255.0,
            g: ((rgb >> 8) & 0xff) as f32 / 255.0,
            b: (rgb & 0xff) as f32 / 255.0,
        }
    }

    pub fn scaled(self, k: f32) -> Self {
        Self::new(self.r * k, self.g * k, self.b * k)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, 1.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_stops_at_zero() {
        let mut ore = OreDeposit::new(1);
        assert!(ore.extract());
        assert!(ore.is_depleted());
        assert!(!ore.extract());
        assert_eq!(ore.remaining, 0);
    }

    #[test]
    fn forward_follows_rotation() {
        let t = Transform {
            position: Vec3::ZERO,
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        };
        assert!((t.forward() - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn hex_tint() {
        let t = Tint::from_hex(0xff8000);
        assert_eq!(t.r, 1.0);
        assert!((t.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(t.b, 0.0);
    }
}
