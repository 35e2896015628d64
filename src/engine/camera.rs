// Third-person orbit camera
//
// Camera model:
//   - An offset vector from the character to the camera eye
//   - Horizontal drag yaws the offset around world up
//   - Vertical drag tilts the offset around the horizontal axis perpendicular to it,
//     refused when it would pass within `pole_margin` of straight up/down
//   - The offset is rotated in place every frame, never rebuilt from angles,
//     so its length never changes

use bevy_ecs::prelude::*;
use glam::{Mat4, Quat, Vec2, Vec3};

const DEGENERATE_EPSILON: f32 = 1e-6;

pub struct OrbitCamera {
    /// Camera eye relative to the character anchor.
    /// Private: only mutated by drag rotation. Use offset() to read.
    offset: Vec3,

    /// Radians of rotation per unit of pointer movement
    pub sensitivity: f32,

    /// Elevation magnitude must stay strictly below PI/2 - pole_margin
    pub pole_margin: f32,
}

impl OrbitCamera {
    pub fn new(offset: Vec3, sensitivity: f32, pole_margin: f32) -> Self {
        Self { offset, sensitivity, pole_margin }
    }

    pub fn offset(&self) -> Vec3 { self.offset }

    pub fn max_elevation(&self) -> f32 {
        std::f32::consts::FRAC_PI_2 - self.pole_margin
    }

    /// Elevation of the offset above the ground plane, in radians.
    pub fn elevation(&self) -> f32 {
        let len = self.offset.length();
        if len < DEGENERATE_EPSILON {
            return 0.0;
        }
        (self.offset.y / len).clamp(-1.0, 1.0).asin()
    }

    /// Rotate the offset by one frame's worth of pointer drag.
    /// Positive x drag swings the camera clockwise seen from above;
    /// positive y drag lowers it.
    pub fn apply_drag(&mut self, drag: Vec2) {
        if drag == Vec2::ZERO || self.offset.length_squared() < DEGENERATE_EPSILON {
            return;
        }

        let yaw = Quat::from_axis_angle(Vec3::Y, -drag.x * self.sensitivity);
        self.offset = yaw * self.offset;

        if drag.y == 0.0 {
            return;
        }

        let pitch = -drag.y * self.sensitivity;
        let candidate = self.elevation() + pitch;
        if candidate.abs() >= self.max_elevation() {
            return;
        }

        // Straight above/below the anchor there is no horizontal direction to tilt around.
        let horizontal = Vec3::new(self.offset.x, 0.0, self.offset.z);
        if horizontal.length_squared() < DEGENERATE_EPSILON {
            return;
        }
        let axis = horizontal.normalize().cross(Vec3::Y).normalize();
        self.offset = Quat::from_axis_angle(axis, pitch) * self.offset;
    }
}

/// World-space camera transform written by the locomotion solver each tick.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    pub position: Vec3,
    pub look_target: Vec3,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            look_target: Vec3::ZERO,
        }
    }
}

impl CameraRig {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.look_target, Vec3::Y)
    }

    pub fn view_projection(&self, fov: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh(fov, aspect, near, far) * self.view_matrix()
    }
}
