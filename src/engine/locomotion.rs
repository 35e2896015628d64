// Character locomotion and facing
//
// Per tick:
//   1. Forward/back keys move the character along its own forward axis
//   2. Strafe keys move it along a camera-relative right vector
//   3. The camera eases toward character + orbit offset and looks at eye height
//   4. The character eases toward facing directly away from the camera

use glam::{Quat, Vec3};
use serde::Deserialize;

use super::camera::CameraRig;
use super::components::Transform;
use super::input::{Action, InputState};

const DEGENERATE_EPSILON: f32 = 1e-6;

/// Equivalent to a fixed 0.1 factor per tick at 60 Hz: -ln(0.9) * 60.
pub const DEFAULT_SMOOTHING_RATE: f32 = 6.3216;

/// How much of the remaining gap the camera and facing close each tick.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Smoothing {
    /// Constant fraction per tick regardless of frame time. Matches the
    /// behaviour of frame-locked scenes exactly, but speeds up with the frame rate.
    Fixed { factor: f32 },
    /// `1 - exp(-rate * dt)`: the same convergence at any frame rate.
    TimeScaled { rate: f32 },
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing::TimeScaled { rate: DEFAULT_SMOOTHING_RATE }
    }
}

impl Smoothing {
    pub fn factor(&self, dt: f32) -> f32 {
        match *self {
            Smoothing::Fixed { factor } => factor.clamp(0.0, 1.0),
            Smoothing::TimeScaled { rate } => (1.0 - (-rate * dt.max(0.0)).exp()).clamp(0.0, 1.0),
        }
    }
}

/// What the movement keys ask for this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intent {
    pub moving: bool,
    pub turning: bool,
}

impl Intent {
    pub fn from_input(input: &InputState) -> Self {
        Self {
            moving: input.is_action_held(Action::Forward) || input.is_action_held(Action::Back),
            turning: input.is_action_held(Action::StrafeLeft)
                || input.is_action_held(Action::StrafeRight),
        }
    }

    /// Drives the walk/idle animation choice.
    pub fn is_active(&self) -> bool {
        self.moving || self.turning
    }
}

pub struct LocomotionSolver {
    /// World units per second
    pub speed: f32,
    /// Height above the character origin the camera looks at
    pub eye_height: f32,
    pub smoothing: Smoothing,
}

impl LocomotionSolver {
    pub fn new(speed: f32, eye_height: f32, smoothing: Smoothing) -> Self {
        Self { speed, eye_height, smoothing }
    }

    /// Apply movement keys to the character position.
    /// Strafing is relative to the camera, so orbiting changes the strafe direction.
    pub fn translate(
        &self,
        input: &InputState,
        character: &mut Transform,
        camera_position: Vec3,
        dt: f32,
    ) {
        let step = self.speed * dt;
        let forward = character.forward();

        if input.is_action_held(Action::Forward) { character.position += forward * step; }
        if input.is_action_held(Action::Back) { character.position -= forward * step; }

        // Camera directly above the character yields no horizontal right vector;
        // strafing is skipped for that tick.
        let right = Vec3::Y
            .cross(character.position - camera_position)
            .normalize_or_zero();

        if input.is_action_held(Action::StrafeLeft) { character.position += right * step; }
        if input.is_action_held(Action::StrafeRight) { character.position -= right * step; }
    }

    /// Ease the camera toward `character + offset` and aim it at eye height.
    pub fn follow(&self, character: &Transform, offset: Vec3, rig: &mut CameraRig, dt: f32) {
        let goal = character.position + offset;
        rig.position = rig.position.lerp(goal, self.smoothing.factor(dt));
        rig.look_target = character.position + Vec3::Y * self.eye_height;
    }

    /// Turn the character toward facing away from the camera on the ground plane.
    /// Returns false (and leaves the rotation untouched) when the camera sits
    /// directly above or on the character.
    pub fn face(&self, character: &mut Transform, camera_position: Vec3, dt: f32) -> bool {
        let mut look = camera_position - character.position;
        look.y = 0.0;
        if look.length_squared() < DEGENERATE_EPSILON {
            return false;
        }
        let look = look.normalize();
        let yaw = look.x.atan2(look.z);
        let goal = Quat::from_rotation_y(yaw + std::f32::consts::PI);
        character.rotation = character
            .rotation
            .slerp(goal, self.smoothing.factor(dt))
            .normalize();
        true
    }
}
