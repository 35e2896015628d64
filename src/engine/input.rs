// Input state tracking for keyboard and mouse
// Abstracts winit events into a queryable snapshot shared by the controller

use std::collections::HashSet;
use glam::Vec2;
use winit::event::{DeviceEvent, ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Logical actions the character controller reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Forward,
    Back,
    StrafeLeft,
    StrafeRight,
    Interact,
}

/// Physical key → logical action. Several keys may drive the same action
/// (QWERTY, AZERTY and arrow layouts all work without remapping).
const BINDINGS: &[(KeyCode, Action)] = &[
    (KeyCode::KeyW, Action::Forward),
    (KeyCode::KeyZ, Action::Forward),
    (KeyCode::ArrowUp, Action::Forward),
    (KeyCode::KeyS, Action::Back),
    (KeyCode::ArrowDown, Action::Back),
    (KeyCode::KeyA, Action::StrafeLeft),
    (KeyCode::KeyQ, Action::StrafeLeft),
    (KeyCode::ArrowLeft, Action::StrafeLeft),
    (KeyCode::KeyD, Action::StrafeRight),
    (KeyCode::ArrowRight, Action::StrafeRight),
    (KeyCode::KeyE, Action::Interact),
];

pub struct InputState {
    // Keyboard
    keys_held: HashSet<KeyCode>,

    // Mouse: drag only accumulates while the primary button is down
    pointer_down: bool,
    drag: Vec2,

    /// Flip the sign of vertical drag before it reaches the orbit camera.
    pub invert_y: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_held: HashSet::new(),
            pointer_down: false,
            drag: Vec2::ZERO,
            invert_y: false,
        }
    }

    /// Feed a winit WindowEvent into the input state.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => self.press_key(key),
                        ElementState::Released => self.release_key(key),
                    }
                }
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.set_pointer_down(*state == ElementState::Pressed);
            }
            WindowEvent::Focused(false) => self.release_all(),
            _ => {}
        }
    }

    /// Feed a raw device event. Only relative mouse motion is used; the
    /// absolute cursor position is never polled.
    pub fn process_device_event(&mut self, event: &DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.add_pointer_motion(Vec2::new(delta.0 as f32, delta.1 as f32));
        }
    }

    pub fn press_key(&mut self, key: KeyCode) {
        self.keys_held.insert(key);
    }

    pub fn release_key(&mut self, key: KeyCode) {
        self.keys_held.remove(&key);
    }

    pub fn set_pointer_down(&mut self, down: bool) {
        self.pointer_down = down;
    }

    /// Accumulate relative pointer motion. Ignored unless the primary button is held.
    pub fn add_pointer_motion(&mut self, delta: Vec2) {
        if self.pointer_down {
            self.drag += delta;
        }
    }

    /// Drain the drag accumulated since the last call, with the invert toggle applied.
    pub fn take_drag(&mut self) -> Vec2 {
        let mut drag = std::mem::take(&mut self.drag);
        if self.invert_y {
            drag.y = -drag.y;
        }
        drag
    }

    pub fn release_all(&mut self) {
        self.keys_held.clear();
        self.pointer_down = false;
        self.drag = Vec2::ZERO;
    }

    /// True while any key bound to `action` is held.
    pub fn is_action_held(&self, action: Action) -> bool {
        BINDINGS
            .iter()
            .any(|(key, bound)| *bound == action && self.keys_held.contains(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_keys_drive_the_same_action() {
        let mut input = InputState::new();
        input.press_key(KeyCode::KeyZ);
        assert!(input.is_action_held(Action::Forward));

        input.press_key(KeyCode::KeyW);
        input.release_key(KeyCode::KeyZ);
        assert!(input.is_action_held(Action::Forward), "W still held");

        input.release_key(KeyCode::KeyW);
        assert!(!input.is_action_held(Action::Forward));

        input.press_key(KeyCode::KeyQ);
        assert!(input.is_action_held(Action::StrafeLeft));
        assert!(!input.is_action_held(Action::StrafeRight));
    }

    #[test]
    fn drag_requires_primary_button() {
        let mut input = InputState::new();
        input.add_pointer_motion(Vec2::new(10.0, 4.0));
        assert_eq!(input.take_drag(), Vec2::ZERO);

        input.set_pointer_down(true);
        input.add_pointer_motion(Vec2::new(10.0, 4.0));
        input.add_pointer_motion(Vec2::new(-2.0, 1.0));
        assert_eq!(input.take_drag(), Vec2::new(8.0, 5.0));

        // Consumed once
        assert_eq!(input.take_drag(), Vec2::ZERO);
    }

    #[test]
    fn invert_flips_only_vertical() {
        let mut input = InputState::new();
        input.invert_y = true;
        input.set_pointer_down(true);
        input.add_pointer_motion(Vec2::new(3.0, 7.0));
        assert_eq!(input.take_drag(), Vec2::new(3.0, -7.0));
    }

    #[test]
    fn release_all_clears_keys_and_drag() {
        let mut input = InputState::new();
        input.press_key(KeyCode::KeyE);
        input.set_pointer_down(true);
        input.add_pointer_motion(Vec2::ONE);
        input.release_all();
        assert!(!input.is_action_held(Action::Interact));
        assert!(!input.pointer_down);
        assert_eq!(input.take_drag(), Vec2::ZERO);
    }

    #[test]
    fn device_motion_feeds_drag() {
        let mut input = InputState::new();
        input.set_pointer_down(true);
        input.process_device_event(&DeviceEvent::MouseMotion { delta: (2.0, -1.0) });
        assert_eq!(input.take_drag(), Vec2::new(2.0, -1.0));
    }
}
