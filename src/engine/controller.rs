// Top-level character controller: owns every per-character subsystem and runs
// them in a fixed order once per frame.
//
//   orbit drag → mining stages due → interact request → locomotion (unless locked)
//   → camera follow → facing (unless locked) → animation → proximity + HUD

use bevy_ecs::prelude::*;

use super::animation::{AnimationMixer, AnimationStateMachine};
use super::camera::{CameraRig, OrbitCamera};
use super::components::Transform;
use super::config::ControllerConfig;
use super::hud::{format_position, format_rotation, UiSink};
use super::input::{Action, InputState};
use super::locomotion::{Intent, LocomotionSolver};
use super::mining::{MiningController, MiningEvent, MiningStage};
use super::proximity::ProximityReporter;
use super::scene;

pub struct CharacterController {
    orbit: OrbitCamera,
    locomotion: LocomotionSolver,
    animation: AnimationStateMachine,
    mining: MiningController,
    proximity: ProximityReporter,
    /// Movement keys held on the last unlocked tick
    walking: bool,
}

impl CharacterController {
    pub fn new(config: &ControllerConfig, mixer: AnimationMixer) -> Self {
        Self {
            orbit: OrbitCamera::new(
                config.camera.initial_offset,
                config.camera.sensitivity,
                config.camera.pole_margin,
            ),
            locomotion: LocomotionSolver::new(
                config.locomotion.speed,
                config.locomotion.eye_height,
                config.locomotion.smoothing,
            ),
            animation: AnimationStateMachine::new(mixer, &config.animation),
            mining: MiningController::new(&config.mining),
            proximity: ProximityReporter::new(config.proximity.collision_radius),
            walking: false,
        }
    }

    /// Build with the clip set listed in the config.
    pub fn from_config(config: &ControllerConfig) -> Self {
        let mut mixer = AnimationMixer::new();
        for clip in &config.animation.clips {
            mixer.add_clip(clip.name.as_str(), clip.duration);
        }
        Self::new(config, mixer)
    }

    pub fn animation(&self) -> &AnimationStateMachine { &self.animation }

    /// Movement and facing are frozen while a mining session exists.
    pub fn is_locked(&self) -> bool {
        self.mining.is_active()
    }

    pub fn activity(&self) -> &'static str {
        match self.mining.session().map(|s| s.stage) {
            Some(MiningStage::Extracting) => "Mining",
            Some(MiningStage::Celebrating) => "Rock emptied!",
            None if self.walking => "Walking",
            None => "Idle",
        }
    }

    /// Run one frame. Does nothing until the player and camera rig exist.
    pub fn tick(&mut self, world: &mut World, input: &mut InputState, ui: &mut dyn UiSink, dt: f32) {
        let Some((player, mut character)) = scene::player_transform(world) else {
            return;
        };
        let Some(mut rig) = world.get_resource::<CameraRig>().copied() else {
            return;
        };

        self.orbit.apply_drag(input.take_drag());

        for event in self.mining.advance(dt, world) {
            self.on_mining_event(event);
        }

        if !self.is_locked() && input.is_action_held(Action::Interact) {
            let nodes = scene::resource_nodes(world);
            if let Some(event) = self.mining.try_start(character.position, &nodes) {
                self.on_mining_event(event);
            }
        }

        self.walking = !self.is_locked() && Intent::from_input(input).is_active();
        if !self.is_locked() {
            self.animation.set_locomotion_active(self.walking);
            self.locomotion.translate(input, &mut character, rig.position, dt);
        }
        self.locomotion.follow(&character, self.orbit.offset(), &mut rig, dt);
        if !self.is_locked() {
            self.locomotion.face(&mut character, rig.position, dt);
        }

        self.animation.update(dt);

        if let Some(mut transform) = world.get_mut::<Transform>(player) {
            *transform = character;
        }
        world.insert_resource(rig);

        let rocks: Vec<_> = scene::resource_nodes(world).iter().map(|n| n.position).collect();
        let report = self.proximity.update(character.position, rocks);
        ui.show_nearest_distance(report.nearest);
        if let Some(edge) = report.edge {
            ui.collision_changed(edge);
        }
        ui.show_transform(
            &format_position(character.position),
            &format_rotation(character.rotation),
        );
        ui.show_activity(self.activity());
        if let Some(clip) = self.animation.current_clip_name() {
            ui.show_animation(clip, self.animation.is_ambient());
        }
    }

    fn on_mining_event(&mut self, event: MiningEvent) {
        match event {
            MiningEvent::Started { .. } => self.animation.begin_mining(),
            MiningEvent::Finished { depleted, .. } => self.animation.finish_mining(depleted),
            MiningEvent::Released { .. } => self.animation.release_success(),
            MiningEvent::Extracted { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::animation::AnimState;
    use crate::engine::components::{OreDeposit, Player};
    use crate::engine::config::ResourceSpec;
    use crate::engine::proximity::CollisionEdge;
    use glam::{Vec2, Vec3};
    use winit::keyboard::KeyCode;

    const DT: f32 = 0.05;

    #[derive(Default)]
    struct Recorder {
        transforms: usize,
        distances: Vec<Option<f32>>,
        edges: Vec<CollisionEdge>,
    }

    impl UiSink for Recorder {
        fn show_transform(&mut self, _position: &str, _rotation: &str) {
            self.transforms += 1;
        }
        fn show_nearest_distance(&mut self, distance: Option<f32>) {
            self.distances.push(distance);
        }
        fn collision_changed(&mut self, edge: CollisionEdge) {
            self.edges.push(edge);
        }
    }

    struct Harness {
        world: World,
        input: InputState,
        ui: Recorder,
        controller: CharacterController,
        player: Entity,
    }

    impl Harness {
        fn new(rocks: &[(Vec3, u32)]) -> Self {
            let mut config = ControllerConfig::default();
            config.resources = rocks
                .iter()
                .map(|&(position, ore)| ResourceSpec { position, ore })
                .collect();
            let mut world = World::new();
            let player = scene::spawn_scene(&mut world, &config);
            Self {
                world,
                input: InputState::new(),
                ui: Recorder::default(),
                controller: CharacterController::from_config(&config),
                player,
            }
        }

        fn tick(&mut self) {
            self.controller.tick(&mut self.world, &mut self.input, &mut self.ui, DT);
        }

        /// Tick for `seconds`, returning every animation state seen along the way.
        fn run(&mut self, seconds: f32) -> Vec<Option<AnimState>> {
            let steps = (seconds / DT).round() as usize;
            (0..steps)
                .map(|_| {
                    self.tick();
                    self.controller.animation().state()
                })
                .collect()
        }

        fn position(&self) -> Vec3 {
            self.world.get::<Transform>(self.player).unwrap().position
        }

        fn ore(&mut self) -> u32 {
            let mut query = self.world.query::<&OreDeposit>();
            query.iter(&self.world).map(|o| o.remaining).sum()
        }

        fn interact_once(&mut self) {
            self.input.press_key(KeyCode::KeyE);
            self.tick();
            self.input.release_key(KeyCode::KeyE);
        }
    }

    #[test]
    fn tick_without_player_is_noop() {
        let mut world = World::new();
        world.insert_resource(CameraRig::default());
        let mut controller = CharacterController::from_config(&ControllerConfig::default());
        let mut ui = Recorder::default();
        controller.tick(&mut world, &mut InputState::new(), &mut ui, DT);
        assert_eq!(ui.transforms, 0);
        assert!(ui.distances.is_empty());
    }

    #[test]
    fn tick_without_camera_rig_is_noop() {
        let mut world = World::new();
        world.spawn((Transform::default(), Player));
        let mut controller = CharacterController::from_config(&ControllerConfig::default());
        let mut ui = Recorder::default();
        controller.tick(&mut world, &mut InputState::new(), &mut ui, DT);
        assert_eq!(ui.transforms, 0);
    }

    #[test]
    fn walking_moves_and_animates() {
        let mut h = Harness::new(&[(Vec3::new(20.0, 0.0, 20.0), 1)]);
        // Let the camera settle behind the character first
        h.run(3.0);
        let start = h.position();

        h.input.press_key(KeyCode::KeyW);
        h.run(1.0);
        assert_eq!(h.controller.animation().state(), Some(AnimState::Walking));
        assert_eq!(h.controller.activity(), "Walking");
        assert!(h.position().distance(start) > 4.0);

        h.input.release_key(KeyCode::KeyW);
        h.run(0.5);
        assert_eq!(h.controller.animation().state(), Some(AnimState::Idle));
        assert_eq!(h.controller.activity(), "Idle");
    }

    #[test]
    fn last_ore_mined_shows_success_then_idle() {
        let mut h = Harness::new(&[(Vec3::new(1.0, 0.0, 0.0), 1)]);
        h.interact_once();
        assert_eq!(h.controller.animation().state(), Some(AnimState::Mining));
        assert!(h.controller.is_locked());

        h.run(1.0);
        assert_eq!(h.controller.animation().state(), Some(AnimState::Mining));
        assert_eq!(h.ore(), 1);

        h.run(1.5);
        assert_eq!(h.controller.animation().state(), Some(AnimState::Success));
        assert_eq!(h.controller.activity(), "Rock emptied!");
        assert_eq!(h.ore(), 0);
        assert!(h.controller.is_locked());

        h.run(2.0);
        assert_eq!(h.controller.animation().state(), Some(AnimState::Idle));
        assert!(!h.controller.is_locked());
        assert_eq!(h.ore(), 0);
    }

    #[test]
    fn ore_left_returns_straight_to_idle() {
        let mut h = Harness::new(&[(Vec3::new(1.0, 0.0, 0.0), 5)]);
        h.interact_once();
        let seen = h.run(3.0);
        assert!(!seen.contains(&Some(AnimState::Success)));
        assert_eq!(h.controller.animation().state(), Some(AnimState::Idle));
        assert_eq!(h.ore(), 4);
        assert!(!h.controller.is_locked());
    }

    #[test]
    fn interact_during_session_is_ignored() {
        let mut h = Harness::new(&[(Vec3::new(1.0, 0.0, 0.0), 5)]);
        h.interact_once();
        h.run(1.0);
        h.interact_once();
        h.run(2.0);
        assert_eq!(h.ore(), 4);
        assert!(!h.controller.is_locked());
    }

    #[test]
    fn movement_locked_while_mining() {
        let mut h = Harness::new(&[(Vec3::new(1.0, 0.0, 0.0), 5)]);
        h.interact_once();
        let start = h.position();

        for key in [KeyCode::KeyW, KeyCode::KeyA, KeyCode::ArrowDown, KeyCode::KeyD] {
            h.input.press_key(key);
        }
        h.run(1.5);
        assert_eq!(h.position(), start);
        assert_eq!(h.controller.animation().state(), Some(AnimState::Mining));

        // Released after the extraction stage; W alone now moves the character.
        for key in [KeyCode::KeyA, KeyCode::ArrowDown, KeyCode::KeyD] {
            h.input.release_key(key);
        }
        h.run(1.0);
        assert!(!h.controller.is_locked());
        assert_ne!(h.position(), start);
    }

    #[test]
    fn out_of_reach_interact_does_nothing() {
        let mut h = Harness::new(&[(Vec3::new(5.0, 0.0, 5.0), 5)]);
        h.interact_once();
        assert!(!h.controller.is_locked());
        assert_eq!(h.controller.animation().state(), Some(AnimState::Idle));
    }

    #[test]
    fn proximity_reports_distance_and_single_enter() {
        let mut h = Harness::new(&[]);
        h.tick();
        let nearest = h.ui.distances.last().copied().flatten().unwrap();
        assert!((nearest - 50f32.sqrt()).abs() < 1e-4);
        assert!(h.ui.edges.is_empty());

        h.world.get_mut::<Transform>(h.player).unwrap().position = Vec3::new(5.0, 0.0, 5.0);
        h.run(1.0);
        let nearest = h.ui.distances.last().copied().flatten().unwrap();
        assert!(nearest.abs() < 1e-5);
        assert_eq!(h.ui.edges, vec![CollisionEdge::Entered]);

        h.world.get_mut::<Transform>(h.player).unwrap().position = Vec3::ZERO;
        h.run(0.5);
        assert_eq!(h.ui.edges, vec![CollisionEdge::Entered, CollisionEdge::Exited]);
    }

    #[test]
    fn ambient_mode_still_reports_walking() {
        let mut config = ControllerConfig::default();
        config.resources = vec![ResourceSpec { position: Vec3::new(20.0, 0.0, 20.0), ore: 1 }];
        let mut world = World::new();
        scene::spawn_scene(&mut world, &config);
        let mut mixer = AnimationMixer::new();
        mixer.add_clip("Dance", 2.0);
        let mut controller = CharacterController::new(&config, mixer);
        let mut input = InputState::new();
        let mut ui = Recorder::default();
        assert!(controller.animation().is_ambient());

        input.press_key(KeyCode::KeyW);
        controller.tick(&mut world, &mut input, &mut ui, DT);
        assert_eq!(controller.animation().state(), None);
        assert_eq!(controller.activity(), "Walking");

        input.release_key(KeyCode::KeyW);
        controller.tick(&mut world, &mut input, &mut ui, DT);
        assert_eq!(controller.activity(), "Idle");
    }

    #[test]
    fn drag_orbits_camera_without_changing_radius() {
        let mut h = Harness::new(&[]);
        let radius = h.controller.orbit.offset().length();
        let before = h.controller.orbit.offset();
        h.input.set_pointer_down(true);
        h.input.add_pointer_motion(Vec2::new(120.0, -30.0));
        h.tick();
        let after = h.controller.orbit.offset();
        assert_ne!(before, after);
        assert!((after.length() - radius).abs() < 1e-3);
    }

    #[test]
    fn camera_follows_and_looks_at_eye_height() {
        let mut h = Harness::new(&[]);
        h.run(5.0);
        let rig = *h.world.resource::<CameraRig>();
        let goal = h.position() + h.controller.orbit.offset();
        assert!((rig.position - goal).length() < 1e-2);
        assert!((rig.look_target - (h.position() + Vec3::Y * 1.5)).length() < 1e-5);
    }
}
