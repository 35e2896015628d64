// Third-person robot miner
// Orbit the camera with a left-drag, walk with WASD/ZQSD/arrows, mine rocks with E.
// F3 toggles the HUD, Escape quits.

mod engine;
mod render;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};
use log::{debug, error, info};
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use engine::camera::CameraRig;
use engine::config::{ConfigError, ControllerConfig};
use engine::controller::CharacterController;
use engine::hud::{Hud, HudState};
use engine::input::InputState;
use engine::{OreDeposit, Player, Tint, Transform};
use render::{CubeInstance, Renderer};

const DEFAULT_CONFIG_PATH: &str = "controller.toml";
const FOV_DEGREES: f32 = 60.0;

const GROUND_TINT: u32 = 0x9999bb;
const VISOR_TINT: u32 = 0xf0f0ff;

/// Body color per clip. The robot blends these by clip weight so cross-fades show.
fn clip_tint(name: &str) -> Tint {
    match name {
        "Idle" => Tint::from_hex(0x3399ff),
        "Walking" => Tint::from_hex(0x33cc66),
        "Standing" => Tint::from_hex(0xff9933),
        "ThumbsUp" => Tint::from_hex(0xffd700),
        _ => Tint::from_hex(0xcccccc),
    }
}

/// Ground slab, one cube per rock (shrinking with its ore), robot body and visor.
fn scene_cubes(world: &mut World, controller: &CharacterController) -> Vec<CubeInstance> {
    let mut cubes = vec![CubeInstance::new(
        Vec3::new(100.0, 0.02, 100.0),
        Quat::IDENTITY,
        Vec3::new(0.0, -0.01, 0.0),
        Tint::from_hex(GROUND_TINT),
    )];

    let mut rocks = world.query::<(&Transform, &OreDeposit, &Tint)>();
    for (t, ore, tint) in rocks.iter(world) {
        let size = 0.5 + 0.7 * ore.fill_fraction();
        let tint = if ore.is_depleted() { tint.scaled(0.4) } else { *tint };
        cubes.push(CubeInstance::new(Vec3::splat(size), t.rotation, t.position + Vec3::Y * size * 0.5, tint));
    }

    let (mut body, mut total) = (Tint::new(0.0, 0.0, 0.0), 0.0);
    for action in controller.animation().mixer().actions().filter(|a| a.weight() > 0.0) {
        let c = clip_tint(action.name()).scaled(action.weight());
        body = Tint::new(body.r + c.r, body.g + c.g, body.b + c.b);
        total += action.weight();
    }
    let body = if total > 0.0 { body.scaled(1.0 / total) } else { clip_tint("") };

    let mut players = world.query_filtered::<&Transform, With<Player>>();
    for t in players.iter(world) {
        cubes.push(CubeInstance::new(Vec3::new(0.6, 1.8, 0.4), t.rotation, t.position + Vec3::Y * 0.9, body));
        cubes.push(CubeInstance::new(
            Vec3::new(0.4, 0.15, 0.06),
            t.rotation,
            t.position + t.rotation * Vec3::new(0.0, 1.5, 0.22),
            Tint::from_hex(VISOR_TINT),
        ));
    }

    cubes
}

struct Graphics {
    window: Arc<Window>,
    renderer: Renderer,
    hud: Hud,
}

struct MinerApp {
    graphics: Option<Graphics>,
    world: World,
    controller: CharacterController,
    input: InputState,
    hud_state: HudState,
    last_frame: Option<Instant>,
    fps_window_start: Instant,
    fps_frames: u32,
}

impl MinerApp {
    fn new(settings: &ControllerConfig) -> Self {
        let mut world = World::new();
        engine::scene::spawn_scene(&mut world, settings);
        Self {
            graphics: None,
            world,
            controller: CharacterController::from_config(settings),
            input: InputState::new(),
            hud_state: HudState::default(),
            last_frame: None,
            fps_window_start: Instant::now(),
            fps_frames: 0,
        }
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = self.last_frame.map_or(0.0, |last| (now - last).as_secs_f32());
        self.last_frame = Some(now);

        self.controller.tick(&mut self.world, &mut self.input, &mut self.hud_state, dt);

        let cubes = scene_cubes(&mut self.world, &self.controller);
        let rig = self.world.get_resource::<CameraRig>().copied().unwrap_or_default();

        let Some(gfx) = self.graphics.as_mut() else {
            return;
        };
        let view_proj = rig.view_projection(FOV_DEGREES.to_radians(), gfx.renderer.aspect(), 0.1, 1000.0);
        let (width, height) = gfx.renderer.size();
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [width, height],
            pixels_per_point: gfx.window.scale_factor() as f32,
        };

        let hud = &mut gfx.hud;
        let window = &gfx.window;
        let hud_state = &self.hud_state;
        let invert_y = &mut self.input.invert_y;
        let result = gfx.renderer.draw(view_proj, &cubes, |device, queue, encoder, target| {
            hud.render(device, queue, encoder, window, target, &screen, hud_state, invert_y);
        });

        match result {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => gfx.renderer.reconfigure(),
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("GPU out of memory; exiting");
                event_loop.exit();
            }
            Err(e) => error!("frame skipped: {e:?}"),
        }

        self.fps_frames += 1;
        if self.fps_window_start.elapsed().as_secs_f32() >= 1.0 {
            debug!("FPS: {} | {}", self.fps_frames, self.hud_state.activity);
            self.fps_frames = 0;
            self.fps_window_start = Instant::now();
        }
    }
}

impl ApplicationHandler for MinerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }

        let attrs = Window::default_attributes()
            .with_title("Robot Miner")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                error!("failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };
        match Renderer::new(window.clone()) {
            Ok(renderer) => {
                let hud = Hud::new(&window, renderer.device(), renderer.surface_format());
                info!("Window and renderer initialized");
                self.graphics = Some(Graphics { window, renderer, hud });
            }
            Err(err) => {
                error!("failed to initialize renderer: {err}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(gfx) = self.graphics.as_mut() else {
            return;
        };
        if gfx.window.id() != window_id {
            return;
        }

        let response = gfx.hud.handle_window_event(&gfx.window, &event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => gfx.renderer.resize(size.width, size.height),
            WindowEvent::RedrawRequested => self.frame(event_loop),
            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(KeyCode::Escape), state: ElementState::Pressed, .. },
                ..
            } => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(KeyCode::F3), state: ElementState::Pressed, repeat: false, .. },
                ..
            } => gfx.hud.toggle(),
            // A press that lands on the HUD (the invert checkbox) must not start a camera drag
            WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Left, .. }
                if response.consumed || gfx.hud.wants_pointer() => {}
            other => self.input.process_event(&other),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        self.input.process_device_event(&event);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gfx) = self.graphics.as_ref() {
            gfx.window.request_redraw();
        }
    }
}

/// First CLI argument, or `controller.toml`. Any failure falls back to the defaults.
fn load_config() -> ControllerConfig {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    match ControllerConfig::load(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No config at {}, using defaults", path.display());
            ControllerConfig::default()
        }
        Err(e) => {
            error!("{}: {e}; using defaults", path.display());
            ControllerConfig::default()
        }
    }
}

fn main() {
    env_logger::init();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            error!("failed to create event loop: {err}");
            return;
        }
    };

    let mut app = MinerApp::new(&load_config());
    if let Err(err) = event_loop.run_app(&mut app) {
        error!("event loop exited with error: {err}");
    }
}
