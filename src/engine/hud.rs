use glam::{EulerRot, Quat, Vec3};
use winit::event::WindowEvent;
use winit::window::Window;

use super::proximity::CollisionEdge;

/// Receives the controller's per-tick readouts. How they are shown is up to the implementor.
pub trait UiSink {
    fn show_transform(&mut self, position: &str, rotation: &str);
    fn show_nearest_distance(&mut self, distance: Option<f32>);
    fn collision_changed(&mut self, edge: CollisionEdge);
    /// Short description of what the character is doing. Optional.
    fn show_activity(&mut self, _activity: &str) {}
    /// Clip currently faded in. `ambient` is set when no state machine drives it.
    fn show_animation(&mut self, _clip: &str, _ambient: bool) {}
}

// Two-decimal readouts print -0.00 for tiny negatives; snap them to zero.
fn tidy(v: f32) -> f32 {
    if v.abs() < 0.005 { 0.0 } else { v }
}

pub fn format_position(p: Vec3) -> String {
    format!("x: {:.2}, y: {:.2}, z: {:.2}", tidy(p.x), tidy(p.y), tidy(p.z))
}

/// XYZ Euler angles in degrees.
pub fn format_rotation(q: Quat) -> String {
    let (x, y, z) = q.to_euler(EulerRot::XYZ);
    format!(
        "x: {:.2}°, y: {:.2}°, z: {:.2}°",
        tidy(x.to_degrees()),
        tidy(y.to_degrees()),
        tidy(z.to_degrees())
    )
}

pub fn format_distance(distance: Option<f32>) -> String {
    match distance {
        Some(d) => format!("{:.2}", d),
        None => "none".to_string(),
    }
}

/// Latest HUD text. Filled by the controller, drawn by `Hud`.
#[derive(Debug, Clone, Default)]
pub struct HudState {
    pub position: String,
    pub rotation: String,
    pub nearest: Option<f32>,
    pub colliding: bool,
    /// Number of collision entries since startup
    pub collisions: u32,
    pub activity: String,
    pub clip: String,
}

impl UiSink for HudState {
    fn show_transform(&mut self, position: &str, rotation: &str) {
        self.position.clear();
        self.position.push_str(position);
        self.rotation.clear();
        self.rotation.push_str(rotation);
    }

    fn show_nearest_distance(&mut self, distance: Option<f32>) {
        self.nearest = distance;
    }

    fn collision_changed(&mut self, edge: CollisionEdge) {
        self.colliding = edge == CollisionEdge::Entered;
        if self.colliding {
            self.collisions += 1;
        }
    }

    fn show_activity(&mut self, activity: &str) {
        self.activity.clear();
        self.activity.push_str(activity);
    }

    fn show_animation(&mut self, clip: &str, ambient: bool) {
        self.clip = if ambient { format!("{clip} (ambient)") } else { clip.to_string() };
    }
}

/// egui overlay showing the HUD text and the invert-Y toggle.
pub struct Hud {
    pub visible: bool,
    ctx: egui::Context,
    winit_state: egui_winit::State,
    painter: egui_wgpu::Renderer,
}

impl Hud {
    pub fn new(window: &Window, device: &wgpu::Device, target_format: wgpu::TextureFormat) -> Self {
        let ctx = egui::Context::default();
        ctx.style_mut(|style| {
            style.visuals = egui::Visuals::dark();
            style.visuals.override_text_color = Some(egui::Color32::from_gray(235));
            style.override_font_id = Some(egui::FontId::monospace(13.0));
        });

        let winit_state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        // Own pass straight onto the swapchain image: no depth, no MSAA, no dithering
        let painter = egui_wgpu::Renderer::new(device, target_format, None, 1, false);

        Self { visible: true, ctx, winit_state, painter }
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    pub fn handle_window_event(&mut self, window: &Window, event: &WindowEvent) -> egui_winit::EventResponse {
        self.winit_state.on_window_event(window, event)
    }

    /// True while the pointer is over the panel, so clicks there don't start a camera drag.
    pub fn wants_pointer(&self) -> bool {
        self.visible && self.ctx.is_pointer_over_area()
    }

    fn panel(ui: &mut egui::Ui, state: &HudState, invert_y: &mut bool) {
        ui.label(format!("Position: {}", state.position));
        ui.label(format!("Rotation: {}", state.rotation));
        ui.label(format!("Nearest rock: {}", format_distance(state.nearest)));
        let collision = if state.colliding {
            egui::RichText::new("Collision: yes").color(egui::Color32::LIGHT_RED)
        } else {
            egui::RichText::new("Collision: no")
        };
        ui.label(collision);
        ui.label(format!("Collisions: {}", state.collisions));
        ui.label(format!("Activity: {}", state.activity));
        ui.label(format!("Clip: {}", state.clip));
        ui.separator();
        ui.checkbox(invert_y, "Invert Y axis");
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &Window,
        target: &wgpu::TextureView,
        screen: &egui_wgpu::ScreenDescriptor,
        state: &HudState,
        invert_y: &mut bool,
    ) {
        let input = self.winit_state.take_egui_input(window);
        let visible = self.visible;
        let output = self.ctx.run(input, |ctx| {
            if !visible {
                return;
            }
            egui::Window::new("HUD")
                .title_bar(false)
                .resizable(false)
                .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
                .frame(egui::Frame::popup(&ctx.style()).fill(egui::Color32::from_black_alpha(170)))
                .show(ctx, |ui| Self::panel(ui, state, invert_y));
        });
        self.winit_state.handle_platform_output(window, output.platform_output);

        let meshes = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        for (id, delta) in &output.textures_delta.set {
            self.painter.update_texture(device, queue, *id, delta);
        }
        self.painter.update_buffers(device, queue, encoder, &meshes, screen);

        let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("hud"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
            })],
            ..Default::default()
        });
        self.painter.render(&mut pass.forget_lifetime(), &meshes, screen);

        for id in &output.textures_delta.free {
            self.painter.free_texture(id);
        }
    }
}
