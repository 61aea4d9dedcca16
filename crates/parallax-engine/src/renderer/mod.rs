//! Per-frame rendering lifecycle.
//!
//! `Uninitialized → Ready ⇄ FrameInProgress`: `init` makes the renderer usable, the
//! first clear or draw of a frame starts it, and `swap_window` presents it and
//! returns to `Ready`.
//!
//! Configuration faults never abort the frame. They are logged, pushed to the error
//! channel ([`Renderer::take_errors`]) and the faulty call is skipped. Light slot
//! indices outside `[0, MAX_LIGHTS)` are programming errors and panic.

mod config;
mod error;
mod stats;

use std::collections::VecDeque;

use glam::{Mat3, Mat4, UVec2, Vec4};

use crate::camera::Camera;
use crate::gpu::{ClearRequest, GpuContext, RenderTarget};
use crate::light::{Light, MAX_LIGHTS};
use crate::paint::Color;
use crate::resource::{Material, Mesh, builtin};

pub use config::RendererConfig;
pub use error::RenderError;
pub use stats::RenderStats;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RendererState {
    Uninitialized,
    Ready,
    FrameInProgress,
}

pub struct Renderer {
    gpu: GpuContext,
    config: RendererConfig,
    state: RendererState,
    camera: Option<Camera>,
    lights: [Light; MAX_LIGHTS],
    ambient: Color,
    stats: RenderStats,
    errors: VecDeque<RenderError>,
}

impl Renderer {
    pub fn new(gpu: GpuContext, config: RendererConfig) -> Self {
        Self {
            gpu,
            ambient: config.ambient_light,
            config,
            state: RendererState::Uninitialized,
            camera: None,
            lights: [Light::UNUSED; MAX_LIGHTS],
            stats: RenderStats::default(),
            errors: VecDeque::new(),
        }
    }

    /// Applies the configured default GPU state and makes the renderer usable.
    pub fn init(&mut self) {
        if self.state != RendererState::Uninitialized {
            log::debug!("renderer already initialized");
            return;
        }
        self.gpu.set_depth_state(self.config.depth);
        self.gpu.set_blend_mode(self.config.blend);
        self.state = RendererState::Ready;

        let size = self.gpu.drawable_size();
        log::info!("renderer initialized ({}x{})", size.x, size.y);
    }

    #[inline]
    pub fn state(&self) -> RendererState {
        self.state
    }

    #[inline]
    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    #[inline]
    pub fn gpu_mut(&mut self) -> &mut GpuContext {
        &mut self.gpu
    }

    // ── frame ────────────────────────────────────────────────────────────

    /// Clears the requested buffers of the bound target. `color` is sRGB.
    pub fn clear_screen(&mut self, color: Color, clear_color: bool, clear_depth: bool) {
        if !self.begin("clear_screen") {
            return;
        }
        self.gpu.clear(ClearRequest {
            color: clear_color.then(|| color.to_linear()),
            depth: clear_depth.then_some(1.0),
        });
        self.stats.clears += 1;
    }

    /// Clears colour and depth with the configured clear colour.
    pub fn clear(&mut self) {
        self.clear_screen(self.config.clear_color, true, true);
    }

    /// Draws `mesh` with `model` placed in the world through `material`.
    ///
    /// Uploads the model, view, projection and normal matrices, the light array and the
    /// ambient term, then issues exactly one draw call.
    pub fn draw(&mut self, mesh: &Mesh, model: Mat4, material: &Material) {
        if !self.begin("draw") {
            self.stats.skipped_draws += 1;
            return;
        }
        let Some(camera) = self.camera else {
            self.report(RenderError::MissingCamera);
            self.stats.skipped_draws += 1;
            return;
        };

        let view = camera.view_transform();
        let viewport = camera.viewport_pixels(self.gpu.target_size());
        let projection = camera.projection_transform(viewport.size());
        let normal_matrix = Mat3::from_mat4(view * model).inverse().transpose();

        let shader = material.shader();
        material.bind(&mut self.gpu);
        shader.set_matrix4(&mut self.gpu, builtin::MODEL, model);
        shader.set_matrix4(&mut self.gpu, builtin::VIEW, view);
        shader.set_matrix4(&mut self.gpu, builtin::PROJECTION, projection);
        shader.set_matrix3(&mut self.gpu, builtin::NORMAL_MATRIX, normal_matrix);

        let (position_type, color_range) = self.light_arrays();
        shader.set_vec4_array(&mut self.gpu, builtin::LIGHTS_POSITION_TYPE, &position_type);
        shader.set_vec4_array(&mut self.gpu, builtin::LIGHTS_COLOR_RANGE, &color_range);
        shader.set_vec4(&mut self.gpu, builtin::AMBIENT_LIGHT, self.ambient.to_linear());

        self.gpu.bind_vertex_state(mesh.vertex_state());
        self.gpu.draw_arrays(mesh.topology(), mesh.vertex_count());
        self.stats.draw_calls += 1;
    }

    /// Presents the frame and returns its statistics.
    pub fn swap_window(&mut self) -> RenderStats {
        if self.state == RendererState::Uninitialized {
            self.report(RenderError::NotInitialized {
                operation: "swap_window",
            });
            return self.stats;
        }

        if let Err(e) = self.gpu.present() {
            self.report(RenderError::Present(e));
        }

        let finished = self.stats;
        self.stats = finished.next_frame();
        self.state = RendererState::Ready;
        finished
    }

    /// Forwards a new window size and re-applies the active camera's viewport.
    pub fn resize(&mut self, size: UVec2) {
        self.gpu.resize_drawable(size);
        self.apply_viewport();
    }

    /// Binds an off-screen target (or the window for `None`) and re-applies the active
    /// camera's viewport against it.
    pub fn bind_render_target(&mut self, target: Option<&RenderTarget>) {
        self.gpu.bind_render_target(target);
        self.apply_viewport();
    }

    // ── camera ───────────────────────────────────────────────────────────

    /// Makes `camera` active and applies its viewport immediately.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = Some(camera);
        self.apply_viewport();
    }

    pub fn clear_camera(&mut self) {
        self.camera = None;
    }

    #[inline]
    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    // ── lights ───────────────────────────────────────────────────────────

    /// Replaces light slot `index`.
    ///
    /// # Panics
    ///
    /// If `index >= MAX_LIGHTS`.
    pub fn set_light(&mut self, index: usize, light: Light) {
        assert!(index < MAX_LIGHTS, "light index {index} out of range 0..{MAX_LIGHTS}");
        self.lights[index] = light;
    }

    /// # Panics
    ///
    /// If `index >= MAX_LIGHTS`.
    pub fn light(&self, index: usize) -> &Light {
        assert!(index < MAX_LIGHTS, "light index {index} out of range 0..{MAX_LIGHTS}");
        &self.lights[index]
    }

    #[inline]
    pub fn lights(&self) -> &[Light; MAX_LIGHTS] {
        &self.lights
    }

    pub fn set_ambient_light(&mut self, color: Color) {
        self.ambient = color;
    }

    #[inline]
    pub fn ambient_light(&self) -> Color {
        self.ambient
    }

    // ── diagnostics ──────────────────────────────────────────────────────

    /// Counters of the frame in progress.
    #[inline]
    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Drains the error channel.
    pub fn take_errors(&mut self) -> Vec<RenderError> {
        self.errors.drain(..).collect()
    }

    fn report(&mut self, error: RenderError) {
        log::error!("{error}");
        if self.config.error_capacity == 0 {
            return;
        }
        if self.errors.len() == self.config.error_capacity {
            let _ = self.errors.pop_front();
        }
        self.errors.push_back(error);
    }

    /// Moves into `FrameInProgress`, or reports that `operation` came too early.
    fn begin(&mut self, operation: &'static str) -> bool {
        match self.state {
            RendererState::Uninitialized => {
                self.report(RenderError::NotInitialized { operation });
                false
            }
            RendererState::Ready | RendererState::FrameInProgress => {
                self.state = RendererState::FrameInProgress;
                true
            }
        }
    }

    fn apply_viewport(&mut self) {
        if let Some(camera) = &self.camera {
            let rect = camera.viewport_pixels(self.gpu.target_size());
            self.gpu.set_viewport(rect);
        }
    }

    fn light_arrays(&self) -> ([Vec4; MAX_LIGHTS], [Vec4; MAX_LIGHTS]) {
        (
            self.lights.map(|l| l.position_type()),
            self.lights.map(|l| l.color_range()),
        )
    }
}
