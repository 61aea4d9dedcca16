use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use glam::UVec2;

use crate::coords::PixelRect;

use super::api::{ClearRequest, GpuError, GraphicsApi, UniformData};
use super::handles::{
    BlendMode, DepthState, FramebufferId, ProgramId, RenderTarget, TextureHandle, Topology,
    UniformId, VertexStateId,
};

/// Snapshot of what the context believes is bound on the GPU.
///
/// This mirrors the last value pushed for each piece of state. It is never used to
/// skip a call: every bind is forwarded to the API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundState {
    pub program: Option<ProgramId>,
    pub vertex_state: Option<VertexStateId>,
    pub viewport: Option<PixelRect>,
    pub framebuffer: Option<FramebufferId>,
    /// Size of the bound off-screen framebuffer; `None` while the default one is bound.
    pub framebuffer_size: Option<UVec2>,
    pub depth: DepthState,
    pub blend: BlendMode,
    pub textures: BTreeMap<u32, TextureHandle>,
}

/// Hands render targets back to a [`GpuContext`] from code that no longer holds it.
///
/// Queued targets are destroyed the next time the context flushes, presents, or
/// creates a target. Owners that can be dropped away from the renderer (VR backends)
/// keep one of these so their targets never outlive them on the GPU.
#[derive(Debug, Clone, Default)]
pub struct TargetReleaser {
    queue: Rc<RefCell<Vec<RenderTarget>>>,
}

impl TargetReleaser {
    pub fn release(&self, target: RenderTarget) {
        self.queue.borrow_mut().push(target);
    }

    pub fn release_all(&self, targets: impl IntoIterator<Item = RenderTarget>) {
        self.queue.borrow_mut().extend(targets);
    }

    /// Targets queued and not yet destroyed.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    fn take(&self) -> Vec<RenderTarget> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }
}

/// The process-wide GPU state machine, made explicit.
///
/// One `GpuContext` wraps one graphics API instance. It is owned by the renderer and
/// lent to collaborators (VR devices, materials) by reference, so independent contexts
/// can coexist in tests.
pub struct GpuContext {
    api: Box<dyn GraphicsApi>,
    bound: BoundState,
    releaser: TargetReleaser,
}

impl GpuContext {
    pub fn new(api: impl GraphicsApi + 'static) -> Self {
        Self::from_boxed(Box::new(api))
    }

    pub fn from_boxed(api: Box<dyn GraphicsApi>) -> Self {
        Self {
            api,
            bound: BoundState::default(),
            releaser: TargetReleaser::default(),
        }
    }

    /// Handle for queueing targets to destroy later on this context.
    pub fn releaser(&self) -> TargetReleaser {
        self.releaser.clone()
    }

    #[inline]
    pub fn bound(&self) -> &BoundState {
        &self.bound
    }

    #[inline]
    pub fn drawable_size(&self) -> UVec2 {
        self.api.drawable_size()
    }

    /// Forwards a window resize to the API.
    pub fn resize_drawable(&mut self, size: UVec2) {
        self.api.resize_drawable(size);
    }

    /// Pixel size of whatever framebuffer is currently bound.
    pub fn target_size(&self) -> UVec2 {
        self.bound
            .framebuffer_size
            .unwrap_or_else(|| self.api.drawable_size())
    }

    pub fn set_viewport(&mut self, rect: PixelRect) {
        self.bound.viewport = Some(rect);
        self.api.set_viewport(rect);
    }

    pub fn clear(&mut self, request: ClearRequest) {
        self.api.clear(request);
    }

    pub fn use_program(&mut self, program: ProgramId) {
        self.bound.program = Some(program);
        self.api.use_program(program);
    }

    pub fn set_depth_state(&mut self, depth: DepthState) {
        self.bound.depth = depth;
        self.api.set_depth_state(depth);
    }

    pub fn set_blend_mode(&mut self, blend: BlendMode) {
        self.bound.blend = blend;
        self.api.set_blend_mode(blend);
    }

    pub fn upload_uniform(&mut self, location: UniformId, data: UniformData<'_>) {
        if self.bound.program.is_none() {
            log::warn!("uniform {location:?} uploaded with no program bound");
        }
        self.api.upload_uniform(location, data);
    }

    pub fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        let _ = self.bound.textures.insert(unit, texture);
        self.api.bind_texture(unit, texture);
    }

    pub fn bind_vertex_state(&mut self, vertex_state: VertexStateId) {
        self.bound.vertex_state = Some(vertex_state);
        self.api.bind_vertex_state(vertex_state);
    }

    pub fn draw_arrays(&mut self, topology: Topology, vertex_count: u32) {
        self.api.draw_arrays(topology, vertex_count);
    }

    pub fn create_render_target(&mut self, size: UVec2) -> Result<RenderTarget, GpuError> {
        if size.x == 0 || size.y == 0 {
            return Err(GpuError::InvalidTargetSize(size));
        }
        self.destroy_released_targets();
        self.api.create_render_target(size)
    }

    pub fn import_render_target(
        &mut self,
        color: TextureHandle,
        size: UVec2,
    ) -> Result<RenderTarget, GpuError> {
        if size.x == 0 || size.y == 0 {
            return Err(GpuError::InvalidTargetSize(size));
        }
        self.destroy_released_targets();
        self.api.import_render_target(color, size)
    }

    /// Destroys `target`, falling back to the default framebuffer if it was bound.
    pub fn destroy_render_target(&mut self, target: RenderTarget) {
        if self.bound.framebuffer == Some(target.framebuffer) {
            self.bind_render_target(None);
        }
        self.api.destroy_render_target(target);
    }

    /// Binds an off-screen target, or the default framebuffer for `None`.
    pub fn bind_render_target(&mut self, target: Option<&RenderTarget>) {
        self.bound.framebuffer = target.map(|t| t.framebuffer);
        self.bound.framebuffer_size = target.map(|t| t.size);
        self.api.bind_framebuffer(self.bound.framebuffer);
    }

    /// Destroys every target queued through a [`TargetReleaser`].
    pub fn destroy_released_targets(&mut self) {
        let released = self.releaser.take();
        if !released.is_empty() {
            log::debug!("destroying {} released render target(s)", released.len());
        }
        for target in released {
            self.destroy_render_target(target);
        }
    }

    pub fn flush(&mut self) {
        self.destroy_released_targets();
        self.api.flush();
    }

    pub fn present(&mut self) -> Result<(), GpuError> {
        self.destroy_released_targets();
        self.api.present()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{GpuCommand, RecordingApi};

    #[test]
    fn target_size_follows_bound_framebuffer() {
        let (api, _log) = RecordingApi::new(UVec2::new(1280, 720));
        let mut gpu = GpuContext::new(api);
        assert_eq!(gpu.target_size(), UVec2::new(1280, 720));

        let target = gpu.create_render_target(UVec2::new(512, 256)).unwrap();
        gpu.bind_render_target(Some(&target));
        assert_eq!(gpu.target_size(), UVec2::new(512, 256));

        gpu.bind_render_target(None);
        assert_eq!(gpu.target_size(), UVec2::new(1280, 720));
    }

    #[test]
    fn zero_sized_targets_are_rejected() {
        let (api, log) = RecordingApi::new(UVec2::new(64, 64));
        let mut gpu = GpuContext::new(api);
        assert_eq!(
            gpu.create_render_target(UVec2::new(0, 10)),
            Err(GpuError::InvalidTargetSize(UVec2::new(0, 10)))
        );
        assert!(log.is_empty());
    }

    #[test]
    fn destroying_bound_target_rebinds_default() {
        let (api, log) = RecordingApi::new(UVec2::new(64, 64));
        let mut gpu = GpuContext::new(api);
        let target = gpu.create_render_target(UVec2::new(32, 32)).unwrap();
        gpu.bind_render_target(Some(&target));
        gpu.destroy_render_target(target);

        assert_eq!(gpu.bound().framebuffer, None);
        let cmds = log.take();
        assert!(matches!(cmds[cmds.len() - 2], GpuCommand::BindFramebuffer(None)));
    }

    #[test]
    fn released_targets_are_destroyed_on_next_flush() {
        let (api, log) = RecordingApi::new(UVec2::new(64, 64));
        let mut gpu = GpuContext::new(api);
        let a = gpu.create_render_target(UVec2::new(16, 16)).unwrap();
        let b = gpu.create_render_target(UVec2::new(16, 16)).unwrap();
        gpu.bind_render_target(Some(&b));

        let releaser = gpu.releaser();
        releaser.release_all([a, b]);
        assert_eq!(releaser.pending(), 2);
        assert_eq!(log.count(|c| matches!(c, GpuCommand::DestroyRenderTarget(_))), 0);

        gpu.flush();
        assert_eq!(releaser.pending(), 0);
        assert_eq!(log.count(|c| matches!(c, GpuCommand::DestroyRenderTarget(_))), 2);
        assert_eq!(gpu.bound().framebuffer, None);

        gpu.flush();
        assert_eq!(log.count(|c| matches!(c, GpuCommand::DestroyRenderTarget(_))), 2);
    }

    #[test]
    fn redundant_binds_are_forwarded() {
        let (api, log) = RecordingApi::new(UVec2::new(64, 64));
        let mut gpu = GpuContext::new(api);
        gpu.use_program(ProgramId(3));
        gpu.use_program(ProgramId(3));
        assert_eq!(log.count(|c| matches!(c, GpuCommand::UseProgram(ProgramId(3)))), 2);
    }
}
