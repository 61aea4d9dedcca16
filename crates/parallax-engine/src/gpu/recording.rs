use std::cell::RefCell;
use std::rc::Rc;

use glam::{Mat3, Mat4, UVec2, Vec4};

use crate::coords::PixelRect;

use super::api::{ClearRequest, GpuError, GraphicsApi, UniformData};
use super::handles::{
    BlendMode, DepthState, FramebufferId, ProgramId, RenderTarget, TextureHandle, Topology,
    UniformId, VertexStateId,
};

/// Owned copy of an uploaded uniform value.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedUniform {
    Float(f32),
    Int(i32),
    Vec4(Vec4),
    Vec4Array(Vec<Vec4>),
    Mat3(Mat3),
    Mat4(Mat4),
    Mat4Array(Vec<Mat4>),
}

impl From<UniformData<'_>> for RecordedUniform {
    fn from(data: UniformData<'_>) -> Self {
        match data {
            UniformData::Float(v) => Self::Float(v),
            UniformData::Int(v) => Self::Int(v),
            UniformData::Vec4(v) => Self::Vec4(v),
            UniformData::Vec4Array(v) => Self::Vec4Array(v.to_vec()),
            UniformData::Mat3(m) => Self::Mat3(m),
            UniformData::Mat4(m) => Self::Mat4(m),
            UniformData::Mat4Array(m) => Self::Mat4Array(m.to_vec()),
        }
    }
}

/// One call made against a [`RecordingApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    SetViewport(PixelRect),
    Clear(ClearRequest),
    UseProgram(ProgramId),
    SetDepthState(DepthState),
    SetBlendMode(BlendMode),
    Uniform(UniformId, RecordedUniform),
    BindTexture { unit: u32, texture: TextureHandle },
    BindVertexState(VertexStateId),
    Draw { topology: Topology, vertex_count: u32 },
    CreateRenderTarget(RenderTarget),
    ImportRenderTarget(RenderTarget),
    DestroyRenderTarget(FramebufferId),
    BindFramebuffer(Option<FramebufferId>),
    Flush,
    Present,
}

/// Shared, inspectable log of recorded commands.
///
/// Cloning the log shares the underlying buffer, so a test can keep one handle while
/// the [`RecordingApi`] is owned by a `GpuContext`.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    commands: Rc<RefCell<Vec<GpuCommand>>>,
}

impl CommandLog {
    fn push(&self, cmd: GpuCommand) {
        self.commands.borrow_mut().push(cmd);
    }

    /// Returns a copy of every command recorded so far.
    pub fn snapshot(&self) -> Vec<GpuCommand> {
        self.commands.borrow().clone()
    }

    /// Drains the log.
    pub fn take(&self) -> Vec<GpuCommand> {
        std::mem::take(&mut *self.commands.borrow_mut())
    }

    pub fn clear(&self) {
        self.commands.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.commands.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.borrow().is_empty()
    }

    /// Counts recorded commands matching `pred`.
    pub fn count(&self, pred: impl Fn(&GpuCommand) -> bool) -> usize {
        self.commands.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn uniform_uploads(&self) -> usize {
        self.count(|c| matches!(c, GpuCommand::Uniform(..)))
    }

    pub fn draw_calls(&self) -> usize {
        self.count(|c| matches!(c, GpuCommand::Draw { .. }))
    }
}

/// Headless [`GraphicsApi`] that records every call.
///
/// Render targets get sequential framebuffer ids; created colour textures get handles
/// from a separate counter starting at `0x1000` so they never collide with
/// small hand-picked handles in tests.
#[derive(Debug)]
pub struct RecordingApi {
    log: CommandLog,
    drawable_size: UVec2,
    next_framebuffer: u32,
    next_texture: u64,
    fail_present: bool,
}

impl RecordingApi {
    pub fn new(drawable_size: UVec2) -> (Self, CommandLog) {
        let log = CommandLog::default();
        let api = Self {
            log: log.clone(),
            drawable_size,
            next_framebuffer: 1,
            next_texture: 0x1000,
            fail_present: false,
        };
        (api, log)
    }

    /// Makes every subsequent `present` fail with a surface error.
    pub fn with_failing_present(mut self) -> Self {
        self.fail_present = true;
        self
    }

    fn alloc_framebuffer(&mut self) -> FramebufferId {
        let id = FramebufferId(self.next_framebuffer);
        self.next_framebuffer += 1;
        id
    }
}

impl GraphicsApi for RecordingApi {
    fn drawable_size(&self) -> UVec2 {
        self.drawable_size
    }

    fn resize_drawable(&mut self, size: UVec2) {
        self.drawable_size = size;
    }

    fn set_viewport(&mut self, rect: PixelRect) {
        self.log.push(GpuCommand::SetViewport(rect));
    }

    fn clear(&mut self, request: ClearRequest) {
        self.log.push(GpuCommand::Clear(request));
    }

    fn use_program(&mut self, program: ProgramId) {
        self.log.push(GpuCommand::UseProgram(program));
    }

    fn set_depth_state(&mut self, depth: DepthState) {
        self.log.push(GpuCommand::SetDepthState(depth));
    }

    fn set_blend_mode(&mut self, blend: BlendMode) {
        self.log.push(GpuCommand::SetBlendMode(blend));
    }

    fn upload_uniform(&mut self, location: UniformId, data: UniformData<'_>) {
        self.log.push(GpuCommand::Uniform(location, data.into()));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.log.push(GpuCommand::BindTexture { unit, texture });
    }

    fn bind_vertex_state(&mut self, vertex_state: VertexStateId) {
        self.log.push(GpuCommand::BindVertexState(vertex_state));
    }

    fn draw_arrays(&mut self, topology: Topology, vertex_count: u32) {
        self.log.push(GpuCommand::Draw {
            topology,
            vertex_count,
        });
    }

    fn create_render_target(&mut self, size: UVec2) -> Result<RenderTarget, GpuError> {
        let color = TextureHandle(self.next_texture);
        self.next_texture += 1;
        let target = RenderTarget {
            framebuffer: self.alloc_framebuffer(),
            color,
            size,
        };
        self.log.push(GpuCommand::CreateRenderTarget(target));
        Ok(target)
    }

    fn import_render_target(
        &mut self,
        color: TextureHandle,
        size: UVec2,
    ) -> Result<RenderTarget, GpuError> {
        let target = RenderTarget {
            framebuffer: self.alloc_framebuffer(),
            color,
            size,
        };
        self.log.push(GpuCommand::ImportRenderTarget(target));
        Ok(target)
    }

    fn destroy_render_target(&mut self, target: RenderTarget) {
        self.log.push(GpuCommand::DestroyRenderTarget(target.framebuffer));
    }

    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        self.log.push(GpuCommand::BindFramebuffer(framebuffer));
    }

    fn flush(&mut self) {
        self.log.push(GpuCommand::Flush);
    }

    fn present(&mut self) -> Result<(), GpuError> {
        self.log.push(GpuCommand::Present);
        if self.fail_present {
            Err(GpuError::Surface("recording api configured to fail".to_string()))
        } else {
            Ok(())
        }
    }
}
