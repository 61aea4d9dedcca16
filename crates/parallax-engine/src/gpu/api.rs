use std::fmt;

use glam::{Mat3, Mat4, UVec2, Vec4};

use crate::coords::PixelRect;

use super::handles::{
    BlendMode, DepthState, FramebufferId, ProgramId, RenderTarget, TextureHandle, Topology,
    UniformId, VertexStateId,
};

/// Borrowed uniform payload for a single upload.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformData<'a> {
    Float(f32),
    /// Sampler uniforms carry the texture unit they read from.
    Int(i32),
    Vec4(Vec4),
    Vec4Array(&'a [Vec4]),
    Mat3(Mat3),
    Mat4(Mat4),
    Mat4Array(&'a [Mat4]),
}

/// Buffers to clear; `None` leaves the buffer untouched.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearRequest {
    /// Linear RGBA clear colour.
    pub color: Option<Vec4>,
    pub depth: Option<f32>,
}

/// Errors reported by a [`GraphicsApi`] implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// A handle that was never created (or already destroyed) was used.
    UnknownHandle(&'static str, u64),
    /// Render target dimensions were zero or exceeded device limits.
    InvalidTargetSize(UVec2),
    /// The presentation surface could not produce a frame.
    Surface(String),
    /// The operation is not available on this API.
    Unsupported(&'static str),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownHandle(kind, id) => write!(f, "unknown {kind} handle {id}"),
            Self::InvalidTargetSize(size) => {
                write!(f, "invalid render target size {}x{}", size.x, size.y)
            }
            Self::Surface(msg) => write!(f, "surface error: {msg}"),
            Self::Unsupported(what) => write!(f, "unsupported operation: {what}"),
        }
    }
}

impl std::error::Error for GpuError {}

/// Immediate-mode command interface to a graphics API.
///
/// Calls are issued from the thread that owns the context, in frame order. Every
/// `bind`-style call fully replaces the corresponding piece of state; implementations
/// must not rely on callers skipping redundant binds.
pub trait GraphicsApi {
    /// Size of the default (window) framebuffer in pixels.
    fn drawable_size(&self) -> UVec2;

    /// Called by the windowing layer when the default framebuffer changes size.
    fn resize_drawable(&mut self, size: UVec2);

    fn set_viewport(&mut self, rect: PixelRect);

    fn clear(&mut self, request: ClearRequest);

    fn use_program(&mut self, program: ProgramId);

    fn set_depth_state(&mut self, depth: DepthState);

    fn set_blend_mode(&mut self, blend: BlendMode);

    /// Uploads one uniform into the currently bound program.
    fn upload_uniform(&mut self, location: UniformId, data: UniformData<'_>);

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    fn bind_vertex_state(&mut self, vertex_state: VertexStateId);

    /// Draws `vertex_count` vertices from the bound vertex state.
    fn draw_arrays(&mut self, topology: Topology, vertex_count: u32);

    /// Creates an off-screen colour + depth target.
    fn create_render_target(&mut self, size: UVec2) -> Result<RenderTarget, GpuError>;

    /// Wraps an existing colour texture (e.g. a compositor swap-chain image) as a target.
    fn import_render_target(
        &mut self,
        color: TextureHandle,
        size: UVec2,
    ) -> Result<RenderTarget, GpuError>;

    fn destroy_render_target(&mut self, target: RenderTarget);

    /// Binds an off-screen framebuffer, or the default framebuffer for `None`.
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);

    /// Submits all commands recorded so far without presenting.
    fn flush(&mut self);

    /// Submits outstanding work and presents the default framebuffer.
    fn present(&mut self) -> Result<(), GpuError>;
}
