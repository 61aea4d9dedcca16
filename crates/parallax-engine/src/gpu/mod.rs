//! The GPU seam.
//!
//! All rendering goes through [`GraphicsApi`], an immediate-mode command interface
//! modelled on a classic bind-then-draw state machine. [`GpuContext`] owns one API
//! instance and tracks what is bound; the renderer owns the context.
//!
//! Implementations:
//! - [`RecordingApi`]: headless, records every call into a [`CommandLog`]
//! - [`WgpuApi`]: draws through wgpu

mod api;
mod context;
mod handles;
mod recording;
pub mod wgpu_api;

pub use api::{ClearRequest, GpuError, GraphicsApi, UniformData};
pub use context::{BoundState, GpuContext, TargetReleaser};
pub use handles::{
    BlendMode, DepthState, FramebufferId, ProgramId, RenderTarget, TextureHandle, Topology,
    UniformId, VertexStateId,
};
pub use recording::{CommandLog, GpuCommand, RecordedUniform, RecordingApi};
pub use wgpu_api::{WgpuApi, WgpuApiConfig};
