//! Opaque handles and small state enums exchanged across the GPU seam.

use glam::UVec2;

/// Linked shader program.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Vertex input state (buffers + layout) of a mesh.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexStateId(pub u32);

/// Native texture handle as understood by the active graphics API.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Off-screen framebuffer. The window's default framebuffer has no id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferId(pub u32);

/// Shader uniform location.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformId(pub u32);

/// Primitive topology of a draw call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Topology {
    Points,
    Lines,
    Triangles,
}

/// Colour blending applied while a program is bound.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    #[default]
    Disabled,
    /// `src * a + dst * (1 - a)`.
    AlphaBlending,
    /// `src * a + dst`.
    AdditiveBlending,
}

/// Depth test/write flags.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub test: bool,
    pub write: bool,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            test: true,
            write: true,
        }
    }
}

/// A framebuffer together with its colour attachment.
///
/// VR backends hand `color` to the compositor after the frame has been flushed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderTarget {
    pub framebuffer: FramebufferId,
    pub color: TextureHandle,
    pub size: UVec2,
}
