//! Renderer-facing views of GPU resources.
//!
//! Geometry upload, shader compilation and texture decoding live outside the engine
//! core. What arrives here is the handle plus the few facts a draw call needs.

mod material;
mod mesh;
mod shader;
mod texture;

pub use material::Material;
pub use mesh::Mesh;
pub use shader::{Shader, ShaderDesc, ShaderError, builtin};
pub use texture::Texture;
