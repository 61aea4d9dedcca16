//! Parallax engine crate.
//!
//! Camera and transform model, per-draw uniform state, the renderer frame lifecycle,
//! and the immediate-mode GPU seam they drive. The VR layer in `parallax-vr` builds its
//! per-eye protocol on top of [`renderer::Renderer`].
//!
//! Conventions: column-major `glam` matrices, right-handed world space, clip-space depth
//! in `[0, 1]`.

pub mod camera;
pub mod coords;
pub mod device;
pub mod gpu;
pub mod light;
pub mod logging;
pub mod paint;
pub mod renderer;
pub mod resource;
pub mod uniforms;
