use crate::gpu::{BlendMode, DepthState};
use crate::paint::Color;

/// Renderer construction options.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Colour used by [`Renderer::clear`](super::Renderer::clear).
    pub clear_color: Color,
    /// Initial ambient term uploaded with every draw.
    pub ambient_light: Color,
    /// Depth state applied by `init`, before any shader has set its own.
    pub depth: DepthState,
    /// Blend mode applied by `init`.
    pub blend: BlendMode,
    /// Errors kept on the error channel before the oldest are dropped.
    pub error_capacity: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            clear_color: Color::rgb(0.1, 0.1, 0.12),
            ambient_light: Color::rgb(0.2, 0.2, 0.2),
            depth: DepthState::default(),
            blend: BlendMode::Disabled,
            error_capacity: 64,
        }
    }
}
