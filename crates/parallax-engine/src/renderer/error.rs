use std::fmt;

use crate::gpu::GpuError;

/// Non-fatal faults reported on the renderer's error channel.
///
/// The offending operation is skipped and the frame carries on.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// An operation was issued before [`Renderer::init`](super::Renderer::init).
    NotInitialized { operation: &'static str },
    /// `draw` was called with no active camera.
    MissingCamera,
    /// Presenting the frame failed.
    Present(GpuError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialized { operation } => {
                write!(f, "{operation} called before the renderer was initialized")
            }
            Self::MissingCamera => f.write_str("draw called without an active camera"),
            Self::Present(e) => write!(f, "present failed: {e}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Present(e) => Some(e),
            _ => None,
        }
    }
}
