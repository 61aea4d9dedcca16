use std::fmt;

use parallax_engine::gpu::GpuError;

use crate::config::VrBackendKind;

/// Errors raised while opening or driving a VR session.
///
/// Session creation failures are turned into an absent device by
/// [`VrDevice::create`](crate::VrDevice::create); per-frame failures are logged and
/// the frame continues.
#[derive(Debug, Clone, PartialEq)]
pub enum VrError {
    /// No loader is registered for the backend.
    RuntimeNotInstalled(VrBackendKind),
    /// The runtime was found but refused to open a session (no headset, service down).
    SessionUnavailable {
        backend: VrBackendKind,
        reason: String,
    },
    /// Creating or wrapping a per-eye render target failed.
    RenderTarget(GpuError),
    SwapChain(String),
    /// The compositor rejected a submitted frame.
    Compositor(String),
    Tracking(String),
}

impl fmt::Display for VrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuntimeNotInstalled(kind) => write!(f, "{kind} runtime is not installed"),
            Self::SessionUnavailable { backend, reason } => {
                write!(f, "{backend} session unavailable: {reason}")
            }
            Self::RenderTarget(e) => write!(f, "eye render target: {e}"),
            Self::SwapChain(msg) => write!(f, "swap chain: {msg}"),
            Self::Compositor(msg) => write!(f, "compositor: {msg}"),
            Self::Tracking(msg) => write!(f, "tracking: {msg}"),
        }
    }
}

impl std::error::Error for VrError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RenderTarget(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GpuError> for VrError {
    fn from(e: GpuError) -> Self {
        Self::RenderTarget(e)
    }
}
