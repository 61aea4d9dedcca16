//! Backend variants behind [`VrDevice`](crate::VrDevice).
//!
//! Each variant speaks to its own runtime and owns its eye render targets. The shared
//! per-frame protocol lives in the device; variants only answer the questions it asks.

mod oculus;
mod openvr;

use glam::{Mat4, UVec2};
use parallax_engine::gpu::{GpuContext, GpuError, RenderTarget};

use crate::config::VrBackendKind;
use crate::error::VrError;
use crate::eye::Eye;

pub(crate) use oculus::OculusBackend;
pub(crate) use openvr::OpenVrBackend;

/// A tracked controller, in tracking space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ControllerPose {
    /// Runtime device index (OpenVR) or hand index, left = 0 (Oculus).
    pub id: u32,
    pub pose: Mat4,
}

/// Per-eye values that depend on clip planes or the headset, not on the pose.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct EyeSetup {
    pub projection: [Mat4; 2],
    pub eye_to_head: [Mat4; 2],
}

/// One pose sample. `head` is `None` when the runtime has no valid tracking;
/// `controllers` is `None` when there was no sample at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TrackedPoses {
    pub head: Option<Mat4>,
    pub controllers: Option<Vec<ControllerPose>>,
}

pub(crate) enum Backend {
    OpenVr(OpenVrBackend),
    Oculus(OculusBackend),
}

impl Backend {
    pub fn kind(&self) -> VrBackendKind {
        match self {
            Self::OpenVr(_) => VrBackendKind::OpenVr,
            Self::Oculus(_) => VrBackendKind::Oculus,
        }
    }

    pub fn target_size(&self, eye: Eye) -> UVec2 {
        match self {
            Self::OpenVr(b) => b.target_size(),
            Self::Oculus(b) => b.target_size(eye),
        }
    }

    pub fn setup_cameras(&self, near: f32, far: f32) -> EyeSetup {
        match self {
            Self::OpenVr(b) => b.setup_cameras(near, far),
            Self::Oculus(b) => b.setup_cameras(near, far),
        }
    }

    pub fn update_pose(&mut self, frame_index: u64) -> TrackedPoses {
        match self {
            Self::OpenVr(b) => b.update_pose(),
            Self::Oculus(b) => b.update_pose(frame_index),
        }
    }

    /// Target to render `eye` into this frame.
    pub fn target(&self, eye: Eye) -> Option<RenderTarget> {
        match self {
            Self::OpenVr(b) => b.target(eye),
            Self::Oculus(b) => b.target(eye),
        }
    }

    /// Hands the finished image of `eye` to the compositor.
    pub fn submit(&mut self, eye: Eye) -> Result<(), VrError> {
        match self {
            Self::OpenVr(b) => b.submit(eye),
            Self::Oculus(b) => b.submit(eye),
        }
    }

    /// Ends the frame. `eye_poses` are the eye-to-tracking transforms it was rendered with.
    pub fn advance(&mut self, frame_index: u64, eye_poses: [Mat4; 2]) -> Result<(), VrError> {
        match self {
            Self::OpenVr(b) => {
                b.advance();
                Ok(())
            }
            Self::Oculus(b) => b.advance(frame_index, eye_poses),
        }
    }

    pub fn debug_info(&self) -> String {
        match self {
            Self::OpenVr(b) => b.debug_info(),
            Self::Oculus(b) => b.debug_info(),
        }
    }

    pub fn release_targets(&mut self, gpu: &mut GpuContext) {
        match self {
            Self::OpenVr(b) => b.release_targets(gpu),
            Self::Oculus(b) => b.release_targets(gpu),
        }
    }
}

/// Creates one off-screen target per eye, or none.
pub(crate) fn create_eye_targets(
    gpu: &mut GpuContext,
    size: UVec2,
) -> Result<[RenderTarget; 2], GpuError> {
    let left = gpu.create_render_target(size)?;
    match gpu.create_render_target(size) {
        Ok(right) => Ok([left, right]),
        Err(e) => {
            gpu.destroy_render_target(left);
            Err(e)
        }
    }
}
