//! Native surface of an `OpenVR`-style runtime.
//!
//! Matrices are row-major: `m[row][col]`, translation in column 3.

use std::fmt;

use parallax_engine::gpu::TextureHandle;

use crate::eye::Eye;

/// Maximum number of devices reported by one pose query.
pub const MAX_TRACKED_DEVICES: usize = 64;

/// Device slot reserved for the headset.
pub const HMD_DEVICE_INDEX: usize = 0;

/// Row-major 3×4 affine transform.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HmdMatrix34 {
    pub m: [[f32; 4]; 3],
}

impl HmdMatrix34 {
    pub const IDENTITY: Self = Self {
        m: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
        ],
    };
}

/// Row-major 4×4 matrix.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HmdMatrix44 {
    pub m: [[f32; 4]; 4],
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackingResult {
    Uninitialized,
    CalibratingInProgress,
    CalibratingOutOfRange,
    RunningOk,
    RunningOutOfRange,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TrackedDevicePose {
    /// Device to tracking-space transform.
    pub device_to_absolute_tracking: HmdMatrix34,
    pub tracking_result: TrackingResult,
    pub pose_is_valid: bool,
    pub device_is_connected: bool,
}

impl Default for TrackedDevicePose {
    fn default() -> Self {
        Self {
            device_to_absolute_tracking: HmdMatrix34::IDENTITY,
            tracking_result: TrackingResult::Uninitialized,
            pose_is_valid: false,
            device_is_connected: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackedDeviceClass {
    Invalid,
    Hmd,
    Controller,
    GenericTracker,
    TrackingReference,
}

/// Compositor status codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompositorError {
    RequestFailed,
    DoNotHaveFocus,
    InvalidTexture,
    IsNotSceneApplication,
    TextureIsOnWrongDevice,
    TextureUsesUnsupportedFormat,
    AlreadySubmitted,
}

impl fmt::Display for CompositorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RequestFailed => "request failed",
            Self::DoNotHaveFocus => "application does not have focus",
            Self::InvalidTexture => "invalid texture",
            Self::IsNotSceneApplication => "not a scene application",
            Self::TextureIsOnWrongDevice => "texture is on the wrong device",
            Self::TextureUsesUnsupportedFormat => "texture uses an unsupported format",
            Self::AlreadySubmitted => "eye already submitted this frame",
        })
    }
}

impl std::error::Error for CompositorError {}

/// An open `OpenVR`-style system + compositor session.
///
/// Dropping the value must not shut the runtime down; the backend calls
/// [`shutdown`](Self::shutdown) exactly once when the session ends.
pub trait OpenVrRuntime {
    fn tracking_system_name(&self) -> String;

    fn model_number(&self) -> String;

    /// Per-eye render target size the runtime recommends.
    fn recommended_render_target_size(&self) -> (u32, u32);

    /// Row-major projection for `eye`, clip-space depth in `[0, 1]`.
    fn projection_matrix(&self, eye: Eye, near: f32, far: f32) -> HmdMatrix44;

    /// Eye to head transform.
    fn eye_to_head_transform(&self, eye: Eye) -> HmdMatrix34;

    fn tracked_device_class(&self, index: usize) -> TrackedDeviceClass;

    /// Blocks until the compositor is ready for the next frame and fills `poses`.
    fn wait_get_poses(&mut self, poses: &mut [TrackedDevicePose]) -> Result<(), CompositorError>;

    fn submit(&mut self, eye: Eye, texture: TextureHandle) -> Result<(), CompositorError>;

    /// Tells the compositor both eyes have been submitted.
    fn post_present_handoff(&mut self);

    fn shutdown(&mut self);
}
