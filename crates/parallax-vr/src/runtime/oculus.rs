//! Native surface of an `Oculus`-style runtime.
//!
//! Poses are a unit quaternion plus a position; eye frusta are described by tangent
//! half-angles instead of matrices.

use std::fmt;

use bitflags::bitflags;
use parallax_engine::gpu::TextureHandle;

use crate::eye::Eye;

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Quatf {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Vector3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Posef {
    pub orientation: Quatf,
    pub position: Vector3f,
}

impl Posef {
    pub const IDENTITY: Self = Self {
        orientation: Quatf {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        },
        position: Vector3f {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        },
    };
}

impl Default for Posef {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Frustum half-angles as tangents; all positive for a frustum containing the axis.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FovPort {
    pub up_tan: f32,
    pub down_tan: f32,
    pub left_tan: f32,
    pub right_tan: f32,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Sizei {
    pub w: i32,
    pub h: i32,
}

bitflags! {
    /// Tracking status of a pose.
    #[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
    pub struct StatusFlags: u32 {
        const ORIENTATION_TRACKED = 0x0001;
        const POSITION_TRACKED = 0x0002;
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct TrackingState {
    pub head_pose: Posef,
    pub status: StatusFlags,
    /// Left, right.
    pub hand_poses: [Posef; 2],
    pub hand_status: [StatusFlags; 2],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HmdDesc {
    pub product_name: String,
    pub manufacturer: String,
    pub resolution: Sizei,
    pub display_refresh_rate: f32,
    /// Left, right.
    pub default_eye_fov: [FovPort; 2],
}

/// Everything the compositor needs to display one stereo frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct EyeFovLayer {
    pub fov: [FovPort; 2],
    /// Eye poses the frame was rendered with, in tracking space.
    pub render_pose: [Posef; 2],
    pub viewport: [Sizei; 2],
}

/// Failure code reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OvrError {
    pub code: i32,
    pub message: String,
}

impl fmt::Display for OvrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for OvrError {}

/// An open `Oculus`-style session.
///
/// Swap chains are owned by the session; the backend destroys them and then calls
/// [`destroy`](Self::destroy) when the session ends.
pub trait OvrSession {
    fn hmd_desc(&self) -> HmdDesc;

    /// Recommended texture size for rendering `eye` with `fov` at `pixel_density`.
    fn fov_texture_size(&self, eye: Eye, fov: FovPort, pixel_density: f32) -> Sizei;

    /// Head to eye transform for an eye rendered with `fov`.
    fn hmd_to_eye_pose(&self, eye: Eye, fov: FovPort) -> Posef;

    /// Predicted tracking state for the display time of `frame_index`.
    fn tracking_state(&mut self, frame_index: u64) -> TrackingState;

    /// Creates the texture swap chain for `eye` and returns its images.
    fn create_swap_chain(
        &mut self,
        eye: Eye,
        size: Sizei,
        length: u32,
    ) -> Result<Vec<TextureHandle>, OvrError>;

    /// Index of the image to render into this frame.
    fn current_swap_chain_index(&self, eye: Eye) -> usize;

    /// Marks the current image of `eye` as complete and advances the chain.
    fn commit_swap_chain(&mut self, eye: Eye) -> Result<(), OvrError>;

    fn submit_frame(&mut self, frame_index: u64, layer: &EyeFovLayer) -> Result<(), OvrError>;

    fn destroy_swap_chain(&mut self, eye: Eye);

    fn destroy(&mut self);
}
