//! Head-tracked stereo rendering for the parallax engine.
//!
//! [`VrDevice`] drives one stereo frame per [`VrDevice::render`] call against either
//! an `OpenVR`-style or an `Oculus`-style tracking runtime. Runtimes are reached
//! through the traits in [`runtime`]; their native matrices and poses are converted
//! to engine math once, in [`convert`].

mod backend;
mod config;
pub mod convert;
mod device;
mod error;
mod eye;
pub mod runtime;

#[cfg(test)]
mod testing;

pub use backend::ControllerPose;
pub use config::{VrBackendKind, VrConfig};
pub use device::{RenderCallback, VrDevice, VrFrameStats};
pub use error::VrError;
pub use eye::Eye;
pub use runtime::VrRuntimes;
