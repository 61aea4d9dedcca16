//! wgpu device bring-up.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring an optional presentation Surface
//! - acquiring surface textures and triaging surface errors
//!
//! Window creation is left to the caller; any `SurfaceTarget<'static>` works.

mod error;
mod gpu;

pub use error::SurfaceErrorAction;
pub use gpu::{Gpu, GpuInit};
