//! Per-draw uniform values, decoupled from how they reach the GPU.

mod set;

pub use set::UniformSet;
