//! Colour model.
//!
//! Application-facing colours are sRGB-encoded with straight alpha. Everything that
//! reaches a shader (uniform vectors, light colours, clear colours on linear targets)
//! is converted to linear space first.

pub mod color;

pub use color::Color;
