//! Viewport geometry shared by cameras, the GPU context and VR render targets.
//!
//! Two spaces are used:
//! - normalized viewport space: `[0, 1] x [0, 1]` fractions of a render target
//! - pixel space: integer rectangles of the bound render target, origin lower-left
//!
//! Cameras store the normalized form; it is resolved against the size of the
//! currently bound target every time it is applied.

mod rect;
mod viewport;

pub use rect::PixelRect;
pub use viewport::ViewportRect;
