use glam::UVec2;

use crate::gpu::TextureHandle;

/// A texture that has already been decoded and uploaded.
///
/// Only the native handle and dimensions are needed to bind it to a texture unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    handle: TextureHandle,
    width: u32,
    height: u32,
}

impl Texture {
    pub fn new(handle: TextureHandle, width: u32, height: u32) -> Self {
        Self {
            handle,
            width,
            height,
        }
    }

    #[inline]
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }
}
