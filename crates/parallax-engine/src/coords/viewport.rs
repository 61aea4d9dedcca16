use glam::{UVec2, Vec2};

use super::PixelRect;

/// Viewport as a fraction of the render target, `[0, 1] x [0, 1]`.
///
/// Values outside that range are not rejected; they resolve to a pixel rectangle
/// that lies (partly) outside the target, which the GPU clips.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportRect {
    pub offset: Vec2,
    pub size: Vec2,
}

impl ViewportRect {
    /// The whole render target.
    pub const FULL: Self = Self {
        offset: Vec2::ZERO,
        size: Vec2::ONE,
    };

    #[inline]
    pub const fn new(offset: Vec2, size: Vec2) -> Self {
        Self { offset, size }
    }

    /// Resolves the normalized rectangle against a target of `target` pixels.
    ///
    /// Negative offsets saturate at zero.
    pub fn to_pixels(self, target: UVec2) -> PixelRect {
        let t = target.as_vec2();
        let origin = (self.offset * t).round().max(Vec2::ZERO);
        let size = (self.size * t).round().max(Vec2::ZERO);
        PixelRect::new(origin.x as u32, origin.y as u32, size.x as u32, size.y as u32)
    }

    #[inline]
    pub fn is_within_unit_square(self) -> bool {
        let max = self.offset + self.size;
        self.offset.cmpge(Vec2::ZERO).all() && max.cmple(Vec2::ONE).all()
    }
}

impl Default for ViewportRect {
    fn default() -> Self {
        Self::FULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_viewport_covers_target() {
        let px = ViewportRect::FULL.to_pixels(UVec2::new(1280, 720));
        assert_eq!(px, PixelRect::new(0, 0, 1280, 720));
    }

    #[test]
    fn half_viewport_resolves_to_right_half() {
        let vp = ViewportRect::new(Vec2::new(0.5, 0.0), Vec2::new(0.5, 1.0));
        assert_eq!(vp.to_pixels(UVec2::new(800, 600)), PixelRect::new(400, 0, 400, 600));
    }

    #[test]
    fn out_of_range_viewport_is_not_rejected() {
        let vp = ViewportRect::new(Vec2::new(0.75, 0.0), Vec2::new(0.5, 1.0));
        assert!(!vp.is_within_unit_square());
        assert_eq!(vp.to_pixels(UVec2::new(100, 100)), PixelRect::new(75, 0, 50, 100));
    }
}
