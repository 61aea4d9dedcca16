use glam::UVec2;

/// Integer rectangle in render-target pixels (lower-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle covering a whole target of the given size.
    #[inline]
    pub const fn full(size: UVec2) -> Self {
        Self::new(0, 0, size.x, size.y)
    }

    #[inline]
    pub fn size(self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height; `1.0` for an empty rectangle.
    #[inline]
    pub fn aspect(self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Clamps the rectangle so it lies within a target of `size` pixels.
    pub fn clamped_to(self, size: UVec2) -> Self {
        let x = self.x.min(size.x);
        let y = self.y.min(size.y);
        let x2 = self.x.saturating_add(self.width).min(size.x);
        let y2 = self.y.saturating_add(self.height).min(size.y);
        Self::new(x, y, x2 - x, y2 - y)
    }
}
