use glam::{Vec3, Vec4};

/// sRGB-encoded RGBA colour with straight (non-premultiplied) alpha.
///
/// This is the representation users write down. Use [`Color::to_linear`] before the
/// value is handed to lighting or blending code.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Creates a colour from sRGB bytes (`0`–`255`).
    #[inline]
    pub fn from_srgb_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Converts to linear RGB; alpha is carried through unchanged.
    #[inline]
    pub fn to_linear(self) -> Vec4 {
        Vec4::new(
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
            self.a,
        )
    }

    /// Linear RGB without alpha, as used by the light array.
    #[inline]
    pub fn to_linear_rgb(self) -> Vec3 {
        self.to_linear().truncate()
    }

    /// Inverse of [`Color::to_linear`].
    #[inline]
    pub fn from_linear(linear: Vec4) -> Self {
        Self::new(
            linear_to_srgb(linear.x),
            linear_to_srgb(linear.y),
            linear_to_srgb(linear.z),
            linear.w,
        )
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_fixed_points() {
        assert_eq!(Color::BLACK.to_linear(), Vec4::new(0.0, 0.0, 0.0, 1.0));
        let white = Color::WHITE.to_linear();
        assert!((white - Vec4::ONE).abs().max_element() < 1e-6);
    }

    #[test]
    fn mid_grey_is_darker_in_linear_space() {
        let lin = Color::rgb(0.5, 0.5, 0.5).to_linear();
        assert!((lin.x - 0.214_041).abs() < 1e-5);
    }

    #[test]
    fn alpha_is_not_converted() {
        assert_eq!(Color::new(0.5, 0.5, 0.5, 0.5).to_linear().w, 0.5);
    }

    #[test]
    fn linear_round_trip_is_close() {
        let c = Color::new(0.2, 0.6, 0.9, 1.0);
        let back = Color::from_linear(c.to_linear());
        assert!((back.r - c.r).abs() < 1e-5);
        assert!((back.g - c.g).abs() < 1e-5);
        assert!((back.b - c.b).abs() < 1e-5);
    }
}
