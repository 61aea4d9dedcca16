//! Fixed-size light array uploaded with every draw.

use glam::{Vec3, Vec4};

use crate::paint::Color;

/// Number of light slots the renderer carries.
pub const MAX_LIGHTS: usize = 4;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum LightKind {
    /// Slot contributes nothing.
    #[default]
    Unused,
    /// Infinitely distant light shining along `direction`.
    Directional,
    /// Omni light at `position`, falling off to zero at `range`.
    Point,
}

impl LightKind {
    /// Encoding used in the `w` component of the position/type vector.
    #[inline]
    pub fn shader_code(self) -> f32 {
        match self {
            Self::Unused => 0.0,
            Self::Directional => 1.0,
            Self::Point => 2.0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Color,
    pub range: f32,
}

impl Light {
    pub const UNUSED: Self = Self {
        kind: LightKind::Unused,
        position: Vec3::ZERO,
        direction: Vec3::NEG_Z,
        color: Color::BLACK,
        range: 0.0,
    };

    pub fn directional(direction: Vec3, color: Color) -> Self {
        Self {
            kind: LightKind::Directional,
            direction: direction.normalize_or(Vec3::NEG_Z),
            color,
            ..Self::UNUSED
        }
    }

    pub fn point(position: Vec3, color: Color, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            color,
            range,
            ..Self::UNUSED
        }
    }

    /// `xyz` = world position (point) or direction the light travels (directional),
    /// `w` = [`LightKind::shader_code`].
    pub fn position_type(&self) -> Vec4 {
        let xyz = match self.kind {
            LightKind::Directional => self.direction,
            LightKind::Point | LightKind::Unused => self.position,
        };
        xyz.extend(self.kind.shader_code())
    }

    /// `xyz` = linear colour, `w` = range.
    pub fn color_range(&self) -> Vec4 {
        self.color.to_linear_rgb().extend(self.range)
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::UNUSED
    }
}
