use glam::{Mat4, UVec2};

/// Which projection variant a camera currently uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProjectionKind {
    Perspective,
    Orthographic,
    OrthographicWindow,
    Custom,
}

/// Projection parameters. Exactly one variant is active per camera.
///
/// All derived matrices are right-handed with clip-space depth in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in degrees, `(0, 180)`.
        fov_y_degrees: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        /// Half of the vertical extent of the view volume.
        size: f32,
        near: f32,
        far: f32,
    },
    /// One world unit per pixel, origin lower-left, visible z in `[-1, 1]`.
    OrthographicWindow,
    Custom(Mat4),
}

impl Projection {
    pub fn kind(&self) -> ProjectionKind {
        match self {
            Self::Perspective { .. } => ProjectionKind::Perspective,
            Self::Orthographic { .. } => ProjectionKind::Orthographic,
            Self::OrthographicWindow => ProjectionKind::OrthographicWindow,
            Self::Custom(_) => ProjectionKind::Custom,
        }
    }

    /// Derives the projection matrix for a viewport of `viewport` pixels.
    ///
    /// Not cached: the viewport may change between frames.
    pub fn matrix(&self, viewport: UVec2) -> Mat4 {
        let aspect = aspect(viewport);
        match *self {
            Self::Perspective {
                fov_y_degrees,
                near,
                far,
            } => Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far),
            Self::Orthographic { size, near, far } => {
                let half_w = size * aspect;
                Mat4::orthographic_rh(-half_w, half_w, -size, size, near, far)
            }
            Self::OrthographicWindow => {
                let w = viewport.x.max(1) as f32;
                let h = viewport.y.max(1) as f32;
                // near = -1 / far = 1 makes view-space z in [-1, 1] visible.
                Mat4::orthographic_rh(0.0, w, 0.0, h, -1.0, 1.0)
            }
            Self::Custom(m) => m,
        }
    }
}

#[inline]
fn aspect(viewport: UVec2) -> f32 {
    if viewport.x == 0 || viewport.y == 0 {
        1.0
    } else {
        viewport.x as f32 / viewport.y as f32
    }
}
