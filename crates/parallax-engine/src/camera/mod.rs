//! Camera: a view transform plus a projection specification.
//!
//! The projection matrix is derived on demand from the active variant and the pixel
//! size of the viewport it is applied to, so a camera can be reused across targets of
//! different sizes (window, per-eye VR targets) without being rebuilt.

mod projection;

use glam::{Mat4, Quat, UVec2, Vec2, Vec3};

use crate::coords::{PixelRect, ViewportRect};

pub use projection::{Projection, ProjectionKind};

/// World-space ray.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// View + projection state. A plain value type: copy it freely.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    projection: Projection,
    view: Mat4,
    viewport: ViewportRect,
}

impl Camera {
    /// Perspective camera (60° vertical FOV, near 0.1, far 150) at the origin looking
    /// down -Z, covering the whole target.
    pub fn new() -> Self {
        Self {
            projection: Projection::Perspective {
                fov_y_degrees: 60.0,
                near: 0.1,
                far: 150.0,
            },
            view: Mat4::IDENTITY,
            viewport: ViewportRect::FULL,
        }
    }

    /// Places the camera at `eye`, facing `at`, with `up` fixing the roll.
    ///
    /// Preconditions: `at != eye` and `up` is not parallel to `at - eye`. Violating
    /// them yields a non-finite view transform; debug builds assert.
    pub fn look_at(&mut self, eye: Vec3, at: Vec3, up: Vec3) {
        let forward = at - eye;
        debug_assert!(forward.length_squared() > 0.0, "look_at: eye and target coincide");
        debug_assert!(
            forward.cross(up).length_squared() > f32::EPSILON * forward.length_squared(),
            "look_at: up is parallel to the view direction"
        );
        self.view = Mat4::look_at_rh(eye, at, up);
    }

    /// Switches to a perspective projection.
    ///
    /// `fov_y_degrees` must lie in `(0, 180)` and `0 < near < far`.
    pub fn set_perspective_projection(&mut self, fov_y_degrees: f32, near: f32, far: f32) {
        debug_assert!(fov_y_degrees > 0.0 && fov_y_degrees < 180.0);
        debug_assert!(near > 0.0 && near < far);
        self.projection = Projection::Perspective {
            fov_y_degrees,
            near,
            far,
        };
    }

    /// Switches to an orthographic projection; `size` is half the vertical extent and
    /// the horizontal extent follows the viewport aspect ratio.
    pub fn set_orthographic_projection(&mut self, size: f32, near: f32, far: f32) {
        debug_assert!(size > 0.0);
        debug_assert!(near != far);
        self.projection = Projection::Orthographic { size, near, far };
    }

    /// Maps one world unit to one pixel of the current viewport, origin lower-left.
    pub fn set_window_coordinates(&mut self) {
        self.projection = Projection::OrthographicWindow;
    }

    pub fn set_view_transform(&mut self, view: Mat4) {
        self.view = view;
    }

    /// Overrides the projection with a fixed matrix.
    pub fn set_projection_transform(&mut self, projection: Mat4) {
        self.projection = Projection::Custom(projection);
    }

    #[inline]
    pub fn view_transform(&self) -> Mat4 {
        self.view
    }

    #[inline]
    pub fn projection(&self) -> Projection {
        self.projection
    }

    /// Projection matrix for a viewport of `viewport_size` pixels.
    #[inline]
    pub fn projection_transform(&self, viewport_size: UVec2) -> Mat4 {
        self.projection.matrix(viewport_size)
    }

    /// Sets the normalized viewport. Values outside `[0, 1]` are a caller error and
    /// produce a viewport that extends past the target.
    pub fn set_viewport(&mut self, offset: Vec2, size: Vec2) {
        if !ViewportRect::new(offset, size).is_within_unit_square() {
            log::debug!("camera viewport {offset}+{size} extends outside the target");
        }
        self.viewport = ViewportRect::new(offset, size);
    }

    #[inline]
    pub fn viewport(&self) -> ViewportRect {
        self.viewport
    }

    /// The viewport resolved against a target of `target` pixels.
    #[inline]
    pub fn viewport_pixels(&self, target: UVec2) -> PixelRect {
        self.viewport.to_pixels(target)
    }

    /// World-space position of the camera.
    pub fn position(&self) -> Vec3 {
        self.view.inverse().w_axis.truncate()
    }

    /// Sets the view transform from a world-space pose.
    pub fn set_position_and_rotation(&mut self, position: Vec3, rotation: Quat) {
        self.view = Mat4::from_rotation_translation(rotation, position).inverse();
    }

    /// Ray through `point` (viewport pixels, lower-left origin) for a viewport of
    /// `viewport_size` pixels.
    pub fn screen_point_to_ray(&self, point: Vec2, viewport_size: UVec2) -> Ray {
        let size = viewport_size.max(UVec2::ONE).as_vec2();
        let ndc = point / size * 2.0 - Vec2::ONE;
        let inv = (self.projection_transform(viewport_size) * self.view).inverse();
        let near = inv.project_point3(ndc.extend(0.0));
        let far = inv.project_point3(ndc.extend(1.0));
        Ray {
            origin: near,
            direction: (far - near).normalize(),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
