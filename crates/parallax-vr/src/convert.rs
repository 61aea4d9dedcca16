//! Native runtime math → engine math.
//!
//! Runtime matrices and poses are converted here, once, as they cross into the engine.
//! Everything downstream works on column-major `glam` values.

use glam::{Mat4, Quat, Vec3, Vec4};

use crate::runtime::oculus::{FovPort, Posef, Quatf, Vector3f};
use crate::runtime::openvr::{HmdMatrix34, HmdMatrix44};

/// Row-major 3×4 affine → column-major 4×4 with an implicit `(0, 0, 0, 1)` last row.
pub fn hmd34_to_mat4(m: &HmdMatrix34) -> Mat4 {
    let [r0, r1, r2] = m.m;
    Mat4::from_cols(
        Vec4::new(r0[0], r1[0], r2[0], 0.0),
        Vec4::new(r0[1], r1[1], r2[1], 0.0),
        Vec4::new(r0[2], r1[2], r2[2], 0.0),
        Vec4::new(r0[3], r1[3], r2[3], 1.0),
    )
}

/// Row-major 4×4 → column-major 4×4.
pub fn hmd44_to_mat4(m: &HmdMatrix44) -> Mat4 {
    // Rows read as columns give the transpose.
    Mat4::from_cols_array_2d(&m.m).transpose()
}

pub fn posef_to_mat4(pose: &Posef) -> Mat4 {
    let q = pose.orientation;
    let p = pose.position;
    let rotation = Quat::from_xyzw(q.x, q.y, q.z, q.w).normalize();
    Mat4::from_rotation_translation(rotation, Vec3::new(p.x, p.y, p.z))
}

/// Rigid part of `m` as a native pose. Scale is discarded.
pub fn mat4_to_posef(m: Mat4) -> Posef {
    let (_, rotation, translation) = m.to_scale_rotation_translation();
    Posef {
        orientation: Quatf {
            x: rotation.x,
            y: rotation.y,
            z: rotation.z,
            w: rotation.w,
        },
        position: Vector3f {
            x: translation.x,
            y: translation.y,
            z: translation.z,
        },
    }
}

/// Off-axis perspective projection from frustum tangents.
///
/// Right-handed, looking down -Z, clip-space depth `near → 0`, `far → 1`.
pub fn fov_projection(fov: &FovPort, near: f32, far: f32) -> Mat4 {
    let x_scale = 2.0 / (fov.left_tan + fov.right_tan);
    let x_offset = (fov.right_tan - fov.left_tan) / (fov.left_tan + fov.right_tan);
    let y_scale = 2.0 / (fov.up_tan + fov.down_tan);
    let y_offset = (fov.up_tan - fov.down_tan) / (fov.up_tan + fov.down_tan);
    let depth = far / (near - far);

    Mat4::from_cols(
        Vec4::new(x_scale, 0.0, 0.0, 0.0),
        Vec4::new(0.0, y_scale, 0.0, 0.0),
        Vec4::new(x_offset, y_offset, depth, -1.0),
        Vec4::new(0.0, 0.0, near * depth, 0.0),
    )
}
