//! View, projection and model matrix construction
//!
//! All functions are pure and produce column-major [`cgmath::Matrix4`] values in
//! the OpenGL clip convention (right-handed, depth mapped to [-1, 1]). The
//! renderer converts to wgpu's [0, 1] depth range only when uploading uniforms,
//! see [`crate::gfx::camera::camera_utils::OPENGL_TO_WGPU_MATRIX`].

use cgmath::{InnerSpace, Matrix, Matrix4, SquareMatrix, Vector3, Vector4};

/// Builds a right-handed view matrix looking from `eye` towards `target`.
///
/// `up` must not be parallel to `eye - target`; the result is NaN otherwise.
pub fn look_at(eye: Vector3<f32>, target: Vector3<f32>, up: Vector3<f32>) -> Matrix4<f32> {
    let z_axis = (eye - target).normalize();
    let x_axis = up.normalize().cross(z_axis).normalize();
    let y_axis = z_axis.cross(x_axis).normalize();

    Matrix4::from_cols(
        Vector4::new(x_axis.x, y_axis.x, z_axis.x, 0.0),
        Vector4::new(x_axis.y, y_axis.y, z_axis.y, 0.0),
        Vector4::new(x_axis.z, y_axis.z, z_axis.z, 0.0),
        Vector4::new(-x_axis.dot(eye), -y_axis.dot(eye), -z_axis.dot(eye), 1.0),
    )
}

/// Perspective projection with a vertical field of view in radians.
pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    let f = 1.0 / (fov / 2.0).tan();

    Matrix4::from_cols(
        Vector4::new(f / aspect, 0.0, 0.0, 0.0),
        Vector4::new(0.0, f, 0.0, 0.0),
        Vector4::new(0.0, 0.0, (far + near) / (near - far), -1.0),
        Vector4::new(0.0, 0.0, (2.0 * far * near) / (near - far), 0.0),
    )
}

/// Orthographic projection onto the box `[left, right] x [bottom, top] x [-near, -far]`.
pub fn orthographic(
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    near: f32,
    far: f32,
) -> Matrix4<f32> {
    Matrix4::from_cols(
        Vector4::new(2.0 / (right - left), 0.0, 0.0, 0.0),
        Vector4::new(0.0, 2.0 / (top - bottom), 0.0, 0.0),
        Vector4::new(0.0, 0.0, 2.0 / (near - far), 0.0),
        Vector4::new(
            (right + left) / (left - right),
            (top + bottom) / (bottom - top),
            (far + near) / (near - far),
            1.0,
        ),
    )
}

/// Rotation of `angle` radians about `axis` (normalized internally).
pub fn rotation(angle: f32, axis: Vector3<f32>) -> Matrix4<f32> {
    let axis = axis.normalize();
    let (s, c) = angle.sin_cos();
    let ci = 1.0 - c;

    let xy = axis.x * axis.y * ci;
    let xz = axis.x * axis.z * ci;
    let yz = axis.y * axis.z * ci;
    let xs = axis.x * s;
    let ys = axis.y * s;
    let zs = axis.z * s;

    Matrix4::from_cols(
        Vector4::new(axis.x * axis.x * ci + c, xy + zs, xz - ys, 0.0),
        Vector4::new(xy - zs, axis.y * axis.y * ci + c, yz + xs, 0.0),
        Vector4::new(xz + ys, yz - xs, axis.z * axis.z * ci + c, 0.0),
        Vector4::new(0.0, 0.0, 0.0, 1.0),
    )
}

pub fn scaling(scale: f32) -> Matrix4<f32> {
    Matrix4::from_diagonal(Vector4::new(scale, scale, scale, 1.0))
}

pub fn translation(t: Vector3<f32>) -> Matrix4<f32> {
    Matrix4::from_translation(t)
}

/// Model matrix `T * S`: a vertex is scaled, then translated.
pub fn model(scale: f32, t: Vector3<f32>) -> Matrix4<f32> {
    translation(t) * scaling(scale)
}

/// Model matrix `T * R * S`: a vertex is scaled, then rotated, then translated.
pub fn model_rotated(scale: f32, t: Vector3<f32>, angle: f32, axis: Vector3<f32>) -> Matrix4<f32> {
    translation(t) * rotation(angle, axis) * scaling(scale)
}

/// Full 4x4 inverse-transpose, used to carry normals into view space.
///
/// Only the upper 3x3 block is consumed by the shaders. A singular input
/// (e.g. a zero scale) yields the identity.
pub fn inverse_transpose(m: Matrix4<f32>) -> Matrix4<f32> {
    m.invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or_else(Matrix4::identity)
}
