use cgmath::{InnerSpace, Matrix4, Vector3, Vector4};

use crate::gfx::math;

/// The single infinite directional light
///
/// Its view and orthographic projection are fixed for the session and frame
/// the whole scene; only the view-space direction changes with the camera.
#[derive(Debug, Clone)]
pub struct DirectionalLight {
    /// World-space direction towards the light (w = 0).
    direction: Vector4<f32>,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
}

impl DirectionalLight {
    pub fn new(position: Vector3<f32>, half_extent: f32, near: f32, far: f32) -> Self {
        Self {
            direction: position.normalize().extend(0.0),
            view: math::look_at(position, Vector3::new(0.0, 0.0, 0.0), Vector3::unit_y()),
            projection: math::orthographic(
                -half_extent,
                half_extent,
                -half_extent,
                half_extent,
                near,
                far,
            ),
        }
    }

    pub fn direction(&self) -> Vector4<f32> {
        self.direction
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view
    }

    /// Direction towards the light in the camera's view space, normalized.
    pub fn view_space_direction(&self, camera_view: Matrix4<f32>) -> Vector4<f32> {
        (camera_view * self.direction).normalize()
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self::new(Vector3::new(2.0, 2.0, 2.0), 2.0, 0.1, 10.0)
    }
}
