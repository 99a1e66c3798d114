use cgmath::Matrix4;

/// Remaps OpenGL clip depth `[-1, 1]` to wgpu's `[0, 1]`.
///
/// Applied once, when CPU-side matrices are packed into GPU uniforms.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

pub fn convert_matrix4_to_array(matrix4: Matrix4<f32>) -> [[f32; 4]; 4] {
    matrix4.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    #[test]
    fn test_opengl_to_wgpu_maps_depth_range() {
        let near = OPENGL_TO_WGPU_MATRIX * Vector4::new(0.3, -0.2, -1.0, 1.0);
        let far = OPENGL_TO_WGPU_MATRIX * Vector4::new(0.3, -0.2, 1.0, 1.0);
        assert_eq!(near, Vector4::new(0.3, -0.2, 0.0, 1.0));
        assert_eq!(far, Vector4::new(0.3, -0.2, 1.0, 1.0));
    }

    #[test]
    fn test_convert_matrix4_to_array_is_column_major() {
        let m = Matrix4::from_translation(cgmath::Vector3::new(1.0, 2.0, 3.0));
        let columns = convert_matrix4_to_array(m);
        assert_eq!(columns[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(columns[0], [1.0, 0.0, 0.0, 0.0]);
    }
}
