//! Renderable scene objects
//!
//! A [`SceneObject`] owns its processed mesh, placement and material, the
//! transforms derived each frame, and once uploaded, its GPU buffers and
//! bind groups. What textures an object samples is captured by its
//! [`TextureSet`]; the main pass chooses a pipeline from that tag.

use cgmath::{Matrix4, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;

use crate::{
    error::Result,
    gfx::{
        camera::camera_utils::{convert_matrix4_to_array, OPENGL_TO_WGPU_MATRIX},
        math,
        resources::texture_resource::{TextureProvider, TextureResource},
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

use super::mesh::Mesh;

/// Which shading path an object takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Lit, normal-mapped and shadowed.
    Standard,
    /// Background cube sampled by direction.
    Skybox,
}

/// Textures bound for an object's main-pass draw
pub enum TextureSet {
    Standard {
        color: TextureResource,
        normal: TextureResource,
    },
    Skybox {
        cubemap: TextureResource,
    },
}

impl TextureSet {
    pub fn kind(&self) -> ObjectKind {
        match self {
            TextureSet::Standard { .. } => ObjectKind::Standard,
            TextureSet::Skybox { .. } => ObjectKind::Skybox,
        }
    }

    fn create_bind_group(
        &self,
        device: &wgpu::Device,
        layouts: &ObjectLayouts,
        label: &str,
    ) -> wgpu::BindGroup {
        match self {
            TextureSet::Standard { color, normal } => {
                BindGroupBuilder::new(&layouts.standard_textures)
                    .texture(&color.view)
                    .texture(&normal.view)
                    .sampler(&color.sampler)
                    .create(device, label)
            }
            TextureSet::Skybox { cubemap } => BindGroupBuilder::new(&layouts.skybox_textures)
                .texture(&cubemap.view)
                .sampler(&cubemap.sampler)
                .create(device, label),
        }
    }
}

/// Uniform scale followed by a translation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f32,
    pub translation: Vector3<f32>,
}

impl Placement {
    pub fn new(scale: f32, translation: Vector3<f32>) -> Self {
        Self { scale, translation }
    }
}

/// Rigid animation applied on top of the placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    Static,
    /// Continuous rotation of `speed` radians per second about `axis`.
    Spin { axis: Vector3<f32>, speed: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub shininess: f32,
}

/// CPU-side transforms recomputed every frame, in OpenGL clip convention
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectTransforms {
    pub mv: Matrix4<f32>,
    /// Inverse-transpose of `mv`, for normals.
    pub invmv: Matrix4<f32>,
    pub mvp: Matrix4<f32>,
    pub mvp_light: Matrix4<f32>,
}

impl ObjectTransforms {
    pub fn compute(
        model: Matrix4<f32>,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        light_view_projection: Matrix4<f32>,
    ) -> Self {
        let mv = view * model;
        Self {
            mv,
            invmv: math::inverse_transpose(mv),
            mvp: projection * mv,
            mvp_light: light_view_projection * model,
        }
    }
}

impl Default for ObjectTransforms {
    fn default() -> Self {
        Self {
            mv: Matrix4::identity(),
            invmv: Matrix4::identity(),
            mvp: Matrix4::identity(),
            mvp_light: Matrix4::identity(),
        }
    }
}

/// Per-object uniform block; field order matches `ObjectUniforms` in the shaders
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniforms {
    pub mvp: [[f32; 4]; 4],
    pub invmv: [[f32; 4]; 4],
    pub mv: [[f32; 4]; 4],
    pub mvp_light: [[f32; 4]; 4],
}

impl From<&ObjectTransforms> for ObjectUniforms {
    /// Both clip-space matrices are remapped to wgpu's depth range here.
    fn from(transforms: &ObjectTransforms) -> Self {
        Self {
            mvp: convert_matrix4_to_array(OPENGL_TO_WGPU_MATRIX * transforms.mvp),
            invmv: convert_matrix4_to_array(transforms.invmv),
            mv: convert_matrix4_to_array(transforms.mv),
            mvp_light: convert_matrix4_to_array(OPENGL_TO_WGPU_MATRIX * transforms.mvp_light),
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniforms {
    pub shininess: f32,
    _padding: [f32; 3],
}

impl From<Material> for MaterialUniforms {
    fn from(material: Material) -> Self {
        Self {
            shininess: material.shininess,
            _padding: [0.0; 3],
        }
    }
}

/// Bind group layouts every object's bind groups are created against
pub struct ObjectLayouts {
    /// Group 1: [`ObjectUniforms`] and [`MaterialUniforms`].
    pub object: BindGroupLayoutWithDesc,
    /// Group 2 for [`TextureSet::Standard`]: color, normal map, sampler.
    pub standard_textures: BindGroupLayoutWithDesc,
    /// Group 2 for [`TextureSet::Skybox`]: cube texture, sampler.
    pub skybox_textures: BindGroupLayoutWithDesc,
}

impl ObjectLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            object: BindGroupLayoutBuilder::new()
                .next_binding_rendering(binding_types::uniform())
                .next_binding_fragment(binding_types::uniform())
                .create(device, "Object Bind Group Layout"),
            standard_textures: BindGroupLayoutBuilder::new()
                .next_binding_fragment(binding_types::texture_2d())
                .next_binding_fragment(binding_types::texture_2d())
                .next_binding_fragment(binding_types::sampler(
                    wgpu::SamplerBindingType::Filtering,
                ))
                .create(device, "Standard Textures Bind Group Layout"),
            skybox_textures: BindGroupLayoutBuilder::new()
                .next_binding_fragment(binding_types::texture_cube())
                .next_binding_fragment(binding_types::sampler(
                    wgpu::SamplerBindingType::Filtering,
                ))
                .create(device, "Skybox Textures Bind Group Layout"),
        }
    }
}

/// GPU-resident state of an uploaded object
pub struct ObjectGpuResources {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    object_ubo: UniformBuffer<ObjectUniforms>,
    material_ubo: UniformBuffer<MaterialUniforms>,
    object_bind_group: wgpu::BindGroup,
    textures: TextureSet,
    texture_bind_group: wgpu::BindGroup,
}

impl ObjectGpuResources {
    pub fn textures(&self) -> &TextureSet {
        &self.textures
    }

    pub fn texture_bind_group(&self) -> &wgpu::BindGroup {
        &self.texture_bind_group
    }
}

pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    pub placement: Placement,
    pub motion: Motion,
    pub material: Material,
    pub casts_shadow: bool,
    mesh: Mesh,
    model: Matrix4<f32>,
    transforms: ObjectTransforms,
    gpu_resources: Option<ObjectGpuResources>,
}

impl SceneObject {
    /// Creates a static, non-casting object with zero shininess.
    pub fn new(name: &str, kind: ObjectKind, mesh: Mesh, placement: Placement) -> Self {
        Self {
            name: name.to_string(),
            kind,
            model: math::model(placement.scale, placement.translation),
            placement,
            motion: Motion::Static,
            material: Material { shininess: 0.0 },
            casts_shadow: false,
            mesh,
            transforms: ObjectTransforms::default(),
            gpu_resources: None,
        }
    }

    pub fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = motion;
        self
    }

    pub fn with_shininess(mut self, shininess: f32) -> Self {
        self.material.shininess = shininess;
        self
    }

    pub fn with_shadow_casting(mut self, casts_shadow: bool) -> Self {
        self.casts_shadow = casts_shadow;
        self
    }

    /// Recomputes the model matrix for absolute scene time `time` in seconds.
    ///
    /// The spin angle is wrapped to `[0, 2π)` before narrowing to `f32`.
    pub fn update_model(&mut self, time: f64) {
        let Placement { scale, translation } = self.placement;
        self.model = match self.motion {
            Motion::Static => math::model(scale, translation),
            Motion::Spin { axis, speed } => {
                let angle = (f64::from(speed) * time).rem_euclid(std::f64::consts::TAU);
                math::model_rotated(scale, translation, angle as f32, axis)
            }
        };
    }

    pub fn update_transforms(
        &mut self,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        light_view_projection: Matrix4<f32>,
    ) {
        self.transforms =
            ObjectTransforms::compute(self.model, view, projection, light_view_projection);
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn model(&self) -> Matrix4<f32> {
        self.model
    }

    pub fn transforms(&self) -> &ObjectTransforms {
        &self.transforms
    }

    pub fn gpu_resources(&self) -> Option<&ObjectGpuResources> {
        self.gpu_resources.as_ref()
    }

    /// Uploads the mesh and creates uniform buffers, textures and bind groups.
    ///
    /// Textures come from `provider`; the returned set must match the
    /// object's [`ObjectKind`].
    pub fn init_gpu_resources(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &ObjectLayouts,
        provider: &impl TextureProvider,
    ) -> Result<()> {
        let textures = provider.texture_set(device, queue, &self.name, self.kind)?;
        if textures.kind() != self.kind {
            return Err(crate::error::Error::ResourceCreation(format!(
                "texture set for '{}' is {:?}, expected {:?}",
                self.name,
                textures.kind(),
                self.kind
            )));
        }

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", self.name)),
            contents: bytemuck::cast_slice(self.mesh.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", self.name)),
            contents: bytemuck::cast_slice(self.mesh.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        let object_ubo = UniformBuffer::new_with_data(device, &ObjectUniforms::from(&self.transforms));
        let material_ubo = UniformBuffer::new_with_data(device, &MaterialUniforms::from(self.material));
        let object_bind_group = BindGroupBuilder::new(&layouts.object)
            .resource(object_ubo.binding_resource())
            .resource(material_ubo.binding_resource())
            .create(device, &format!("{} Object Bind Group", self.name));
        let texture_bind_group =
            textures.create_bind_group(device, layouts, &format!("{} Textures", self.name));

        log::info!(
            "Uploaded '{}': {} vertices, {} triangles",
            self.name,
            self.mesh.vertices().len(),
            self.mesh.triangle_count()
        );

        self.gpu_resources = Some(ObjectGpuResources {
            vertex_buffer,
            index_buffer,
            index_count: self.mesh.indices().len() as u32,
            object_ubo,
            material_ubo,
            object_bind_group,
            textures,
            texture_bind_group,
        });
        Ok(())
    }

    /// Writes the current transforms and material to the GPU, if uploaded.
    pub fn write_uniforms(&mut self, queue: &wgpu::Queue) {
        if let Some(gpu) = self.gpu_resources.as_mut() {
            gpu.object_ubo
                .update_content(queue, ObjectUniforms::from(&self.transforms));
            gpu.material_ubo
                .update_content(queue, MaterialUniforms::from(self.material));
        }
    }
}

/// Draw helpers for scene objects on a render pass
pub trait DrawObject<'a> {
    /// Binds the object's uniforms at group 1 and draws its mesh.
    ///
    /// Objects without GPU resources are skipped.
    fn draw_object(&mut self, object: &'a SceneObject);
}

impl<'a, 'b> DrawObject<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_object(&mut self, object: &'b SceneObject) {
        let Some(gpu) = object.gpu_resources() else {
            return;
        };
        self.set_bind_group(1, &gpu.object_bind_group, &[]);
        self.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
        self.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..gpu.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector4};

    fn object(motion: Motion) -> SceneObject {
        SceneObject::new(
            "suzanne",
            ObjectKind::Standard,
            Mesh::default(),
            Placement::new(0.65, Vector3::new(0.5, 0.0, 0.5)),
        )
        .with_motion(motion)
    }

    #[test]
    fn test_uniform_layouts() {
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 4 * 64);
        assert_eq!(std::mem::size_of::<MaterialUniforms>(), 16);
    }

    #[test]
    fn test_static_model_ignores_time() {
        let mut obj = object(Motion::Static);
        let initial = obj.model();
        obj.update_model(12.5);
        assert_eq!(obj.model(), initial);
        assert_eq!(initial, math::model(0.65, Vector3::new(0.5, 0.0, 0.5)));
    }

    #[test]
    fn test_spin_rotates_about_axis_with_time() {
        let mut obj = object(Motion::Spin {
            axis: Vector3::unit_y(),
            speed: 1.0,
        });
        obj.update_model(std::f64::consts::FRAC_PI_2);

        // Object-space +X ends up along world -Z before the translation.
        let p = obj.model() * Vector4::new(1.0, 0.0, 0.0, 1.0);
        let expected = Vector4::new(0.5, 0.0, 0.5 - 0.65, 1.0);
        assert!((p - expected).magnitude() < 1e-5);
    }

    #[test]
    fn test_spin_angle_wraps_at_full_turns() {
        let spin = Motion::Spin {
            axis: Vector3::unit_y(),
            speed: 1.0,
        };
        let mut early = object(spin);
        let mut late = object(spin);
        early.update_model(0.5);
        late.update_model(0.5 + std::f64::consts::TAU * 100_000.0);

        let p = Vector4::new(1.0, 0.0, 0.0, 1.0);
        assert!((early.model() * p - late.model() * p).magnitude() < 1e-4);
    }

    #[test]
    fn test_transforms_compose_camera_and_light() {
        let mut obj = object(Motion::Static);
        let view = math::look_at(
            Vector3::new(0.0, 0.0, 3.0),
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::unit_y(),
        );
        let projection = math::perspective(1.3, 1.0, 0.01, 100.0);
        let light = math::orthographic(-2.0, 2.0, -2.0, 2.0, 0.1, 10.0);
        obj.update_transforms(view, projection, light);

        let t = obj.transforms();
        assert_eq!(t.mv, view * obj.model());
        assert_eq!(t.mvp, projection * view * obj.model());
        assert_eq!(t.mvp_light, light * obj.model());
        assert_eq!(t.invmv, math::inverse_transpose(t.mv));
    }

    #[test]
    fn test_uniforms_remap_clip_depth_only_for_projected_matrices() {
        let transforms = ObjectTransforms {
            mvp: math::perspective(1.0, 1.0, 1.0, 10.0),
            ..Default::default()
        };
        let uniforms = ObjectUniforms::from(&transforms);

        let gl = transforms.mvp * Vector4::new(0.0, 0.0, -1.0, 1.0);
        let wgpu_clip = cgmath::Matrix4::from(uniforms.mvp) * Vector4::new(0.0, 0.0, -1.0, 1.0);
        assert!((gl.z / gl.w + 1.0).abs() < 1e-5);
        assert!((wgpu_clip.z / wgpu_clip.w).abs() < 1e-5);

        assert_eq!(uniforms.mv, convert_matrix4_to_array(Matrix4::identity()));
        assert_eq!(uniforms.invmv, convert_matrix4_to_array(Matrix4::identity()));
    }
}
