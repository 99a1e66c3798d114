//! Global uniform bindings shared by every draw
//!
//! Bound at group 0 in all object pipelines.

use cgmath::Vector4;

use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

/// Per-frame global uniform content
///
/// MUST match the `FrameUniforms` struct in the shaders exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    /// Direction towards the light in camera view space (w = 0).
    pub light_direction: [f32; 4],
}

impl FrameUniforms {
    pub fn new(light_direction_view: Vector4<f32>) -> Self {
        Self {
            light_direction: light_direction_view.into(),
        }
    }
}

pub type GlobalUBO = UniformBuffer<FrameUniforms>;

/// Layout, buffer and bind group for [`FrameUniforms`]
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
    ubo: GlobalUBO,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Globals Bind Group Layout");
        let ubo = GlobalUBO::new_with_data(device, &FrameUniforms::default());
        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, "Globals Bind Group");

        GlobalBindings {
            bind_group_layout,
            bind_group,
            ubo,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, content: FrameUniforms) {
        self.ubo.update_content(queue, content);
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
