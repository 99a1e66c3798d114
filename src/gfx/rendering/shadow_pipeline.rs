//! Variance shadow mapping
//!
//! Shadow casters are rendered from the light into a moment map holding
//! (depth, depth²) per texel. A box blur over the moments softens the
//! edges, and the main pass estimates how lit a fragment is from the
//! blurred moments with Chebyshev's inequality.
//!
//! Render targets, layouts and bind groups are created once; the passes
//! carry no state between frames beyond the textures themselves.

use serde::Deserialize;

use crate::{
    gfx::{
        resources::{global_bindings::GlobalBindings, texture_resource::TextureResource},
        scene::{object::DrawObject, SceneObject},
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Moment value the shadow targets are cleared to: nothing occludes.
const CLEAR_MOMENTS: wgpu::Color = wgpu::Color {
    r: 1.0,
    g: 1.0,
    b: 0.0,
    a: 1.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Edge length of the square moment maps in texels.
    pub map_size: u32,
    /// Blur kernel half-width; the kernel is `(2r + 1)²` taps.
    pub blur_radius: u32,
    /// Floor on the moment variance.
    pub min_variance: f32,
    /// Probability cut off before rescaling, to hide light bleeding.
    pub bleed_reduction: f32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            map_size: 1024,
            blur_radius: 2,
            min_variance: 8e-5,
            bleed_reduction: 0.1,
        }
    }
}

impl ShadowSettings {
    pub fn blur_taps(&self) -> u32 {
        let width = 2 * self.blur_radius + 1;
        width * width
    }
}

/// Fraction of direct light reaching a point at light-space depth `depth`,
/// given the blurred `(mean, mean of squares)` moments at its texel.
///
/// CPU twin of `light_factor` in `object.wgsl`; the two must agree.
pub fn light_factor(moments: [f32; 2], depth: f32, settings: &ShadowSettings) -> f32 {
    if depth >= 1.0 {
        return 1.0;
    }
    let [mean, mean_sq] = moments;
    let lit = if depth <= mean { 1.0 } else { 0.0 };
    let variance = (mean_sq - mean * mean).max(settings.min_variance);
    let d = depth - mean;
    let p_max = f32::max(lit, variance / (variance + d * d));
    ((p_max - settings.bleed_reduction) / (1.0 - settings.bleed_reduction)).clamp(0.0, 1.0)
}

/// MUST match `BlurUniforms` in `shadow_blur.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BlurUniforms {
    pub texel_size: [f32; 2],
    pub radius: i32,
    _padding: i32,
}

impl BlurUniforms {
    pub fn new(settings: &ShadowSettings) -> Self {
        let texel = 1.0 / settings.map_size as f32;
        Self {
            texel_size: [texel, texel],
            radius: settings.blur_radius as i32,
            _padding: 0,
        }
    }
}

/// MUST match `ShadowUniforms` in `object.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowUniforms {
    pub min_variance: f32,
    pub bleed_reduction: f32,
    _padding: [f32; 2],
}

impl From<&ShadowSettings> for ShadowUniforms {
    fn from(settings: &ShadowSettings) -> Self {
        Self {
            min_variance: settings.min_variance,
            bleed_reduction: settings.bleed_reduction,
            _padding: [0.0; 2],
        }
    }
}

pub struct ShadowPipeline {
    moments: TextureResource,
    blurred: TextureResource,
    depth: TextureResource,
    blur_layout: BindGroupLayoutWithDesc,
    blur_bind_group: wgpu::BindGroup,
    _blur_ubo: UniformBuffer<BlurUniforms>,
    sampling_layout: BindGroupLayoutWithDesc,
    sampling_bind_group: wgpu::BindGroup,
    _sampling_ubo: UniformBuffer<ShadowUniforms>,
}

impl ShadowPipeline {
    pub fn new(device: &wgpu::Device, settings: &ShadowSettings) -> Self {
        let size = settings.map_size;
        let moments = TextureResource::create_render_target(
            device,
            size,
            TextureResource::MOMENTS_FORMAT,
            "Shadow Moments",
        );
        let blurred = TextureResource::create_render_target(
            device,
            size,
            TextureResource::MOMENTS_FORMAT,
            "Blurred Shadow Moments",
        );
        let depth = TextureResource::create_depth_texture(device, size, size, "Shadow Depth");

        let blur_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .next_binding_fragment(binding_types::uniform())
            .create(device, "Shadow Blur Bind Group Layout");
        let blur_ubo = UniformBuffer::new_with_data(device, &BlurUniforms::new(settings));
        let blur_bind_group = BindGroupBuilder::new(&blur_layout)
            .texture(&moments.view)
            .sampler(&moments.sampler)
            .resource(blur_ubo.binding_resource())
            .create(device, "Shadow Blur Bind Group");

        let sampling_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .next_binding_fragment(binding_types::uniform())
            .create(device, "Shadow Sampling Bind Group Layout");
        let sampling_ubo = UniformBuffer::new_with_data(device, &ShadowUniforms::from(settings));
        let sampling_bind_group = BindGroupBuilder::new(&sampling_layout)
            .texture(&blurred.view)
            .sampler(&blurred.sampler)
            .resource(sampling_ubo.binding_resource())
            .create(device, "Shadow Sampling Bind Group");

        log::info!(
            "Shadow maps: {0}x{0}, {1}-tap blur",
            size,
            settings.blur_taps()
        );

        Self {
            moments,
            blurred,
            depth,
            blur_layout,
            blur_bind_group,
            _blur_ubo: blur_ubo,
            sampling_layout,
            sampling_bind_group,
            _sampling_ubo: sampling_ubo,
        }
    }

    pub fn blur_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.blur_layout.layout
    }

    /// Layout of the blurred moments as sampled by the main pass (group 3).
    pub fn sampling_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.sampling_layout.layout
    }

    pub fn sampling_bind_group(&self) -> &wgpu::BindGroup {
        &self.sampling_bind_group
    }

    /// Renders the moments of every caster as seen from the light.
    pub fn encode_moment_pass<'a>(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        pipeline: &wgpu::RenderPipeline,
        globals: &GlobalBindings,
        casters: impl Iterator<Item = &'a SceneObject>,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Moment Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.moments.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_MOMENTS),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, globals.bind_group(), &[]);
        for object in casters {
            pass.draw_object(object);
        }
    }

    /// Box-filters the raw moments into the texture the main pass samples.
    pub fn encode_blur_pass(&self, encoder: &mut wgpu::CommandEncoder, pipeline: &wgpu::RenderPipeline) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Shadow Blur Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.blurred.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_MOMENTS),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.blur_bind_group, &[]);
        // Fullscreen triangle generated from the vertex index.
        pass.draw(0..3, 0..1);
    }
}
