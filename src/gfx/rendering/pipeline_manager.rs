//! Render pipeline management system for wgpu
//!
//! Pipelines are described by a [`PipelineConfig`], registered under a name
//! and created together at startup. Shader compilation and pipeline
//! creation run inside wgpu validation error scopes, so a bad shader or an
//! incompatible layout becomes an [`Error::ResourceCreation`] instead of an
//! uncaptured device error.

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use crate::{
    error::{Error, Result},
    gfx::{resources::texture_resource::TextureResource, scene::vertex::Vertex},
};

/// Configuration for creating a render pipeline
///
/// Defines all parameters needed to create a wgpu render pipeline,
/// including shaders, bind group layouts, and render state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub shader: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub primitive_topology: PrimitiveTopology,
    pub cull_mode: Option<Face>,
    /// Depth attachment format; `None` disables depth testing.
    pub depth_format: Option<TextureFormat>,
    pub depth_compare: CompareFunction,
    pub depth_write: bool,
    pub color_targets: Vec<Option<ColorTargetState>>,
    /// For fullscreen passes whose vertices come from `vertex_index`.
    pub no_vertex_buffers: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            shader: "shader.wgsl".to_string(),
            bind_group_layouts: Vec::new(),
            primitive_topology: PrimitiveTopology::TriangleList,
            cull_mode: Some(Face::Back),
            depth_format: Some(TextureResource::DEPTH_FORMAT),
            depth_compare: CompareFunction::Less,
            depth_write: true,
            color_targets: vec![Some(ColorTargetState {
                format: TextureFormat::Bgra8Unorm,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
            no_vertex_buffers: false,
        }
    }
}

impl PipelineConfig {
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    /// Sets the shader for this pipeline (builder pattern)
    ///
    /// # Arguments
    /// * `shader` - Name the shader was loaded under
    pub fn with_shader(mut self, shader: &str) -> Self {
        self.shader = shader.to_string();
        self
    }

    /// Sets all bind group layouts at once, in group order (builder pattern)
    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    pub fn with_depth(mut self, compare: CompareFunction, write: bool) -> Self {
        self.depth_format = Some(TextureResource::DEPTH_FORMAT);
        self.depth_compare = compare;
        self.depth_write = write;
        self
    }

    pub fn without_depth(mut self) -> Self {
        self.depth_format = None;
        self
    }

    /// Replaces the color targets with a single opaque target of `format`.
    pub fn with_color_format(mut self, format: TextureFormat) -> Self {
        self.color_targets = vec![Some(ColorTargetState {
            format,
            blend: Some(BlendState::REPLACE),
            write_mask: ColorWrites::ALL,
        })];
        self
    }

    /// Configures pipeline for fullscreen rendering (no vertex buffers needed)
    ///
    /// Used for post-processing effects like the shadow blur
    pub fn with_no_vertex_buffers(mut self) -> Self {
        self.no_vertex_buffers = true;
        self
    }

    fn depth_stencil_state(&self) -> Option<DepthStencilState> {
        self.depth_format.map(|format| DepthStencilState {
            format,
            depth_write_enabled: self.depth_write,
            depth_compare: self.depth_compare,
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        })
    }
}

/// Owns compiled shaders and the render pipelines built from them
pub struct PipelineManager {
    device: Arc<Device>,
    pipelines: HashMap<String, RenderPipeline>,
    pipeline_configs: HashMap<String, PipelineConfig>,
    shader_modules: HashMap<String, ShaderModule>,
    pending_pipelines: Vec<String>,
}

impl PipelineManager {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            pipelines: HashMap::new(),
            pipeline_configs: HashMap::new(),
            shader_modules: HashMap::new(),
            pending_pipelines: Vec::new(),
        }
    }

    /// Registers a pipeline configuration without creating it
    ///
    /// Registered pipelines are built by [`Self::create_all_pipelines`].
    pub fn register_pipeline(&mut self, name: &str, config: PipelineConfig) {
        self.pipeline_configs.insert(name.to_string(), config);
        self.pending_pipelines.push(name.to_string());
    }

    /// Compiles a WGSL shader module and stores it under `name`.
    pub fn load_shader(&mut self, name: &str, source: &str) -> Result<()> {
        self.device.push_error_scope(ErrorFilter::Validation);
        let shader_module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(Error::ResourceCreation(format!(
                "shader '{}' failed to compile: {}",
                name, error
            )));
        }

        self.shader_modules.insert(name.to_string(), shader_module);
        Ok(())
    }

    /// Creates every pending pipeline, failing on the first that does not validate.
    pub fn create_all_pipelines(&mut self) -> Result<()> {
        for name in std::mem::take(&mut self.pending_pipelines) {
            let Some(config) = self.pipeline_configs.get(&name) else {
                continue;
            };
            let pipeline = self.create_pipeline_from_config(&name, config)?;
            log::debug!("Created pipeline '{}'", name);
            self.pipelines.insert(name, pipeline);
        }
        Ok(())
    }

    pub fn pipeline(&self, name: &str) -> Option<&RenderPipeline> {
        self.pipelines.get(name)
    }

    /// Creates a render pipeline from configuration
    fn create_pipeline_from_config(
        &self,
        name: &str,
        config: &PipelineConfig,
    ) -> Result<RenderPipeline> {
        let shader = self.shader_modules.get(&config.shader).ok_or_else(|| {
            Error::ResourceCreation(format!(
                "pipeline '{}' uses unknown shader '{}'",
                name, config.shader
            ))
        })?;

        self.device.push_error_scope(ErrorFilter::Validation);

        let bind_group_layout_refs: Vec<&BindGroupLayout> =
            config.bind_group_layouts.iter().collect();
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", name)),
                bind_group_layouts: &bind_group_layout_refs,
                push_constant_ranges: &[],
            });

        let vertex_buffers: &[VertexBufferLayout] = if config.no_vertex_buffers {
            &[]
        } else {
            &[Vertex::desc()]
        };

        let pipeline = self
            .device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&pipeline_layout),
                vertex: VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: vertex_buffers,
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    targets: &config.color_targets,
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: PrimitiveState {
                    topology: config.primitive_topology,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: config.cull_mode,
                    polygon_mode: PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: config.depth_stencil_state(),
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(Error::ResourceCreation(format!(
                "pipeline '{}': {}",
                name, error
            ))),
            None => Ok(pipeline),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_opaque_depth_tested() {
        let config = PipelineConfig::default();
        assert_eq!(config.cull_mode, Some(Face::Back));
        let depth = config.depth_stencil_state().unwrap();
        assert_eq!(depth.format, TextureResource::DEPTH_FORMAT);
        assert_eq!(depth.depth_compare, CompareFunction::Less);
        assert!(depth.depth_write_enabled);
        assert!(!config.no_vertex_buffers);
    }

    #[test]
    fn test_skybox_style_depth_state() {
        let config = PipelineConfig::default()
            .with_cull_mode(Some(Face::Front))
            .with_depth(CompareFunction::LessEqual, false);
        let depth = config.depth_stencil_state().unwrap();
        assert_eq!(depth.depth_compare, CompareFunction::LessEqual);
        assert!(!depth.depth_write_enabled);
    }

    #[test]
    fn test_fullscreen_config_has_no_depth_or_vertices() {
        let config = PipelineConfig::default()
            .without_depth()
            .with_no_vertex_buffers()
            .with_color_format(TextureResource::MOMENTS_FORMAT);
        assert!(config.depth_stencil_state().is_none());
        assert!(config.no_vertex_buffers);
        assert_eq!(config.color_targets.len(), 1);
        assert_eq!(
            config.color_targets[0].as_ref().map(|t| t.format),
            Some(TextureResource::MOMENTS_FORMAT)
        );
    }
}
