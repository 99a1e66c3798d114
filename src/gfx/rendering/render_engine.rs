//! WGPU-based rendering engine
//!
//! Owns the surface, device and every pipeline, and records one frame as
//! three passes: shadow moments from the light, a blur over the moments,
//! and the main pass (lit objects, then the skybox).

use std::sync::Arc;

use crate::{
    config::Config,
    error::{Error, Result},
    gfx::{
        resources::{global_bindings::GlobalBindings, texture_resource::TextureResource},
        scene::{
            object::{DrawObject, ObjectLayouts, TextureSet},
            scene::Scene,
        },
    },
};

use super::{
    frame_gate::FrameGate,
    pipeline_manager::{PipelineConfig, PipelineManager},
    shadow_pipeline::ShadowPipeline,
};

const SHADOW_PIPELINE: &str = "Shadow";
const BLUR_PIPELINE: &str = "Blur";
const OBJECT_PIPELINE: &str = "Object";
const SKYBOX_PIPELINE: &str = "Skybox";

const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// What to do when the surface cannot hand out a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SurfaceRecovery {
    /// Reconfigure the surface and skip this frame.
    Reconfigure,
    /// Skip this frame and try again next tick.
    Skip,
    Fatal,
}

fn surface_recovery(error: &wgpu::SurfaceError) -> SurfaceRecovery {
    match error {
        wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost => SurfaceRecovery::Reconfigure,
        wgpu::SurfaceError::OutOfMemory => SurfaceRecovery::Fatal,
        wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceRecovery::Skip,
    }
}

/// Core rendering engine managing GPU resources and draw calls
///
/// The RenderEngine handles all low-level graphics operations including:
/// - Surface and device management
/// - Pipeline creation
/// - Depth buffer handling
/// - Variance shadow mapping with blur
/// - Bounding the number of frames in flight
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    pipeline_manager: PipelineManager,
    global_bindings: GlobalBindings,
    object_layouts: ObjectLayouts,
    shadow_pipeline: ShadowPipeline,
    frame_gate: FrameGate,
}

impl RenderEngine {
    /// Creates a new render engine for the given window
    ///
    /// Initializes wgpu, creates the depth buffer and shadow targets and
    /// builds every pipeline. Any GPU object that fails to create is
    /// reported as [`Error::ResourceCreation`].
    ///
    /// # Arguments
    /// * `window` - Window surface target for rendering
    /// * `width` - Initial surface width in pixels
    /// * `height` - Initial surface height in pixels
    /// * `app_config` - Shadow settings and frames-in-flight limit
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        app_config: &Config,
    ) -> Result<RenderEngine> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::Surface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| Error::ResourceCreation(format!("no suitable adapter: {}", e)))?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| Error::ResourceCreation(format!("device request failed: {}", e)))?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| Error::Surface("surface reports no formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: app_config.frames_in_flight as u32,
        };
        surface.configure(&device, &config);

        let depth_texture =
            TextureResource::create_depth_texture(&device, config.width, config.height, "depth_texture");

        let global_bindings = GlobalBindings::new(&device);
        let object_layouts = ObjectLayouts::new(&device);
        let shadow_pipeline = ShadowPipeline::new(&device, &app_config.shadows);

        let device_handle: Arc<wgpu::Device> = device.into();
        let queue_handle: Arc<wgpu::Queue> = queue.into();
        let mut pipeline_manager = PipelineManager::new(device_handle.clone());

        pipeline_manager.load_shader("object", include_str!("object.wgsl"))?;
        pipeline_manager.load_shader("skybox", include_str!("skybox.wgsl"))?;
        pipeline_manager.load_shader("shadow", include_str!("shadow_pass.wgsl"))?;
        pipeline_manager.load_shader("blur", include_str!("shadow_blur.wgsl"))?;

        // Both faces are rendered into the moment map to avoid light leaks
        // through open meshes.
        pipeline_manager.register_pipeline(
            SHADOW_PIPELINE,
            PipelineConfig::default()
                .with_label("SHADOW")
                .with_shader("shadow")
                .with_cull_mode(None)
                .with_color_format(TextureResource::MOMENTS_FORMAT)
                .with_bind_group_layouts(vec![
                    global_bindings.bind_group_layout().clone(),
                    object_layouts.object.layout.clone(),
                ]),
        );

        pipeline_manager.register_pipeline(
            BLUR_PIPELINE,
            PipelineConfig::default()
                .with_label("BLUR")
                .with_shader("blur")
                .with_cull_mode(None)
                .without_depth()
                .with_no_vertex_buffers()
                .with_color_format(TextureResource::MOMENTS_FORMAT)
                .with_bind_group_layouts(vec![shadow_pipeline.blur_bind_group_layout().clone()]),
        );

        pipeline_manager.register_pipeline(
            OBJECT_PIPELINE,
            PipelineConfig::default()
                .with_label("OBJECT")
                .with_shader("object")
                .with_color_format(format)
                .with_bind_group_layouts(vec![
                    global_bindings.bind_group_layout().clone(),
                    object_layouts.object.layout.clone(),
                    object_layouts.standard_textures.layout.clone(),
                    shadow_pipeline.sampling_bind_group_layout().clone(),
                ]),
        );

        // Seen from inside, so front faces are culled; depth is tested but
        // not written so it never hides real geometry.
        pipeline_manager.register_pipeline(
            SKYBOX_PIPELINE,
            PipelineConfig::default()
                .with_label("SKYBOX")
                .with_shader("skybox")
                .with_cull_mode(Some(wgpu::Face::Front))
                .with_depth(wgpu::CompareFunction::LessEqual, false)
                .with_color_format(format)
                .with_bind_group_layouts(vec![
                    global_bindings.bind_group_layout().clone(),
                    object_layouts.object.layout.clone(),
                    object_layouts.skybox_textures.layout.clone(),
                ]),
        );

        pipeline_manager.create_all_pipelines()?;
        log::info!(
            "Render engine ready: {}x{} {:?}, {} frames in flight",
            config.width,
            config.height,
            format,
            app_config.frames_in_flight
        );

        Ok(RenderEngine {
            surface,
            device: device_handle,
            queue: queue_handle,
            config,
            depth_texture,
            pipeline_manager,
            global_bindings,
            object_layouts,
            shadow_pipeline,
            frame_gate: FrameGate::new(app_config.frames_in_flight),
        })
    }

    /// Records and presents one frame of `scene`
    ///
    /// Blocks while the maximum number of frames is in flight. A frame whose
    /// surface texture is unavailable is skipped; only an out-of-memory
    /// surface is an error.
    pub fn render_frame(&mut self, scene: &mut Scene) -> Result<()> {
        let device = &self.device;
        let permit = self.frame_gate.acquire_with(|| {
            if let Err(error) = device.poll(wgpu::PollType::Wait) {
                log::warn!("Device poll failed while waiting for a frame slot: {}", error);
            }
        });

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(error) => {
                return match surface_recovery(&error) {
                    SurfaceRecovery::Reconfigure => {
                        log::warn!("Surface {:?}, reconfiguring", error);
                        self.surface.configure(&self.device, &self.config);
                        Ok(())
                    }
                    SurfaceRecovery::Skip => {
                        log::warn!("Skipping frame: {}", error);
                        Ok(())
                    }
                    SurfaceRecovery::Fatal => Err(Error::Surface(error.to_string())),
                };
            }
        };
        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.global_bindings
            .update(&self.queue, scene.frame_uniforms());
        scene.write_uniforms(&self.queue);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.shadow_pipeline.encode_moment_pass(
            &mut encoder,
            self.pipeline(SHADOW_PIPELINE)?,
            &self.global_bindings,
            scene.shadow_casters(),
        );
        self.shadow_pipeline
            .encode_blur_pass(&mut encoder, self.pipeline(BLUR_PIPELINE)?);
        self.encode_main_pass(&mut encoder, &surface_texture_view, scene)?;

        self.queue.submit(std::iter::once(encoder.finish()));
        self.queue.on_submitted_work_done(move || drop(permit));
        surface_texture.present();
        log::trace!(
            "Frame submitted at t = {:.3}s, {} in flight",
            scene.time(),
            self.frame_gate.in_flight()
        );
        Ok(())
    }

    fn encode_main_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        scene: &Scene,
    ) -> Result<()> {
        let object_pipeline = self.pipeline(OBJECT_PIPELINE)?;
        let skybox_pipeline = self.pipeline(SKYBOX_PIPELINE)?;

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);

        render_pass.set_pipeline(object_pipeline);
        render_pass.set_bind_group(3, self.shadow_pipeline.sampling_bind_group(), &[]);
        for object in scene.objects() {
            let Some(gpu) = object.gpu_resources() else {
                continue;
            };
            if let TextureSet::Standard { .. } = gpu.textures() {
                render_pass.set_bind_group(2, gpu.texture_bind_group(), &[]);
                render_pass.draw_object(object);
            }
        }

        // Skybox last, so it only fills pixels no object covered.
        render_pass.set_pipeline(skybox_pipeline);
        for object in scene.objects() {
            let Some(gpu) = object.gpu_resources() else {
                continue;
            };
            if let TextureSet::Skybox { .. } = gpu.textures() {
                render_pass.set_bind_group(2, gpu.texture_bind_group(), &[]);
                render_pass.draw_object(object);
            }
        }
        Ok(())
    }

    fn pipeline(&self, name: &str) -> Result<&wgpu::RenderPipeline> {
        self.pipeline_manager
            .pipeline(name)
            .ok_or_else(|| Error::ResourceCreation(format!("pipeline '{}' was never created", name)))
    }

    /// Resizes the render engine surface and recreates depth buffer
    ///
    /// Zero-sized requests (minimized windows) are ignored. The shadow map
    /// keeps its fixed resolution.
    ///
    /// # Arguments
    /// * `width` - New surface width in pixels
    /// * `height` - New surface height in pixels
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, width, height, "depth_texture");
    }

    /// Returns reference to the wgpu device
    ///
    /// Used for creating GPU resources like buffers and textures.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns reference to the wgpu command queue
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Layouts scene objects must create their bind groups against
    pub fn object_layouts(&self) -> &ObjectLayouts {
        &self.object_layouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_surface_is_reconfigured() {
        assert_eq!(
            surface_recovery(&wgpu::SurfaceError::Outdated),
            SurfaceRecovery::Reconfigure
        );
        assert_eq!(
            surface_recovery(&wgpu::SurfaceError::Lost),
            SurfaceRecovery::Reconfigure
        );
    }

    #[test]
    fn test_timeout_skips_frame() {
        assert_eq!(
            surface_recovery(&wgpu::SurfaceError::Timeout),
            SurfaceRecovery::Skip
        );
        assert_eq!(
            surface_recovery(&wgpu::SurfaceError::Other),
            SurfaceRecovery::Skip
        );
    }

    #[test]
    fn test_out_of_memory_is_fatal() {
        assert_eq!(
            surface_recovery(&wgpu::SurfaceError::OutOfMemory),
            SurfaceRecovery::Fatal
        );
    }
}
