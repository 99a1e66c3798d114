use anyhow::Context;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::{
    config::Config,
    gfx::{
        camera::CameraController, rendering::RenderEngine, resources::ImageTextureProvider,
        scene::Scene,
    },
};

/// Frame delta clock; deltas are clamped so a stall does not jump the animation.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
            dt_min: Duration::from_micros(100),
            dt_max: Duration::from_millis(250),
        }
    }

    /// Seconds since the previous tick.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;
        dt.as_secs_f32()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

pub struct PenumbraApp {
    config: Config,
}

struct AppState {
    config: Config,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    scene: Option<Scene>,
    controller: CameraController,
    clock: FrameClock,
    error: Option<anyhow::Error>,
}

impl PenumbraApp {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Opens the window and runs until it is closed or a fatal error occurs.
    pub fn run(self) -> anyhow::Result<()> {
        let event_loop = EventLoop::new().context("failed to create event loop")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut state = AppState {
            config: self.config,
            window: None,
            render_engine: None,
            scene: None,
            controller: CameraController::new(),
            clock: FrameClock::new(),
            error: None,
        };
        event_loop
            .run_app(&mut state)
            .context("event loop terminated abnormally")?;

        match state.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn init(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_config = &self.config.window;
        let window = Arc::new(
            event_loop
                .create_window(
                    Window::default_attributes()
                        .with_title(window_config.title.clone())
                        .with_inner_size(LogicalSize::new(window_config.width, window_config.height)),
                )
                .context("failed to create window")?,
        );
        let (width, height) = window.inner_size().into();

        let render_engine =
            pollster::block_on(RenderEngine::new(window.clone(), width, height, &self.config))
                .context("failed to initialize the renderer")?;

        let mut scene = Scene::from_config(&self.config, width, height)
            .context("failed to load the scene")?;
        let textures = ImageTextureProvider::new(self.config.assets.clone());
        scene
            .init_gpu_resources(
                render_engine.device(),
                render_engine.queue(),
                render_engine.object_layouts(),
                &textures,
            )
            .context("failed to upload the scene")?;
        log::info!("Scene ready with {} objects", scene.objects().len());

        self.window = Some(window);
        self.render_engine = Some(render_engine);
        self.scene = Some(scene);
        self.clock = FrameClock::new();
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(error) = self.init(event_loop) {
            self.fail(event_loop, error);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let (Some(render_engine), Some(scene)) = (self.render_engine.as_mut(), self.scene.as_mut())
        else {
            return;
        };

        if self.controller.process_event(&event, &mut scene.camera) {
            return;
        }

        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            }
            | WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                scene.camera.resize(width, height);
                render_engine.resize(width, height);
            }
            WindowEvent::RedrawRequested => {
                scene.update(self.clock.tick());
                if let Err(error) = render_engine.render_frame(scene) {
                    let error = anyhow::Error::new(error).context("rendering failed");
                    self.fail(event_loop, error);
                }
            }
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}
