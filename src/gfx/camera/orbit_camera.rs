//! Orbital camera driven by pointer drags and scrolling
//!
//! The camera orbits a fixed target at the origin with +Y up. Its state is
//! four scalars (two angles, a radius and the aspect ratio); the view and
//! projection matrices are rebuilt from them.

use cgmath::{Matrix4, SquareMatrix, Vector3, Zero};
use serde::Deserialize;

use crate::gfx::math;

/// Vertical angle limit in radians, just short of the poles.
pub const MAX_VERTICAL_ANGLE: f32 = 1.57;

/// Pointer and scroll input, in window pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    /// Positive values zoom in.
    Scroll(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    /// The pointer is held; `anchor` is its last recorded position.
    Dragging { anchor: (f64, f64) },
}

/// Tunable camera parameters
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Radians per pixel of drag, and radius units per unit of scroll.
    pub sensitivity: f32,
    pub radius: f32,
    pub min_radius: f32,
    pub max_radius: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov: 1.3,
            near: 0.01,
            far: 100.0,
            sensitivity: 0.01,
            radius: 3.0,
            min_radius: 0.01,
            max_radius: 8.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    horizontal_angle: f32,
    vertical_angle: f32,
    radius: f32,
    target: Vector3<f32>,
    up: Vector3<f32>,
    aspect: f32,
    state: DragState,
    settings: CameraSettings,
    eye: Vector3<f32>,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
}

impl OrbitCamera {
    /// Creates a camera at angles (0, 0) for a viewport of `width` x `height` pixels.
    pub fn new(settings: CameraSettings, width: u32, height: u32) -> Self {
        let mut camera = Self {
            horizontal_angle: 0.0,
            vertical_angle: 0.0,
            radius: settings
                .radius
                .clamp(settings.min_radius, settings.max_radius),
            target: Vector3::zero(),
            up: Vector3::unit_y(),
            aspect: 1.0,
            state: DragState::Idle,
            settings,
            eye: Vector3::zero(),
            view: Matrix4::identity(),
            projection: Matrix4::identity(),
        };
        camera.resize(width, height);
        camera.update();
        camera
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        match (event, self.state) {
            (InputEvent::PointerDown { x, y }, _) => {
                self.state = DragState::Dragging { anchor: (x, y) };
            }
            (InputEvent::PointerMove { x, y }, DragState::Dragging { anchor }) => {
                let dx = (x - anchor.0) as f32;
                let dy = (y - anchor.1) as f32;
                self.horizontal_angle -= dx * self.settings.sensitivity;
                // Window y grows downwards: dragging down raises the eye.
                self.vertical_angle = (self.vertical_angle + dy * self.settings.sensitivity)
                    .clamp(-MAX_VERTICAL_ANGLE, MAX_VERTICAL_ANGLE);
                self.state = DragState::Dragging { anchor: (x, y) };
            }
            (InputEvent::PointerMove { .. }, DragState::Idle) => {}
            (InputEvent::PointerUp, _) => {
                self.state = DragState::Idle;
            }
            (InputEvent::Scroll(amount), _) => {
                self.radius = (self.radius - self.settings.sensitivity * amount)
                    .clamp(self.settings.min_radius, self.settings.max_radius);
            }
        }
    }

    /// Recomputes the eye position and view matrix from the current angles.
    pub fn update(&mut self) {
        let (h, v) = (self.horizontal_angle, self.vertical_angle);
        self.eye = self.target
            + Vector3::new(v.cos() * h.cos(), v.sin(), -v.cos() * h.sin()) * self.radius;
        self.view = math::look_at(self.eye, self.target, self.up);
    }

    /// Rebuilds the projection for a new viewport; the view is untouched.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
        self.projection = math::perspective(
            self.settings.fov,
            self.aspect,
            self.settings.near,
            self.settings.far,
        );
    }

    pub fn eye(&self) -> Vector3<f32> {
        self.eye
    }

    pub fn view(&self) -> Matrix4<f32> {
        self.view
    }

    pub fn projection(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn vertical_angle(&self) -> f32 {
        self.vertical_angle
    }

    pub fn horizontal_angle(&self) -> f32 {
        self.horizontal_angle
    }
}
