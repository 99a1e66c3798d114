use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use super::orbit_camera::{InputEvent, OrbitCamera};

/// Scroll distance in pixels reported for one wheel notch.
const PIXELS_PER_LINE: f32 = 20.0;

/// Translates window events into camera [`InputEvent`]s
#[derive(Debug, Default)]
pub struct CameraController {
    cursor: PhysicalPosition<f64>,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps a window event to camera input, if it is one the camera reacts to.
    ///
    /// Mouse button events carry no position, so the last cursor position is
    /// remembered from `CursorMoved`.
    pub fn translate(&mut self, event: &WindowEvent) -> Option<InputEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = *position;
                Some(InputEvent::PointerMove {
                    x: position.x,
                    y: position.y,
                })
            }
            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => Some(match state {
                ElementState::Pressed => InputEvent::PointerDown {
                    x: self.cursor.x,
                    y: self.cursor.y,
                },
                ElementState::Released => InputEvent::PointerUp,
            }),
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, lines) => lines * PIXELS_PER_LINE,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => *y as f32,
                };
                Some(InputEvent::Scroll(amount))
            }
            _ => None,
        }
    }

    /// Forwards a window event to the camera. Returns whether it was consumed.
    pub fn process_event(&mut self, event: &WindowEvent, camera: &mut OrbitCamera) -> bool {
        match self.translate(event) {
            Some(input) => {
                log::trace!("Camera input {:?}", input);
                camera.handle_input(input);
                true
            }
            None => false,
        }
    }
}
