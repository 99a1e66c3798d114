//! Penumbra
//!
//! A small forward renderer on wgpu and winit: textured, normal-mapped
//! meshes lit by one directional light with variance soft shadows, inside
//! a skybox, viewed through an orbit camera.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod wgpu_utils;

pub use app::PenumbraApp;
pub use config::Config;
pub use error::{Error, Result};
