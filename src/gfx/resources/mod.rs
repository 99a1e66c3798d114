//! GPU resource management
//!
//! Handles textures, uniform buffers and bind groups for rendering.

pub mod global_bindings;
pub mod texture_resource;

pub use global_bindings::{FrameUniforms, GlobalBindings};
pub use texture_resource::{ImageTextureProvider, TextureProvider, TextureResource};
