//! # Graphics Module
//!
//! Everything between the mesh files on disk and the presented frame.
//!
//! - **Math** ([`math`]) - view, projection and model matrix construction
//! - **Camera System** ([`camera`]) - orbit camera driven by pointer drags and scrolling
//! - **Scene Management** ([`scene`]) - mesh loading and the flat list of scene objects
//! - **Resource Management** ([`resources`]) - textures and global uniforms
//! - **Rendering Pipeline** ([`rendering`]) - shadow moments, blur and the main pass
//!
//! ## Usage
//!
//! ```no_run
//! use penumbra::{config::Config, gfx::scene::Scene};
//!
//! let config = Config::default();
//! let mut scene = Scene::from_config(&config, 1280, 800)?;
//! scene.update(1.0 / 60.0);
//! # Ok::<(), penumbra::Error>(())
//! ```

pub mod camera;
pub mod math;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::orbit_camera::OrbitCamera;
pub use rendering::render_engine::RenderEngine;
