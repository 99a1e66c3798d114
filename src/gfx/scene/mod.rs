//! # Scene Management Module
//!
//! A flat scene: a fixed set of objects, one orbit camera and one directional
//! light, plus the mesh loading and vertex types the objects are built from.
//!
//! - [`Scene`] - owns the camera, light and objects and updates them per frame
//! - [`SceneObject`] - mesh, placement, material and per-frame transforms
//! - [`MeshLoader`] - parses the text mesh format into a [`Mesh`]
//! - [`Vertex`] - GPU vertex with a tangent-space basis

pub mod light;
pub mod mesh;
pub mod object;
pub mod scene;
pub mod vertex;

pub use light::DirectionalLight;
pub use mesh::{FaceKey, LoadMode, Mesh, MeshLoader};
pub use object::{DrawObject, ObjectKind, SceneObject, TextureSet};
pub use scene::Scene;
pub use vertex::Vertex;
