//! Core rendering functionality
//!
//! Handles render pipelines, shadow mapping, frame pacing and frame rendering.

pub mod frame_gate;
pub mod pipeline_manager;
pub mod render_engine;
pub mod shadow_pipeline;

// Re-export main types
pub use frame_gate::{FrameGate, FramePermit};
pub use pipeline_manager::{PipelineConfig, PipelineManager};
pub use render_engine::RenderEngine;
pub use shadow_pipeline::{light_factor, ShadowPipeline, ShadowSettings};
