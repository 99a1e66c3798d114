//! Error types shared across the renderer
//!
//! Loading failures (meshes, textures, configuration) are reported to the
//! caller; GPU object creation failures abort initialization. Per-frame
//! conditions such as a missing drawable are not errors: the frame is skipped.

use std::path::PathBuf;

/// Errors produced while loading assets or creating GPU resources
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The mesh source text is unparsable or internally inconsistent.
    #[error("malformed mesh (line {line}): {reason}")]
    MalformedMesh { line: usize, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A GPU object (buffer, texture, pipeline) could not be created.
    #[error("GPU resource creation failed: {0}")]
    ResourceCreation(String),

    #[error("failed to load texture '{name}': {source}")]
    Texture {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("surface error: {0}")]
    Surface(String),
}

impl Error {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Error::MalformedMesh {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
