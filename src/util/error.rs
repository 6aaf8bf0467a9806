//! Error types for the path tracer.
//!
//! Only the outer surfaces fail: loading parameters, scenes and
//! environment maps, and writing frames. Numerical degeneracy inside the
//! light-transport core is handled as ordinary control flow.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for path tracer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Tracing parameters failed validation
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Scene description is inconsistent (unknown material, bad indices, ...)
    #[error("Invalid scene: {0}")]
    InvalidScene(String),

    /// Environment map could not be used for importance sampling
    #[error("Invalid environment map: {0}")]
    EnvironmentMap(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl Error {
    /// Create an invalid config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid scene error.
    pub fn scene(msg: impl Into<String>) -> Self {
        Self::InvalidScene(msg.into())
    }
}

/// Result type alias for path tracer operations.
pub type Result<T> = std::result::Result<T, Error>;
