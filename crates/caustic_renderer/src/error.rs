//! Error types for rendering and photon tracing.
//!
//! Only precondition violations surface here. Numerical-consistency
//! failures inside a trace (medium-stack underflow, non-finite radiance)
//! are recovered locally by dropping that path's contribution.

use thiserror::Error;

/// Errors reported to callers of the renderer and photon tracer.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Raytracer already running")]
    AlreadyRunning,

    #[error("Invalid camera: {0}")]
    InvalidCamera(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Light does not support photon emission: {0}")]
    EmissionUnsupported(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;
