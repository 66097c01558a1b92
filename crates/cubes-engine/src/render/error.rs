use thiserror::Error;

/// Per-frame graphics error, drained from the renderer after each draw.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("INVALID_OPERATION")]
    InvalidOperation,
    #[error("OUT_OF_MEMORY")]
    OutOfMemory,
    #[error("SURFACE_OUTDATED")]
    SurfaceOutdated,
    #[error("TIMEOUT")]
    Timeout,
    /// The context is gone; drawing is suppressed until it comes back.
    #[error("CONTEXT_LOST")]
    ContextLost,
    #[error("{0}")]
    Other(String),
}

/// Renderer construction failure.
#[derive(Debug, Error)]
pub enum RendererInitError {
    /// The platform cannot render at all (no adapter, no surface support).
    #[error("graphics are not supported here: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}
