use thiserror::Error;

use crate::render::RendererInitError;
use crate::storage::LoadFailure;

/// Failure of a startup step. Fatal to startup; nothing is rolled back.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to download resources: {0}")]
    Resources(String),

    #[error(transparent)]
    Renderer(#[from] RendererInitError),

    #[error(transparent)]
    Load(#[from] LoadFailure),

    #[error("startup step {step} panicked: {message}")]
    Panicked { step: usize, message: String },

    #[error("{0}")]
    Step(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
