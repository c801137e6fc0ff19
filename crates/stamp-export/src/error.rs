//! Export errors.

use stamp_core::FileError;
use stamp_render::RendererError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Everything that can stop an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Output file {0} already exists")]
    OutputExists(PathBuf),
    #[error("--input must be valid JSON or a path to a valid JSON file. Received {0}")]
    InvalidInput(String),
    #[error("Scale factor must be a positive number! Received {0}")]
    InvalidScaleFactor(String),
    #[error("Failed to prepare render bundle: {0}")]
    Setup(String),
    #[error("Timed out after {0:?} waiting for the ready flag")]
    Timeout(Duration),
    #[error("Could not find render target, image was not generated")]
    NoRenderTarget,
    #[error("Render failed: {0}")]
    Render(#[from] RendererError),
    #[error("Image source error: {0}")]
    Source(#[from] FileError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Failures caused by the request rather than the exporter.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            ExportError::InvalidInput(_) | ExportError::InvalidScaleFactor(_)
        )
    }
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;
