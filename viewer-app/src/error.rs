//! Error types for the display controller.

use thiserror::Error;
use viewer_core::CanvasError;

/// Errors raised by the display controller and the viewer host.
#[derive(Error, Debug)]
pub enum ControllerError {
    /// An adapter or store operation failed.
    #[error(transparent)]
    Canvas(#[from] CanvasError),

    /// A click coordinate could not be parsed.
    #[error("Invalid point '{0}': expected X,Y")]
    InvalidPoint(String),

    /// The controller's event sources closed.
    #[error("Event source closed: {0}")]
    SourceClosed(&'static str),
}

/// Result type for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;
