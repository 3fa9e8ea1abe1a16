//! Error types for canvas operations.

use thiserror::Error;

use crate::store::SurfaceSlot;
use crate::surface::SurfaceId;

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in canvas operations.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// No surface is bound to the requested slot.
    #[error("No surface bound to slot: {0}")]
    NoSurface(SurfaceSlot),

    /// Hit testing was started twice on the same surface.
    #[error("Surface {0} is already listening for pointer events")]
    AlreadyListening(SurfaceId),

    /// A pixel grid with ragged rows or a partial trailing row.
    #[error("Invalid pixel grid: {0}")]
    InvalidGrid(String),

    /// Raw buffer length does not match the declared dimensions.
    #[error("Dimension mismatch: expected {expected} bytes, got {actual}")]
    DimensionMismatch {
        /// Expected buffer length in bytes.
        expected: usize,
        /// Actual buffer length in bytes.
        actual: usize,
    },

    /// Encoded image could not be decoded.
    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),

    /// Decode job was cancelled before it completed.
    #[error("Image decode cancelled")]
    DecodeCancelled,

    /// Pixel data could not be encoded.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// Invalid user-supplied value.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
