//! # Pixel Viewer Core
//!
//! Core types for inspecting raster images on a software drawing surface.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 viewer-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Pixels          │  Surface                 │
//! │  - Pixel / CSS   │  - RGBA buffer           │
//! │  - PixelGrid     │  - Affine transform      │
//! │  - ImageData     │  - Pointer listeners     │
//! ├─────────────────────────────────────────────┤
//! │  Hit testing     │  Store                   │
//! │  - Sessions      │  - Bound surfaces        │
//! │  - Pointer events│  - Zoom / reset / images │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod event;
pub mod pixel;
pub mod session;
pub mod store;
pub mod surface;
pub mod transform;
pub mod zoom;

pub use error::{CanvasError, CanvasResult};
pub use event::{Listener, ListenerId, PointerEvent, PointerKind};
pub use pixel::{CssAlpha, EncodedImage, ImageData, Pixel, PixelGrid, CHANNELS};
pub use session::{HitTestSessions, Session, SessionState};
pub use store::{CanvasStore, DerivedImage, SurfaceSlot};
pub use surface::{lock_surface, SharedSurface, Surface, SurfaceId};
pub use transform::Transform;
pub use zoom::ZoomState;

/// Viewer core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
