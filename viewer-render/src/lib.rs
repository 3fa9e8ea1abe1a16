//! # Pixel Viewer Renderer
//!
//! The pixel/canvas adapter: everything that draws on or reads from a
//! [`viewer_core::Surface`].
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────┐  render   ┌─────────────┐  encode   ┌─────────────┐
//! │ PixelGrid   │ ────────► │ Surface     │ ────────► │ data URL    │
//! │             │ ◄──────── │ (identity)  │ ◄──────── │ (PNG)       │
//! └─────────────┘  extract  └─────────────┘  decode   └─────────────┘
//!                                 ▲
//!                                 │ pointer events -> hit testing
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod codec;
pub mod decode;
pub mod scope;

pub use adapter::{
    AdapterConfig, CanvasAdapter, ClickEvent, HitTestStreams, MoveEvents, RenderedImage,
};
pub use codec::{decode_data_url, encode_png_data_url, ImageFormat};
pub use decode::{decode_image, DecodeCanceller, DecodeJob};
pub use scope::{with_identity_transform, IdentityScope};
