//! # Pixel Viewer App
//!
//! Display controller and command-line host for the pixel viewer.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p viewer-app -- --image "data:image/png;base64,..." --click 10,20
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `ViewerConfig` - Zoom defaults, alpha format, surface offset and log format
//! - `DisplayController` - Zoom slider, surface binding and store event loop
//! - Uses `viewer-render::CanvasAdapter` for all drawing and hit testing

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

pub mod controller;
pub mod error;

pub use controller::DisplayController;
pub use error::{ControllerError, ControllerResult};

use std::str::FromStr;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use viewer_core::CssAlpha;

/// A page coordinate given on the command line as `X,Y`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal page coordinate.
    pub x: f64,
    /// Vertical page coordinate.
    pub y: f64,
}

impl FromStr for Point {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ControllerError::InvalidPoint(s.to_string());
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        let x: f64 = x.trim().parse().map_err(|_| invalid())?;
        let y: f64 = y.trim().parse().map_err(|_| invalid())?;
        if !x.is_finite() || !y.is_finite() {
            return Err(invalid());
        }
        Ok(Self { x, y })
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Read the format from `RUST_LOG_FORMAT` (`json` selects JSON).
    #[must_use]
    pub fn from_env() -> Self {
        if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Command-line arguments for pixel-viewer.
#[derive(Debug, Clone, Parser)]
#[command(name = "pixel-viewer")]
#[command(about = "Load an image onto a surface and inspect its pixels")]
#[command(version)]
pub struct CliArgs {
    /// Image to load, as a data URL
    #[arg(long, env = "PIXEL_VIEWER_IMAGE")]
    pub image: String,

    /// Page coordinate to click, as X,Y (repeatable)
    #[arg(long = "click", value_name = "X,Y")]
    pub clicks: Vec<Point>,

    /// Page position of the surface's top-left corner, as X,Y
    #[arg(long, value_name = "X,Y")]
    pub offset: Option<Point>,

    /// Alpha format for printed colors: raw or normalized
    #[arg(long, env = "PIXEL_VIEWER_CSS_ALPHA", default_value = "raw")]
    pub css_alpha: CssAlpha,

    /// Initial zoom slider value
    #[arg(long, default_value = "1")]
    pub zoom: f64,

    /// Zoom multiplier text
    #[arg(long)]
    pub multiplier: Option<String>,

    /// Print the surface contents as a PNG data URL after probing
    #[arg(long)]
    pub emit: bool,
}

/// Viewer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Alpha format for printed colors.
    pub css_alpha: CssAlpha,
    /// Page position of the raw surface.
    pub offset: Point,
    /// Initial zoom slider value.
    pub zoom: f64,
    /// Initial zoom multiplier text.
    pub multiplier: Option<String>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            css_alpha: CssAlpha::Raw,
            offset: Point::default(),
            zoom: 1.0,
            multiplier: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl From<CliArgs> for ViewerConfig {
    fn from(args: CliArgs) -> Self {
        Self {
            css_alpha: args.css_alpha,
            offset: args.offset.unwrap_or_default(),
            zoom: args.zoom,
            multiplier: args.multiplier,
            log_format: LogFormat::from_env(),
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` selects the filter; the default logs the viewer crates at
/// debug level.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,viewer_core=debug,viewer_render=debug,viewer_app=debug")
    });

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init(),
    }
}
