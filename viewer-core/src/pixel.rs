//! Pixels, pixel grids and raw image data.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::{CanvasError, CanvasResult};

/// Number of channels per pixel (RGBA).
pub const CHANNELS: usize = 4;

/// A single RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pixel([u8; CHANNELS]);

impl Pixel {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self([0, 0, 0, 0]);

    /// Create a pixel from its four channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Red channel.
    #[must_use]
    pub const fn r(self) -> u8 {
        self.0[0]
    }

    /// Green channel.
    #[must_use]
    pub const fn g(self) -> u8 {
        self.0[1]
    }

    /// Blue channel.
    #[must_use]
    pub const fn b(self) -> u8 {
        self.0[2]
    }

    /// Alpha channel (0-255).
    #[must_use]
    pub const fn a(self) -> u8 {
        self.0[3]
    }

    /// The channels as an array.
    #[must_use]
    pub const fn channels(self) -> [u8; CHANNELS] {
        self.0
    }
}

impl From<[u8; CHANNELS]> for Pixel {
    fn from(channels: [u8; CHANNELS]) -> Self {
        Self(channels)
    }
}

impl From<Pixel> for [u8; CHANNELS] {
    fn from(pixel: Pixel) -> Self {
        pixel.0
    }
}

impl Index<usize> for Pixel {
    type Output = u8;

    fn index(&self, channel: usize) -> &u8 {
        &self.0[channel]
    }
}

/// How the alpha channel is written by [`Pixel::to_css_color`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CssAlpha {
    /// Emit the raw 0-255 channel value, e.g. `rgba(1, 2, 3, 255)`.
    #[default]
    Raw,
    /// Emit alpha normalized to 0-1, e.g. `rgba(1, 2, 3, 1)`.
    Normalized,
}

impl std::str::FromStr for CssAlpha {
    type Err = CanvasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "normalized" | "normalised" => Ok(Self::Normalized),
            other => Err(CanvasError::InvalidInput(format!(
                "unknown alpha format '{other}'"
            ))),
        }
    }
}

impl Pixel {
    /// Format as a CSS `rgba(...)` string.
    ///
    /// With [`CssAlpha::Raw`] the alpha channel is emitted verbatim, so an
    /// opaque pixel reads `rgba(r, g, b, 255)`. That is not a valid CSS
    /// alpha; use [`CssAlpha::Normalized`] when the string is fed to a
    /// stylesheet.
    #[must_use]
    pub fn to_css_color(self, alpha: CssAlpha) -> String {
        let [r, g, b, a] = self.0;
        match alpha {
            CssAlpha::Raw => format!("rgba({r}, {g}, {b}, {a})"),
            CssAlpha::Normalized => {
                let normalized = format!("{:.3}", f64::from(a) / 255.0);
                let normalized = normalized.trim_end_matches('0').trim_end_matches('.');
                format!("rgba({r}, {g}, {b}, {normalized})")
            }
        }
    }
}

impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css_color(CssAlpha::Raw))
    }
}

/// Raw RGBA image data, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// RGBA bytes.
    pub data: Vec<u8>,
}

impl ImageData {
    /// Create zero-filled (transparent) image data.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; byte_len(width, height)],
        }
    }

    /// Wrap an existing buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::DimensionMismatch`] if the buffer length does
    /// not equal `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> CanvasResult<Self> {
        let image = Self {
            width,
            height,
            data,
        };
        image.validate()?;
        Ok(image)
    }

    /// Check that the buffer holds exactly `width * height * 4` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::DimensionMismatch`] otherwise.
    pub fn validate(&self) -> CanvasResult<()> {
        let expected = byte_len(self.width, self.height);
        if self.data.len() != expected {
            return Err(CanvasError::DimensionMismatch {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Whether the image has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Read the pixel at (x, y), if in bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Pixel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let chunk = self.data.get(offset..offset + CHANNELS)?;
        Some(Pixel::new(chunk[0], chunk[1], chunk[2], chunk[3]))
    }

    /// Flatten into one pixel per channel group, row-major.
    #[must_use]
    pub fn to_pixels(&self) -> Vec<Pixel> {
        self.data
            .chunks_exact(CHANNELS)
            .map(|c| Pixel::new(c[0], c[1], c[2], c[3]))
            .collect()
    }
}

pub(crate) fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}

/// A rectangular, row-major grid of pixels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Pixel>>", into = "Vec<Vec<Pixel>>")]
pub struct PixelGrid {
    rows: Vec<Vec<Pixel>>,
}

impl PixelGrid {
    /// An empty grid (no rows).
    #[must_use]
    pub fn empty() -> Self {
        Self { rows: Vec::new() }
    }

    /// Build from rows, rejecting ragged input.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidGrid`] if rows differ in length.
    pub fn from_rows(rows: Vec<Vec<Pixel>>) -> CanvasResult<Self> {
        if let Some(first) = rows.first() {
            let width = first.len();
            if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
                return Err(CanvasError::InvalidGrid(format!(
                    "row {i} has {} pixels, expected {width}",
                    row.len()
                )));
            }
        }
        Ok(Self { rows })
    }

    /// Chunk a flat row-major pixel list into rows of `width`.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidGrid`] if `width` is zero while pixels
    /// are present, or if the list does not divide into whole rows.
    pub fn from_flat(pixels: Vec<Pixel>, width: usize) -> CanvasResult<Self> {
        if pixels.is_empty() {
            return Ok(Self::empty());
        }
        if width == 0 || pixels.len() % width != 0 {
            return Err(CanvasError::InvalidGrid(format!(
                "{} pixels do not fill rows of width {width}",
                pixels.len()
            )));
        }
        let rows = pixels.chunks(width).map(<[Pixel]>::to_vec).collect();
        Ok(Self { rows })
    }

    /// Build from raw image data.
    #[must_use]
    pub fn from_image_data(image: &ImageData) -> Self {
        if image.is_empty() {
            return Self::empty();
        }
        let rows = image
            .to_pixels()
            .chunks(image.width as usize)
            .map(<[Pixel]>::to_vec)
            .collect();
        Self { rows }
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Whether the grid has no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0
    }

    /// Pixel at column `col`, row `row`.
    #[must_use]
    pub fn get(&self, col: usize, row: usize) -> Option<Pixel> {
        self.rows.get(row)?.get(col).copied()
    }

    /// Iterate over rows.
    pub fn rows(&self) -> impl Iterator<Item = &[Pixel]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Write into raw RGBA bytes, channel `k` of pixel (`i`, `j`) at
    /// `(i * row_len + j) * 4 + k`.
    #[must_use]
    pub fn to_image_data(&self) -> ImageData {
        let width = self.width();
        let mut data = vec![0; width * self.height() * CHANNELS];
        for (i, row) in self.rows.iter().enumerate() {
            for (j, pixel) in row.iter().enumerate() {
                for (k, value) in pixel.channels().into_iter().enumerate() {
                    data[(i * row.len() + j) * CHANNELS + k] = value;
                }
            }
        }
        #[allow(clippy::cast_possible_truncation)]
        ImageData {
            width: width as u32,
            height: self.height() as u32,
            data,
        }
    }
}

impl TryFrom<Vec<Vec<Pixel>>> for PixelGrid {
    type Error = CanvasError;

    fn try_from(rows: Vec<Vec<Pixel>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<PixelGrid> for Vec<Vec<Pixel>> {
    fn from(grid: PixelGrid) -> Self {
        grid.rows
    }
}

/// A portable encoded image, as a data URL.
///
/// The empty string stands for "no image".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedImage(String);

impl EncodedImage {
    /// The "no image" marker.
    #[must_use]
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Wrap a data URL.
    #[must_use]
    pub fn from_data_url(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Whether this is the "no image" marker.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The data URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
