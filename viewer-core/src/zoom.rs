//! Zoom slider state.

use serde::{Deserialize, Serialize};

use crate::{CanvasError, CanvasResult};

/// Zoom as a slider value times a user-entered multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    /// Raw slider value.
    pub raw: f64,
    /// User-entered multiplier.
    pub multiplier: f64,
}

impl ZoomState {
    /// Effective zoom.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.raw * self.multiplier
    }

    /// Back to raw 1, multiplier 1.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Parse a multiplier typed into a text field.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidInput`] for text that is not a finite
    /// number.
    pub fn parse_multiplier(input: &str) -> CanvasResult<f64> {
        let value: f64 = input
            .trim()
            .parse()
            .map_err(|_| CanvasError::InvalidInput(format!("'{input}' is not a number")))?;
        if !value.is_finite() {
            return Err(CanvasError::InvalidInput(format!(
                "'{input}' is not a finite number"
            )));
        }
        Ok(value)
    }

    /// Slider label, e.g. `0.5` -> `"50%"`.
    #[must_use]
    pub fn format_label(value: f64) -> String {
        format!("{:.0}%", value * 100.0)
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self {
            raw: 1.0,
            multiplier: 1.0,
        }
    }
}
