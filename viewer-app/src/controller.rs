//! Display controller.
//!
//! The [`DisplayController`] owns the zoom slider, binds surfaces into the
//! store as they become available, and reacts to store events: a reset puts
//! the zoom back to 100%, and a new derived image is rendered onto the
//! derived surface and published as the displayed image.

use std::future::Future;

use tokio::sync::{broadcast, watch};
use viewer_core::{
    lock_surface, CanvasError, CanvasStore, DerivedImage, EncodedImage, ImageData, PixelGrid,
    SharedSurface, SurfaceSlot, ZoomState,
};
use viewer_render::CanvasAdapter;

use crate::error::{ControllerError, ControllerResult};

/// Drives the viewer display from store events.
///
/// Store subscriptions are taken when the controller is created, so events
/// sent before [`DisplayController::run`] is first polled are not lost.
#[derive(Debug)]
pub struct DisplayController {
    adapter: CanvasAdapter,
    resets: broadcast::Receiver<()>,
    derived: watch::Receiver<Option<DerivedImage>>,
}

impl DisplayController {
    /// Create a controller around an adapter and subscribe to its store.
    #[must_use]
    pub fn new(adapter: CanvasAdapter) -> Self {
        let resets = adapter.store().subscribe_reset();
        let derived = adapter.store().subscribe_derived();
        Self {
            adapter,
            resets,
            derived,
        }
    }

    /// The adapter used for drawing.
    #[must_use]
    pub fn adapter(&self) -> &CanvasAdapter {
        &self.adapter
    }

    /// Mutable access to the adapter, for hit testing and reset.
    pub fn adapter_mut(&mut self) -> &mut CanvasAdapter {
        &mut self.adapter
    }

    fn store(&self) -> &CanvasStore {
        self.adapter.store()
    }

    // ========================================================================
    // Zoom
    // ========================================================================

    /// Effective zoom: slider value times multiplier.
    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.store().zoom().value()
    }

    /// Slider moved. Returns the new effective zoom.
    pub fn on_slider_change(&self, value: f64) -> f64 {
        self.store().update_zoom(|zoom| zoom.raw = value).value()
    }

    /// Multiplier text changed. Returns the new effective zoom.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidInput`] when the text is not a finite
    /// number; the multiplier is left unchanged.
    pub fn on_multiplier_input(&self, input: &str) -> ControllerResult<f64> {
        let multiplier = ZoomState::parse_multiplier(input)?;
        Ok(self
            .store()
            .update_zoom(|zoom| zoom.multiplier = multiplier)
            .value())
    }

    /// Slider label for a value, e.g. `1.5` -> `"150%"`.
    #[must_use]
    pub fn format_slider_label(value: f64) -> String {
        ZoomState::format_label(value)
    }

    /// Whether a raw image has been loaded.
    #[must_use]
    pub fn has_image_data(&self) -> bool {
        self.store().has_raw_image()
    }

    // ========================================================================
    // Surfaces
    // ========================================================================

    /// The raw image surface became available.
    pub fn on_raw_surface_ready(&mut self, surface: Option<SharedSurface>) {
        self.bind(SurfaceSlot::Raw, surface);
    }

    /// The derived image surface became available.
    pub fn on_derived_surface_ready(&mut self, surface: Option<SharedSurface>) {
        self.bind(SurfaceSlot::Derived, surface);
    }

    fn bind(&mut self, slot: SurfaceSlot, surface: Option<SharedSurface>) {
        if let Some(surface) = surface {
            tracing::debug!("Binding {slot} surface {}", lock_surface(&surface).id());
            self.adapter.bind_surface(slot, surface);
        }
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// Draw a decoded image onto the raw surface and remember its pixels.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::NoSurface`] if no raw surface is bound, and
    /// [`CanvasError::DimensionMismatch`] for a malformed image buffer.
    pub fn load_raw_image(&self, image: &ImageData) -> ControllerResult<PixelGrid> {
        let shared = self
            .store()
            .surface(SurfaceSlot::Raw)
            .ok_or(CanvasError::NoSurface(SurfaceSlot::Raw))?;
        let grid = self
            .adapter
            .load_image_onto_surface(&mut lock_surface(&shared), image)?;
        self.store().set_raw_image(Some(grid.clone()));
        Ok(grid)
    }

    /// Decode a data URL and load it as the raw image.
    ///
    /// Returns `None` for an empty URL.
    ///
    /// # Errors
    ///
    /// Returns decode errors from the adapter, or
    /// [`CanvasError::NoSurface`] if no raw surface is bound.
    pub async fn load_encoded_image(&self, encoded: &str) -> ControllerResult<Option<PixelGrid>> {
        let Some(decoded) = self.adapter.decode_image(encoded).await? else {
            return Ok(None);
        };
        self.load_raw_image(&decoded.to_image_data()).map(Some)
    }

    /// A derived image arrived.
    ///
    /// Renders it onto the derived surface and publishes the encoded result
    /// as the displayed image. `None` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::NoSurface`] if no derived surface is bound, or
    /// an encoding error from the adapter.
    pub fn on_derived_image(
        &self,
        image: Option<&DerivedImage>,
    ) -> ControllerResult<Option<EncodedImage>> {
        let Some(image) = image else {
            return Ok(None);
        };
        let shared = self
            .store()
            .surface(SurfaceSlot::Derived)
            .ok_or(CanvasError::NoSurface(SurfaceSlot::Derived))?;

        let rendered = self
            .adapter
            .render_pixel_grid(&mut lock_surface(&shared), &image.grid)?;
        let displayed = (!rendered.encoded.is_empty()).then(|| rendered.encoded.clone());
        self.store().set_displayed_image(displayed);
        tracing::info!(
            "Displayed derived image with {} clusters ({}x{})",
            image.clusters,
            image.grid.width(),
            image.grid.height()
        );
        Ok(Some(rendered.encoded))
    }

    /// A reset happened: zoom back to raw 1, multiplier 1.
    pub fn on_reset(&self) {
        self.store().update_zoom(ZoomState::reset);
        tracing::debug!("Zoom reset");
    }

    // ========================================================================
    // Event loop
    // ========================================================================

    /// React to store events until `shutdown` completes.
    ///
    /// A derived image that cannot be displayed is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::SourceClosed`] if a store channel closes.
    pub async fn run<F>(&mut self, shutdown: F) -> ControllerResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::debug!("Display controller shutting down");
                    return Ok(());
                }
                received = self.resets.recv() => match received {
                    Ok(()) => self.on_reset(),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Missed {skipped} reset notifications");
                        self.on_reset();
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(ControllerError::SourceClosed("reset"));
                    }
                },
                changed = self.derived.changed() => {
                    if changed.is_err() {
                        return Err(ControllerError::SourceClosed("derived image"));
                    }
                    let image = self.derived.borrow_and_update().clone();
                    if let Err(e) = self.on_derived_image(image.as_ref()) {
                        tracing::warn!("Failed to display derived image: {e}");
                    }
                }
            }
        }
    }
}
