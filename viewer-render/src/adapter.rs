//! Pixel/canvas adapter.
//!
//! [`CanvasAdapter`] is the only component that writes surface contents. It
//! renders pixel grids, reads them back under the identity transform, loads
//! decoded images, and resolves pointer positions to pixel colors for the
//! surfaces bound in a [`CanvasStore`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio_stream::wrappers::UnboundedReceiverStream;
use viewer_core::{
    lock_surface, CanvasError, CanvasResult, CanvasStore, CssAlpha, EncodedImage,
    HitTestSessions, ImageData, Listener, Pixel, PixelGrid, PointerEvent, PointerKind,
    SharedSurface, Surface, SurfaceSlot,
};

use crate::codec;
use crate::decode::{self, DecodeJob};
use crate::scope;

/// Adapter configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdapterConfig {
    /// Alpha format used by [`CanvasAdapter::to_css_color`].
    pub css_alpha: CssAlpha,
}

/// Result of rendering a pixel grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// The raw buffer written to the surface.
    pub image_data: ImageData,
    /// The surface contents as a data URL, empty when nothing was drawn.
    pub encoded: EncodedImage,
}

/// Resolves with the first click on the surface, or `None` if hit testing
/// stops before any click arrives.
#[derive(Debug)]
pub struct ClickEvent(oneshot::Receiver<PointerEvent>);

impl Future for ClickEvent {
    type Output = Option<PointerEvent>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx).map(Result::ok)
    }
}

/// Stream of pointer moves; ends when hit testing stops.
pub type MoveEvents = UnboundedReceiverStream<PointerEvent>;

/// Event sources returned by [`CanvasAdapter::start_hit_testing`].
#[derive(Debug)]
pub struct HitTestStreams {
    /// First click.
    pub on_click: ClickEvent,
    /// Every move until stopped.
    pub on_move: MoveEvents,
}

/// Draws on and reads from viewer surfaces.
#[derive(Debug)]
pub struct CanvasAdapter {
    store: CanvasStore,
    sessions: HitTestSessions,
    config: AdapterConfig,
}

impl CanvasAdapter {
    /// Create an adapter over a store.
    #[must_use]
    pub fn new(store: CanvasStore) -> Self {
        Self::with_config(store, AdapterConfig::default())
    }

    /// Create an adapter with a custom configuration.
    #[must_use]
    pub fn with_config(store: CanvasStore, config: AdapterConfig) -> Self {
        Self {
            store,
            sessions: HitTestSessions::new(),
            config,
        }
    }

    /// The store this adapter serves.
    #[must_use]
    pub fn store(&self) -> &CanvasStore {
        &self.store
    }

    /// The adapter configuration.
    #[must_use]
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Run `f` under the identity transform, restoring the surface's prior
    /// size, pixels and transform afterwards, even if `f` panics.
    pub fn with_identity_transform<T, F>(&self, surface: &mut Surface, f: F) -> T
    where
        F: FnOnce(&mut Surface) -> T,
    {
        scope::with_identity_transform(surface, f)
    }

    /// Clear, resize to `width x height` and disable smoothing.
    pub fn predraw(&self, surface: &mut Surface, width: u32, height: u32) {
        surface.clear();
        surface.resize(width, height);
        surface.set_image_smoothing(false);
    }

    /// Render a grid onto the surface and encode the result.
    ///
    /// An empty grid leaves the surface untouched and yields an empty image.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Encode`] if PNG encoding fails.
    pub fn render_pixel_grid(
        &self,
        surface: &mut Surface,
        grid: &PixelGrid,
    ) -> CanvasResult<RenderedImage> {
        if grid.is_empty() {
            return Ok(RenderedImage {
                image_data: surface.create_image_data(),
                encoded: EncodedImage::empty(),
            });
        }

        let image_data = grid.to_image_data();
        self.predraw(surface, image_data.width, image_data.height);
        surface.put_image_data(&image_data, 0, 0);
        let encoded = codec::encode_png_data_url(&surface.get_image_data())?;
        tracing::debug!(
            "Rendered {}x{} grid onto surface {}",
            image_data.width,
            image_data.height,
            surface.id()
        );
        Ok(RenderedImage {
            image_data,
            encoded,
        })
    }

    /// Read the surface as a grid, ignoring its transform.
    pub fn extract_pixel_grid(&self, surface: &mut Surface) -> PixelGrid {
        self.with_identity_transform(surface, |s| PixelGrid::from_image_data(&s.get_image_data()))
    }

    /// Read the raw buffer and its data URL, ignoring the transform.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Encode`] if PNG encoding fails.
    pub fn get_image_data(&self, surface: &mut Surface) -> CanvasResult<(ImageData, EncodedImage)> {
        self.with_identity_transform(surface, |s| {
            let image_data = s.get_image_data();
            let encoded = codec::encode_png_data_url(&image_data)?;
            Ok((image_data, encoded))
        })
    }

    /// Flatten raw image data into one pixel per channel group.
    #[must_use]
    pub fn image_data_to_pixels(&self, image: &ImageData) -> Vec<Pixel> {
        image.to_pixels()
    }

    /// Start decoding an encoded image.
    #[must_use]
    pub fn decode_image(&self, encoded: &str) -> DecodeJob {
        decode::decode_image(encoded)
    }

    /// Render a grid under the identity transform, leave the surface as it
    /// was, and decode the rendered image.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::Encode`] if PNG encoding fails.
    pub fn create_image_from_pixels(
        &self,
        surface: &mut Surface,
        grid: &PixelGrid,
    ) -> CanvasResult<DecodeJob> {
        let rendered = self.with_identity_transform(surface, |s| self.render_pixel_grid(s, grid))?;
        Ok(self.decode_image(rendered.encoded.as_str()))
    }

    /// Draw an image at its native size and read the result back.
    ///
    /// Clears the store's displayed image.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::DimensionMismatch`] if the image buffer does
    /// not match its declared size; the surface is left untouched.
    pub fn load_image_onto_surface(
        &self,
        surface: &mut Surface,
        image: &ImageData,
    ) -> CanvasResult<PixelGrid> {
        image.validate()?;
        self.predraw(surface, image.width, image.height);
        surface.draw_image(
            image,
            0.0,
            0.0,
            f64::from(surface.width()),
            f64::from(surface.height()),
        );
        let grid = self.extract_pixel_grid(surface);
        self.store.set_displayed_image(None);
        tracing::debug!(
            "Loaded {}x{} image onto surface {}",
            image.width,
            image.height,
            surface.id()
        );
        Ok(grid)
    }

    /// Resize to `width x height` and write raw data without scaling.
    pub fn draw_image_data(&self, surface: &mut Surface, image: &ImageData, width: u32, height: u32) {
        self.predraw(surface, width, height);
        surface.put_image_data(image, 0, 0);
    }

    fn bound_surface(&self, slot: SurfaceSlot) -> CanvasResult<SharedSurface> {
        self.store.surface(slot).ok_or(CanvasError::NoSurface(slot))
    }

    /// Attach click and move listeners to the surface bound to `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::NoSurface`] if nothing is bound, and
    /// [`CanvasError::AlreadyListening`] if hit testing already runs there.
    pub fn start_hit_testing(&mut self, slot: SurfaceSlot) -> CanvasResult<HitTestStreams> {
        let shared = self.bound_surface(slot)?;
        let mut surface = lock_surface(&shared);
        let id = surface.id();
        self.sessions.ensure_idle(id)?;

        let (click_listener, click_rx) = Listener::once();
        let (move_listener, move_rx) = Listener::repeating();
        let click = surface.add_event_listener(PointerKind::Click, click_listener);
        let moves = surface.add_event_listener(PointerKind::Move, move_listener);
        self.sessions.begin(id, &shared, click, moves)?;
        self.store.set_listening(slot, true);

        tracing::debug!("Hit testing started on {slot} surface {id}");
        Ok(HitTestStreams {
            on_click: ClickEvent(click_rx),
            on_move: UnboundedReceiverStream::new(move_rx),
        })
    }

    /// Detach the listeners from the surface bound to `slot`; its move stream
    /// ends. A no-op if the surface is not listening.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::NoSurface`] if nothing is bound.
    pub fn stop_hit_testing(&mut self, slot: SurfaceSlot) -> CanvasResult<()> {
        let shared = self.bound_surface(slot)?;
        self.store.set_listening(slot, false);

        if self.detach_session(&shared) {
            tracing::debug!("Hit testing stopped on {slot} surface");
        }
        Ok(())
    }

    /// End the session on a surface, if any, and remove its listeners.
    fn detach_session(&mut self, shared: &SharedSurface) -> bool {
        let mut surface = lock_surface(shared);
        match self.sessions.end(surface.id()) {
            Some(session) => {
                session.detach(&mut surface);
                true
            }
            None => false,
        }
    }

    /// Bind a surface to `slot`.
    ///
    /// A different surface previously bound there stops hit testing first,
    /// so its move stream ends.
    pub fn bind_surface(&mut self, slot: SurfaceSlot, surface: SharedSurface) {
        if let Some(previous) = self.store.surface(slot) {
            if !Arc::ptr_eq(&previous, &surface) && self.detach_session(&previous) {
                self.store.set_listening(slot, false);
                tracing::debug!("Hit testing stopped on replaced {slot} surface");
            }
        }
        self.store.bind_surface(slot, surface);
    }

    /// Unbind the surface from `slot`, stopping hit testing on it.
    pub fn unbind_surface(&mut self, slot: SurfaceSlot) -> Option<SharedSurface> {
        let previous = self.store.unbind_surface(slot)?;
        if self.detach_session(&previous) {
            tracing::debug!("Hit testing stopped on unbound {slot} surface");
        }
        Some(previous)
    }

    /// Whether hit testing runs on the surface bound to `slot`.
    #[must_use]
    pub fn is_hit_testing(&self, slot: SurfaceSlot) -> bool {
        self.store
            .surface(slot)
            .is_some_and(|shared| self.sessions.is_listening(lock_surface(&shared).id()))
    }

    /// The pixel under a page coordinate on the surface bound to `slot`.
    ///
    /// Returns `None` when the point falls outside the surface.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::NoSurface`] if nothing is bound.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn resolve_pixel_at_screen_point(
        &self,
        slot: SurfaceSlot,
        page_x: f64,
        page_y: f64,
    ) -> CanvasResult<Option<Pixel>> {
        let shared = self.bound_surface(slot)?;
        let mut surface = lock_surface(&shared);
        let (left, top) = surface.offset();
        let column = (page_x - left).floor();
        let row = (page_y - top).floor();
        if !(column >= 0.0 && row >= 0.0) {
            return Ok(None);
        }

        let grid = self.extract_pixel_grid(&mut surface);
        Ok(grid.get(column as usize, row as usize))
    }

    /// The pixel under a pointer event.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::NoSurface`] if nothing is bound.
    pub fn pixel_from_event(
        &self,
        slot: SurfaceSlot,
        event: &PointerEvent,
    ) -> CanvasResult<Option<Pixel>> {
        self.resolve_pixel_at_screen_point(slot, event.page_x, event.page_y)
    }

    /// Format a pixel as `rgba(...)` using the configured alpha format.
    #[must_use]
    pub fn to_css_color(&self, pixel: Pixel) -> String {
        pixel.to_css_color(self.config.css_alpha)
    }

    /// Clear images and zoom, stop hit testing on every bound surface, and
    /// broadcast the reset to store subscribers.
    ///
    /// # Errors
    ///
    /// Currently infallible but returns `Result` for API consistency.
    pub fn reset(&mut self) -> CanvasResult<()> {
        self.store.set_raw_image(None);
        self.store.set_displayed_image(None);
        self.store.update_zoom(viewer_core::ZoomState::reset);

        for (slot, _) in self.store.bound_surfaces() {
            self.stop_hit_testing(slot)?;
        }

        // Surfaces replaced in the store behind the adapter's back.
        for id in self.sessions.listening() {
            if let Some(session) = self.sessions.end(id) {
                session.detach_from_surface();
                tracing::debug!("Detached listeners from unbound surface {id}");
            }
        }
        let receivers = self.store.notify_reset();
        tracing::info!("Viewer reset ({receivers} subscribers notified)");
        Ok(())
    }
}
