//! Shared viewer state for multi-component access.
//!
//! [`CanvasStore`] holds the bound surfaces, the raw and displayed images,
//! zoom and listening flags, and the two notification channels the display
//! controller subscribes to: a reset broadcast and the latest derived image.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

use crate::surface::SharedSurface;
use crate::{EncodedImage, PixelGrid, ZoomState};

/// Capacity of the reset broadcast channel.
const RESET_CHANNEL_CAPACITY: usize = 16;

/// Which pane a surface is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceSlot {
    /// The loaded source image.
    Raw,
    /// The derived (color-clustered) image.
    Derived,
}

impl std::fmt::Display for SurfaceSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::Derived => f.write_str("derived"),
        }
    }
}

/// An image derived from the raw image by color clustering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedImage {
    /// Number of color clusters used.
    pub clusters: usize,
    /// Every pixel replaced by its cluster color.
    pub grid: PixelGrid,
}

#[derive(Debug, Default)]
struct StoreState {
    surfaces: HashMap<SurfaceSlot, SharedSurface>,
    raw_image: Option<PixelGrid>,
    displayed_image: Option<EncodedImage>,
    zoom: ZoomState,
    listening: HashSet<SurfaceSlot>,
}

/// Thread-safe viewer state shared between the adapter and the controller.
///
/// # Example
///
/// ```
/// use viewer_core::store::{CanvasStore, SurfaceSlot};
/// use viewer_core::Surface;
///
/// let store = CanvasStore::new();
/// store.bind_surface(SurfaceSlot::Raw, Surface::new(4, 4).into_shared());
/// assert!(store.surface(SurfaceSlot::Raw).is_some());
/// assert!(store.surface(SurfaceSlot::Derived).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct CanvasStore {
    state: Arc<RwLock<StoreState>>,
    reset_tx: broadcast::Sender<()>,
    derived_tx: Arc<watch::Sender<Option<DerivedImage>>>,
}

impl CanvasStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (reset_tx, _) = broadcast::channel(RESET_CHANNEL_CAPACITY);
        let (derived_tx, _) = watch::channel(None);
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            reset_tx,
            derived_tx: Arc::new(derived_tx),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Bind a surface to a slot, replacing any previous binding.
    pub fn bind_surface(&self, slot: SurfaceSlot, surface: SharedSurface) {
        tracing::debug!("Bound surface to {slot} slot");
        self.write().surfaces.insert(slot, surface);
    }

    /// Remove a slot's binding.
    pub fn unbind_surface(&self, slot: SurfaceSlot) -> Option<SharedSurface> {
        let mut state = self.write();
        state.listening.remove(&slot);
        state.surfaces.remove(&slot)
    }

    /// The surface bound to a slot.
    #[must_use]
    pub fn surface(&self, slot: SurfaceSlot) -> Option<SharedSurface> {
        self.read().surfaces.get(&slot).cloned()
    }

    /// All bound slots and their surfaces.
    #[must_use]
    pub fn bound_surfaces(&self) -> Vec<(SurfaceSlot, SharedSurface)> {
        self.read()
            .surfaces
            .iter()
            .map(|(slot, surface)| (*slot, Arc::clone(surface)))
            .collect()
    }

    /// The loaded source image.
    #[must_use]
    pub fn raw_image(&self) -> Option<PixelGrid> {
        self.read().raw_image.clone()
    }

    /// Whether a source image is loaded.
    #[must_use]
    pub fn has_raw_image(&self) -> bool {
        self.read().raw_image.is_some()
    }

    /// Replace the loaded source image.
    pub fn set_raw_image(&self, image: Option<PixelGrid>) {
        self.write().raw_image = image;
    }

    /// The image currently on display.
    #[must_use]
    pub fn displayed_image(&self) -> Option<EncodedImage> {
        self.read().displayed_image.clone()
    }

    /// Replace the image on display.
    pub fn set_displayed_image(&self, image: Option<EncodedImage>) {
        self.write().displayed_image = image;
    }

    /// Current zoom state.
    #[must_use]
    pub fn zoom(&self) -> ZoomState {
        self.read().zoom
    }

    /// Modify the zoom state in place.
    pub fn update_zoom<F>(&self, f: F) -> ZoomState
    where
        F: FnOnce(&mut ZoomState),
    {
        let mut state = self.write();
        f(&mut state.zoom);
        state.zoom
    }

    /// Whether hit testing is active on a slot.
    #[must_use]
    pub fn is_listening(&self, slot: SurfaceSlot) -> bool {
        self.read().listening.contains(&slot)
    }

    /// Set the hit-testing flag for a slot.
    pub fn set_listening(&self, slot: SurfaceSlot, listening: bool) {
        let mut state = self.write();
        if listening {
            state.listening.insert(slot);
        } else {
            state.listening.remove(&slot);
        }
    }

    /// Subscribe to reset notifications.
    #[must_use]
    pub fn subscribe_reset(&self) -> broadcast::Receiver<()> {
        self.reset_tx.subscribe()
    }

    /// Notify subscribers of a reset. Returns the number notified.
    pub fn notify_reset(&self) -> usize {
        let receivers = self.reset_tx.send(()).unwrap_or(0);
        tracing::debug!("Reset notified to {receivers} subscribers");
        receivers
    }

    /// Subscribe to derived image updates.
    #[must_use]
    pub fn subscribe_derived(&self) -> watch::Receiver<Option<DerivedImage>> {
        self.derived_tx.subscribe()
    }

    /// Publish a new derived image (or clear it).
    pub fn publish_derived_image(&self, image: Option<DerivedImage>) {
        self.derived_tx.send_replace(image);
    }

    /// The latest derived image.
    #[must_use]
    pub fn derived_image(&self) -> Option<DerivedImage> {
        self.derived_tx.borrow().clone()
    }
}

impl Default for CanvasStore {
    fn default() -> Self {
        Self::new()
    }
}
