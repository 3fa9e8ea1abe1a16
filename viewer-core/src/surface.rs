//! Software drawing surface.
//!
//! A [`Surface`] is the canvas-equivalent the adapter draws on: a raw RGBA
//! buffer with a current affine transform, an image smoothing flag, an
//! element offset for page-to-surface coordinate translation and a pointer
//! listener registry.
//!
//! Like a 2D canvas, [`Surface::put_image_data`] and
//! [`Surface::get_image_data`] ignore the transform, while
//! [`Surface::draw_image`] maps through it. Resizing resets the buffer, the
//! transform and the smoothing flag.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::{Listener, ListenerId, PointerEvent, PointerKind};
use crate::pixel::{byte_len, ImageData, CHANNELS};
use crate::Transform;

/// Unique identifier for a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    /// Create a new unique surface ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A surface shared between the store, the adapter and event sources.
pub type SharedSurface = Arc<Mutex<Surface>>;

/// Lock a shared surface, recovering from poisoning.
pub fn lock_surface(surface: &SharedSurface) -> std::sync::MutexGuard<'_, Surface> {
    surface
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// A software 2D drawing surface.
#[derive(Debug)]
pub struct Surface {
    id: SurfaceId,
    width: u32,
    height: u32,
    transform: Transform,
    data: Vec<u8>,
    image_smoothing: bool,
    offset_left: f64,
    offset_top: f64,
    listeners: HashMap<ListenerId, (PointerKind, Listener)>,
}

impl Surface {
    /// Create a transparent surface.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: SurfaceId::new(),
            width,
            height,
            transform: Transform::IDENTITY,
            data: vec![0; byte_len(width, height)],
            image_smoothing: true,
            offset_left: 0.0,
            offset_top: 0.0,
            listeners: HashMap::new(),
        }
    }

    /// Set the element offset within the page.
    #[must_use]
    pub fn with_offset(mut self, left: f64, top: f64) -> Self {
        self.offset_left = left;
        self.offset_top = top;
        self
    }

    /// Wrap into a [`SharedSurface`].
    #[must_use]
    pub fn into_shared(self) -> SharedSurface {
        Arc::new(Mutex::new(self))
    }

    /// Surface identifier.
    #[must_use]
    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Current transform.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Replace the current transform.
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// Whether scaled draws interpolate.
    #[must_use]
    pub fn image_smoothing_enabled(&self) -> bool {
        self.image_smoothing
    }

    /// Enable or disable interpolation on scaled draws.
    pub fn set_image_smoothing(&mut self, enabled: bool) {
        self.image_smoothing = enabled;
    }

    /// Element offset `(left, top)` within the page.
    #[must_use]
    pub fn offset(&self) -> (f64, f64) {
        (self.offset_left, self.offset_top)
    }

    /// Move the element within the page.
    pub fn set_offset(&mut self, left: f64, top: f64) {
        self.offset_left = left;
        self.offset_top = top;
    }

    /// Raw RGBA buffer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Resize the surface.
    ///
    /// Clears the buffer to transparent, resets the transform to identity and
    /// re-enables smoothing, even when the size is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        tracing::debug!(
            "Surface {} resized {}x{} -> {}x{}",
            self.id,
            self.width,
            self.height,
            width,
            height
        );
        self.width = width;
        self.height = height;
        self.data = vec![0; byte_len(width, height)];
        self.transform = Transform::IDENTITY;
        self.image_smoothing = true;
    }

    /// Clear the whole buffer to transparent.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Blank image data matching the surface size.
    #[must_use]
    pub fn create_image_data(&self) -> ImageData {
        ImageData::new(self.width, self.height)
    }

    /// Copy the whole buffer out.
    #[must_use]
    pub fn get_image_data(&self) -> ImageData {
        ImageData {
            width: self.width,
            height: self.height,
            data: self.data.clone(),
        }
    }

    /// Write image data at `(dx, dy)` in device pixels, clipped to the
    /// surface. Replaces pixels without blending.
    pub fn put_image_data(&mut self, image: &ImageData, dx: i64, dy: i64) {
        for sy in 0..i64::from(image.height) {
            let ty = dy + sy;
            if ty < 0 || ty >= i64::from(self.height) {
                continue;
            }
            for sx in 0..i64::from(image.width) {
                let tx = dx + sx;
                if tx < 0 || tx >= i64::from(self.width) {
                    continue;
                }
                #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
                let src = (sy as usize * image.width as usize + sx as usize) * CHANNELS;
                #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
                let dst = (ty as usize * self.width as usize + tx as usize) * CHANNELS;
                if let Some(chunk) = image.data.get(src..src + CHANNELS) {
                    self.data[dst..dst + CHANNELS].copy_from_slice(chunk);
                }
            }
        }
    }

    /// Draw an image into the rectangle `(dx, dy, dw, dh)` in user space.
    ///
    /// The rectangle is mapped through the current transform. Each covered
    /// device pixel samples the source at its center, nearest-neighbor when
    /// smoothing is disabled and bilinear otherwise, and is composited
    /// source-over.
    pub fn draw_image(&mut self, image: &ImageData, dx: f64, dy: f64, dw: f64, dh: f64) {
        if image.is_empty() || dw <= 0.0 || dh <= 0.0 {
            return;
        }
        if let Err(e) = image.validate() {
            tracing::warn!("Surface {} skipping draw of malformed image: {e}", self.id);
            return;
        }
        let Some(inverse) = self.transform.invert() else {
            tracing::warn!("Surface {} has a singular transform, skipping draw", self.id);
            return;
        };

        let corners = [
            self.transform.apply(dx, dy),
            self.transform.apply(dx + dw, dy),
            self.transform.apply(dx, dy + dh),
            self.transform.apply(dx + dw, dy + dh),
        ];
        let (min_x, max_x) = span(corners.iter().map(|c| c.0), self.width);
        let (min_y, max_y) = span(corners.iter().map(|c| c.1), self.height);

        let scale_x = f64::from(image.width) / dw;
        let scale_y = f64::from(image.height) / dh;

        for py in min_y..max_y {
            for px in min_x..max_x {
                let (ux, uy) = inverse.apply(f64::from(px) + 0.5, f64::from(py) + 0.5);
                if ux < dx || uy < dy || ux >= dx + dw || uy >= dy + dh {
                    continue;
                }
                let sx = (ux - dx) * scale_x;
                let sy = (uy - dy) * scale_y;
                let src = if self.image_smoothing {
                    sample_bilinear(image, sx, sy)
                } else {
                    sample_nearest(image, sx, sy)
                };
                let offset = (py as usize * self.width as usize + px as usize) * CHANNELS;
                let dst = &mut self.data[offset..offset + CHANNELS];
                let out = source_over(src, [dst[0], dst[1], dst[2], dst[3]]);
                dst.copy_from_slice(&out);
            }
        }
    }

    /// Register a pointer listener.
    pub fn add_event_listener(&mut self, kind: PointerKind, listener: Listener) -> ListenerId {
        let id = ListenerId::next();
        self.listeners.insert(id, (kind, listener));
        tracing::debug!("Surface {} added {:?} {}", self.id, kind, id);
        id
    }

    /// Remove a listener. Returns whether it was registered.
    ///
    /// Dropping a repeating listener closes its receiver.
    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        let removed = self.listeners.remove(&id).is_some();
        if removed {
            tracing::debug!("Surface {} removed {}", self.id, id);
        }
        removed
    }

    /// Number of registered listeners of a kind.
    #[must_use]
    pub fn listener_count(&self, kind: PointerKind) -> usize {
        self.listeners.values().filter(|(k, _)| *k == kind).count()
    }

    /// Deliver an event to every listener of its kind.
    ///
    /// Once-only listeners are removed after delivery, repeating listeners
    /// whose receiver is gone are pruned. Returns the number of deliveries.
    pub fn dispatch(&mut self, event: PointerEvent) -> usize {
        let ids: Vec<ListenerId> = self
            .listeners
            .iter()
            .filter(|(_, (kind, _))| *kind == event.kind)
            .map(|(id, _)| *id)
            .collect();

        let mut delivered = 0;
        for id in ids {
            if matches!(self.listeners.get(&id), Some((_, Listener::Once(_)))) {
                if let Some((_, Listener::Once(tx))) = self.listeners.remove(&id) {
                    if tx.send(event).is_ok() {
                        delivered += 1;
                    }
                }
                continue;
            }
            let sent = match self.listeners.get(&id) {
                Some((_, Listener::Repeating(tx))) => tx.send(event).is_ok(),
                _ => continue,
            };
            if sent {
                delivered += 1;
            } else {
                tracing::debug!("Surface {} pruned closed {}", self.id, id);
                self.listeners.remove(&id);
            }
        }
        tracing::trace!(
            "Surface {} dispatched {:?} at ({}, {}) to {} listeners",
            self.id,
            event.kind,
            event.page_x,
            event.page_y,
            delivered
        );
        delivered
    }
}

/// Device pixel range covered by a set of coordinates, clamped to `0..limit`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn span(values: impl Iterator<Item = f64>, limit: u32) -> (u32, u32) {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let limit = f64::from(limit);
    (
        lo.floor().clamp(0.0, limit) as u32,
        hi.ceil().clamp(0.0, limit) as u32,
    )
}

fn texel(image: &ImageData, x: u32, y: u32) -> [f64; CHANNELS] {
    let offset = (y as usize * image.width as usize + x as usize) * CHANNELS;
    let c = &image.data[offset..offset + CHANNELS];
    [
        f64::from(c[0]),
        f64::from(c[1]),
        f64::from(c[2]),
        f64::from(c[3]),
    ]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sample_nearest(image: &ImageData, sx: f64, sy: f64) -> [f64; CHANNELS] {
    let x = (sx.floor().max(0.0) as u32).min(image.width - 1);
    let y = (sy.floor().max(0.0) as u32).min(image.height - 1);
    texel(image, x, y)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn sample_bilinear(image: &ImageData, sx: f64, sy: f64) -> [f64; CHANNELS] {
    let max_x = f64::from(image.width - 1);
    let max_y = f64::from(image.height - 1);
    let fx = (sx - 0.5).clamp(0.0, max_x);
    let fy = (sy - 0.5).clamp(0.0, max_y);
    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(image.width - 1);
    let y1 = (y0 + 1).min(image.height - 1);
    let tx = fx - f64::from(x0);
    let ty = fy - f64::from(y0);

    let p00 = texel(image, x0, y0);
    let p10 = texel(image, x1, y0);
    let p01 = texel(image, x0, y1);
    let p11 = texel(image, x1, y1);

    std::array::from_fn(|k| {
        let top = p00[k] + (p10[k] - p00[k]) * tx;
        let bottom = p01[k] + (p11[k] - p01[k]) * tx;
        top + (bottom - top) * ty
    })
}

/// Straight-alpha source-over compositing.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn source_over(src: [f64; CHANNELS], dst: [u8; CHANNELS]) -> [u8; CHANNELS] {
    let sa = src[3] / 255.0;
    if sa >= 1.0 {
        return src.map(|c| c.round().clamp(0.0, 255.0) as u8);
    }
    let da = f64::from(dst[3]) / 255.0;
    let oa = sa + da * (1.0 - sa);
    if oa <= 0.0 {
        return [0; CHANNELS];
    }
    let to_u8 = |v: f64| v.round().clamp(0.0, 255.0) as u8;
    std::array::from_fn(|k| {
        if k == 3 {
            to_u8(oa * 255.0)
        } else {
            to_u8((src[k] * sa + f64::from(dst[k]) * da * (1.0 - sa)) / oa)
        }
    })
}
