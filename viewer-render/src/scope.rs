//! Identity-transform scopes.
//!
//! An [`IdentityScope`] snapshots a surface's size, pixels, transform and
//! smoothing flag, switches it to the identity transform, and puts everything
//! back when dropped. Restoration also runs when the scoped work returns
//! early or unwinds.

use std::ops::{Deref, DerefMut};

use viewer_core::{ImageData, Surface, Transform};

/// Guard that restores a surface's prior state on drop.
pub struct IdentityScope<'a> {
    surface: &'a mut Surface,
    snapshot: ImageData,
    transform: Transform,
    smoothing: bool,
}

impl<'a> IdentityScope<'a> {
    /// Snapshot the surface and reset it to the identity transform.
    pub fn enter(surface: &'a mut Surface) -> Self {
        let snapshot = surface.get_image_data();
        let transform = surface.transform();
        let smoothing = surface.image_smoothing_enabled();
        surface.set_transform(Transform::IDENTITY);
        Self {
            surface,
            snapshot,
            transform,
            smoothing,
        }
    }
}

impl Deref for IdentityScope<'_> {
    type Target = Surface;

    fn deref(&self) -> &Surface {
        self.surface
    }
}

impl DerefMut for IdentityScope<'_> {
    fn deref_mut(&mut self) -> &mut Surface {
        self.surface
    }
}

impl Drop for IdentityScope<'_> {
    fn drop(&mut self) {
        let snapshot = &self.snapshot;
        if self.surface.width() != snapshot.width || self.surface.height() != snapshot.height {
            self.surface.resize(snapshot.width, snapshot.height);
        }
        self.surface.put_image_data(snapshot, 0, 0);
        self.surface.set_transform(self.transform);
        self.surface.set_image_smoothing(self.smoothing);
    }
}

/// Run `f` on the surface under the identity transform, then restore the
/// surface's prior size, pixels and transform.
pub fn with_identity_transform<T, F>(surface: &mut Surface, f: F) -> T
where
    F: FnOnce(&mut Surface) -> T,
{
    let mut scope = IdentityScope::enter(surface);
    f(&mut *scope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_is_identity_inside_and_restored_after() {
        let mut surface = Surface::new(2, 2);
        let skewed = Transform::new(2.0, 0.5, 0.25, 3.0, 4.0, 5.0);
        surface.set_transform(skewed);

        let seen = with_identity_transform(&mut surface, |s| s.transform());

        assert!(seen.is_identity());
        assert_eq!(surface.transform(), skewed);
    }

    #[test]
    fn test_pixels_and_size_restored_after_resize() {
        let mut surface = Surface::new(1, 1);
        let original = ImageData::from_raw(1, 1, vec![7, 8, 9, 255]).unwrap();
        surface.put_image_data(&original, 0, 0);
        surface.set_image_smoothing(false);

        with_identity_transform(&mut surface, |s| {
            s.resize(3, 3);
            s.clear();
        });

        assert_eq!(surface.get_image_data(), original);
        assert!(!surface.image_smoothing_enabled());
    }
}
