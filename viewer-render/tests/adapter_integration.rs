//! Integration tests for the pixel/canvas adapter.
//!
//! Covers the render/extract round trip, identity-transform restoration,
//! decoding, hit testing and reset.

use std::sync::Arc;

use tokio_stream::StreamExt;
use viewer_core::{
    lock_surface, CanvasError, CanvasStore, ImageData, Pixel, PixelGrid, PointerEvent, PointerKind,
    SharedSurface, Surface, SurfaceSlot, Transform, ZoomState,
};
use viewer_render::{CanvasAdapter, ImageFormat};

const RED: Pixel = Pixel::new(255, 0, 0, 255);
const GREEN: Pixel = Pixel::new(0, 255, 0, 255);
const BLUE: Pixel = Pixel::new(0, 0, 255, 255);
const YELLOW: Pixel = Pixel::new(255, 255, 0, 255);

fn two_by_two() -> PixelGrid {
    PixelGrid::from_rows(vec![vec![RED, GREEN], vec![BLUE, YELLOW]]).expect("grid")
}

/// A `width x height` transparent grid with a single red pixel.
fn single_red(width: usize, height: usize, col: usize, row: usize) -> PixelGrid {
    let mut rows = vec![vec![Pixel::TRANSPARENT; width]; height];
    rows[row][col] = RED;
    PixelGrid::from_rows(rows).expect("grid")
}

fn bound_adapter(surface: Surface) -> (CanvasAdapter, SharedSurface) {
    let store = CanvasStore::new();
    let shared = surface.into_shared();
    store.bind_surface(SurfaceSlot::Raw, Arc::clone(&shared));
    (CanvasAdapter::new(store), shared)
}

// ============================================================================
// Render / extract
// ============================================================================

#[test]
fn test_two_by_two_round_trip() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    let mut surface = Surface::new(8, 8);

    adapter
        .render_pixel_grid(&mut surface, &two_by_two())
        .expect("render");

    assert_eq!(adapter.extract_pixel_grid(&mut surface), two_by_two());
}

#[test]
fn test_round_trip_through_encoded_image() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    let mut surface = Surface::new(1, 1);
    let grid = PixelGrid::from_rows(vec![
        vec![RED, GREEN, BLUE],
        vec![YELLOW, Pixel::new(12, 34, 56, 255), Pixel::new(0, 0, 0, 255)],
    ])
    .expect("grid");

    let rendered = adapter.render_pixel_grid(&mut surface, &grid).expect("render");
    let decoded = viewer_render::decode_data_url(rendered.encoded.as_str()).expect("decode");

    assert_eq!(PixelGrid::from_image_data(&decoded), grid);
    assert_eq!(rendered.image_data, grid.to_image_data());
}

#[test]
fn test_render_ignores_existing_transform() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    let mut surface = Surface::new(4, 4);
    surface.set_transform(Transform::new(3.0, 0.2, 0.1, 2.0, 5.0, 5.0));

    adapter
        .render_pixel_grid(&mut surface, &two_by_two())
        .expect("render");

    assert_eq!((surface.width(), surface.height()), (2, 2));
    assert_eq!(adapter.extract_pixel_grid(&mut surface), two_by_two());
}

#[test]
fn test_extract_restores_transform() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    let mut surface = Surface::new(2, 2);
    let skew = Transform::new(1.5, 0.3, -0.2, 0.75, 12.0, -3.0);
    surface.set_transform(skew);

    let grid = adapter.extract_pixel_grid(&mut surface);

    assert_eq!(grid.width(), 2);
    assert_eq!(grid.height(), 2);
    assert_eq!(surface.transform(), skew);
}

// ============================================================================
// Identity transform scope
// ============================================================================

#[test]
fn test_identity_scope_restores_after_error() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    let mut surface = Surface::new(2, 1);
    let original = ImageData::from_raw(2, 1, vec![1, 2, 3, 255, 4, 5, 6, 255]).expect("data");
    surface.put_image_data(&original, 0, 0);
    let scale = Transform::scale(4.0, 2.0);
    surface.set_transform(scale);

    let result: Result<(), CanvasError> = adapter.with_identity_transform(&mut surface, |s| {
        s.resize(9, 9);
        Err(CanvasError::InvalidInput("boom".to_string()))
    });

    assert!(result.is_err());
    assert_eq!(surface.get_image_data(), original);
    assert_eq!(surface.transform(), scale);
}

#[test]
fn test_identity_scope_restores_after_panic() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    let mut surface = Surface::new(1, 1);
    let original = ImageData::from_raw(1, 1, vec![9, 8, 7, 255]).expect("data");
    surface.put_image_data(&original, 0, 0);
    let shear = Transform::new(1.0, 0.5, 0.5, 1.0, 0.0, 0.0);
    surface.set_transform(shear);

    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        adapter.with_identity_transform(&mut surface, |s| {
            s.clear();
            panic!("callback failed");
        });
    }));

    assert!(outcome.is_err());
    assert_eq!(surface.get_image_data(), original);
    assert_eq!(surface.transform(), shear);
}

#[test]
fn test_get_image_data_encodes_png() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    let mut surface = Surface::new(1, 1);
    adapter
        .render_pixel_grid(&mut surface, &two_by_two())
        .expect("render");

    let (image, encoded) = adapter.get_image_data(&mut surface).expect("image data");

    assert_eq!(image, two_by_two().to_image_data());
    let payload = encoded
        .as_str()
        .strip_prefix(viewer_render::codec::PNG_DATA_URL_PREFIX)
        .expect("png data url");
    assert!(!payload.is_empty());
}

// ============================================================================
// Loading images
// ============================================================================

#[test]
fn test_load_image_onto_surface() {
    let store = CanvasStore::new();
    store.set_displayed_image(Some(viewer_core::EncodedImage::from_data_url("data:,")));
    let adapter = CanvasAdapter::new(store.clone());
    let mut surface = Surface::new(1, 1);
    surface.set_transform(Transform::scale(2.0, 2.0));
    let image = two_by_two().to_image_data();

    let grid = adapter
        .load_image_onto_surface(&mut surface, &image)
        .expect("load");

    assert_eq!(grid, two_by_two());
    assert_eq!((surface.width(), surface.height()), (2, 2));
    assert!(surface.transform().is_identity());
    assert!(store.displayed_image().is_none());
}

#[test]
fn test_draw_image_data() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    let mut surface = Surface::new(5, 5);
    adapter.draw_image_data(&mut surface, &two_by_two().to_image_data(), 2, 2);
    assert_eq!(adapter.extract_pixel_grid(&mut surface), two_by_two());
    assert_eq!(
        adapter.image_data_to_pixels(&surface.get_image_data()),
        vec![RED, GREEN, BLUE, YELLOW]
    );
}

// ============================================================================
// Decoding
// ============================================================================

#[tokio::test]
async fn test_decode_empty_string_is_none() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    assert!(adapter.decode_image("").await.expect("decode").is_none());
}

#[tokio::test]
async fn test_create_image_from_pixels_keeps_surface() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    let mut surface = Surface::new(3, 3);
    let shift = Transform::translate(1.0, 1.0);
    surface.set_transform(shift);
    let before = surface.get_image_data();

    let job = adapter
        .create_image_from_pixels(&mut surface, &two_by_two())
        .expect("render");

    assert_eq!(surface.get_image_data(), before);
    assert_eq!(surface.transform(), shift);
    assert_eq!(job.await.expect("decode"), Some(two_by_two()));
}

#[tokio::test]
async fn test_create_image_from_empty_grid() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    let mut surface = Surface::new(3, 3);
    let job = adapter
        .create_image_from_pixels(&mut surface, &PixelGrid::empty())
        .expect("render");
    assert!(job.is_empty());
    assert!(job.await.expect("decode").is_none());
}

#[tokio::test]
async fn test_cancelled_decode_resolves_cancelled() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    let mut surface = Surface::new(1, 1);
    let rendered = adapter
        .render_pixel_grid(&mut surface, &two_by_two())
        .expect("render");

    let mut job = adapter.decode_image(rendered.encoded.as_str());
    job.cancel();

    assert!(matches!(job.await, Err(CanvasError::DecodeCancelled)));
}

#[tokio::test]
async fn test_decode_failure_is_reported() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    let result = adapter.decode_image("data:image/png;base64,AAAA").await;
    assert!(matches!(result, Err(CanvasError::DecodeFailed(_))));
    assert_eq!(ImageFormat::from_magic_bytes(&[0, 0, 0]), ImageFormat::Unknown);
}

// ============================================================================
// Hit testing
// ============================================================================

#[tokio::test]
async fn test_click_resolves_pixel_at_column_and_row() {
    let (mut adapter, shared) = bound_adapter(Surface::new(1, 1));
    {
        let mut surface = lock_surface(&shared);
        adapter
            .render_pixel_grid(&mut surface, &single_red(32, 32, 10, 20))
            .expect("render");
    }

    let streams = adapter.start_hit_testing(SurfaceSlot::Raw).expect("start");
    assert!(adapter.is_hit_testing(SurfaceSlot::Raw));
    assert!(adapter.store().is_listening(SurfaceSlot::Raw));

    lock_surface(&shared).dispatch(PointerEvent::click(10.0, 20.0));
    let click = streams.on_click.await.expect("click");

    let pixel = adapter
        .pixel_from_event(SurfaceSlot::Raw, &click)
        .expect("resolve");
    assert_eq!(pixel, Some(RED));
    assert_eq!(
        adapter.to_css_color(pixel.expect("pixel")),
        "rgba(255, 0, 0, 255)"
    );

    let swapped = adapter
        .resolve_pixel_at_screen_point(SurfaceSlot::Raw, 20.0, 10.0)
        .expect("resolve");
    assert_eq!(swapped, Some(Pixel::TRANSPARENT));
}

#[test]
fn test_out_of_bounds_points_are_none() {
    let (adapter, shared) = bound_adapter(Surface::new(1, 1));
    {
        let mut surface = lock_surface(&shared);
        adapter
            .render_pixel_grid(&mut surface, &single_red(4, 3, 0, 0))
            .expect("render");
    }

    for (x, y) in [(-1.0, 0.0), (0.0, -0.5), (4.0, 0.0), (0.0, 3.0), (f64::NAN, 1.0)] {
        let pixel = adapter
            .resolve_pixel_at_screen_point(SurfaceSlot::Raw, x, y)
            .expect("resolve");
        assert_eq!(pixel, None, "({x}, {y}) should be outside");
    }
    assert_eq!(
        adapter
            .resolve_pixel_at_screen_point(SurfaceSlot::Raw, 3.9, 2.9)
            .expect("resolve"),
        Some(Pixel::TRANSPARENT)
    );
}

#[tokio::test]
async fn test_move_stream_ends_on_stop() {
    let (mut adapter, shared) = bound_adapter(Surface::new(2, 2));
    let mut streams = adapter.start_hit_testing(SurfaceSlot::Raw).expect("start");

    lock_surface(&shared).dispatch(PointerEvent::moved(0.0, 0.0));
    lock_surface(&shared).dispatch(PointerEvent::moved(1.0, 1.0));
    adapter.stop_hit_testing(SurfaceSlot::Raw).expect("stop");
    assert_eq!(lock_surface(&shared).dispatch(PointerEvent::moved(1.0, 0.0)), 0);

    let first = streams.on_move.next().await.expect("first move");
    assert!((first.page_x - 0.0).abs() < f64::EPSILON);
    assert!(streams.on_move.next().await.is_some());
    assert!(streams.on_move.next().await.is_none());
    assert!(streams.on_click.await.is_none());
    assert!(!adapter.store().is_listening(SurfaceSlot::Raw));
}

#[tokio::test]
async fn test_restart_after_stop() {
    let (mut adapter, _shared) = bound_adapter(Surface::new(2, 2));
    let _first = adapter.start_hit_testing(SurfaceSlot::Raw).expect("start");
    adapter.stop_hit_testing(SurfaceSlot::Raw).expect("stop");
    adapter.stop_hit_testing(SurfaceSlot::Raw).expect("stop idle");
    assert!(adapter.start_hit_testing(SurfaceSlot::Raw).is_ok());
}

#[tokio::test]
async fn test_surfaces_listen_independently() {
    let store = CanvasStore::new();
    let raw = Surface::new(1, 1).into_shared();
    let derived = Surface::new(1, 1).into_shared();
    store.bind_surface(SurfaceSlot::Raw, Arc::clone(&raw));
    store.bind_surface(SurfaceSlot::Derived, Arc::clone(&derived));
    let mut adapter = CanvasAdapter::new(store);

    let mut raw_streams = adapter.start_hit_testing(SurfaceSlot::Raw).expect("raw");
    let mut derived_streams = adapter
        .start_hit_testing(SurfaceSlot::Derived)
        .expect("derived");
    adapter.stop_hit_testing(SurfaceSlot::Raw).expect("stop raw");

    lock_surface(&derived).dispatch(PointerEvent::moved(0.0, 0.0));
    assert!(derived_streams.on_move.next().await.is_some());
    assert!(raw_streams.on_move.next().await.is_none());
    assert!(adapter.is_hit_testing(SurfaceSlot::Derived));
}

// ============================================================================
// Reset
// ============================================================================

#[tokio::test]
async fn test_reset_restores_initial_state() {
    let (mut adapter, shared) = bound_adapter(Surface::new(2, 2));
    let store = adapter.store().clone();
    store.update_zoom(|z| {
        z.multiplier = 3.0;
        z.raw = 2.0;
    });
    store.set_raw_image(Some(two_by_two()));
    store.set_displayed_image(Some(viewer_core::EncodedImage::from_data_url("data:,")));
    let mut streams = adapter.start_hit_testing(SurfaceSlot::Raw).expect("start");

    adapter.reset().expect("reset");

    assert_eq!(store.zoom(), ZoomState::default());
    assert!(store.raw_image().is_none());
    assert!(store.displayed_image().is_none());
    assert!(!store.is_listening(SurfaceSlot::Raw));
    assert_eq!(lock_surface(&shared).dispatch(PointerEvent::moved(0.0, 0.0)), 0);
    assert!(streams.on_move.next().await.is_none());
}

#[test]
fn test_reset_without_surfaces() {
    let mut adapter = CanvasAdapter::new(CanvasStore::new());
    assert!(adapter.reset().is_ok());
}

#[tokio::test]
async fn test_reset_detaches_listeners_from_replaced_surface() {
    let (mut adapter, old) = bound_adapter(Surface::new(2, 2));
    let mut streams = adapter.start_hit_testing(SurfaceSlot::Raw).expect("start");

    // Rebound directly in the store, bypassing the adapter.
    adapter
        .store()
        .bind_surface(SurfaceSlot::Raw, Surface::new(2, 2).into_shared());
    adapter.reset().expect("reset");

    assert_eq!(lock_surface(&old).dispatch(PointerEvent::moved(0.0, 0.0)), 0);
    assert_eq!(lock_surface(&old).listener_count(PointerKind::Move), 0);
    assert_eq!(lock_surface(&old).listener_count(PointerKind::Click), 0);
    assert!(streams.on_move.next().await.is_none());
    assert!(streams.on_click.await.is_none());
}

#[tokio::test]
async fn test_rebinding_through_adapter_ends_old_session() {
    let (mut adapter, old) = bound_adapter(Surface::new(2, 2));
    let mut streams = adapter.start_hit_testing(SurfaceSlot::Raw).expect("start");

    let replacement = Surface::new(2, 2).into_shared();
    adapter.bind_surface(SurfaceSlot::Raw, Arc::clone(&replacement));

    assert!(!adapter.is_hit_testing(SurfaceSlot::Raw));
    assert!(!adapter.store().is_listening(SurfaceSlot::Raw));
    assert_eq!(lock_surface(&old).dispatch(PointerEvent::moved(1.0, 1.0)), 0);
    assert!(streams.on_move.next().await.is_none());

    // The new surface can start its own session.
    let _fresh = adapter.start_hit_testing(SurfaceSlot::Raw).expect("restart");
    assert_eq!(lock_surface(&replacement).listener_count(PointerKind::Move), 1);
}

#[tokio::test]
async fn test_unbind_ends_session() {
    let (mut adapter, old) = bound_adapter(Surface::new(2, 2));
    let mut streams = adapter.start_hit_testing(SurfaceSlot::Raw).expect("start");

    let unbound = adapter.unbind_surface(SurfaceSlot::Raw).expect("was bound");

    assert!(Arc::ptr_eq(&unbound, &old));
    assert!(adapter.store().surface(SurfaceSlot::Raw).is_none());
    assert!(streams.on_move.next().await.is_none());
    assert!(adapter.unbind_surface(SurfaceSlot::Raw).is_none());
}

#[test]
fn test_load_rejects_malformed_image_data() {
    let adapter = CanvasAdapter::new(CanvasStore::new());
    let mut surface = Surface::new(1, 1);
    let image = ImageData {
        width: 2,
        height: 2,
        data: vec![0; 4],
    };

    let result = adapter.load_image_onto_surface(&mut surface, &image);

    assert!(matches!(
        result,
        Err(CanvasError::DimensionMismatch {
            expected: 16,
            actual: 4
        })
    ));
    assert_eq!((surface.width(), surface.height()), (1, 1));
}
