//! # Pixel Viewer
//!
//! Loads an image onto a surface, clicks at each requested point and prints
//! the color under it.

use anyhow::Context;
use clap::Parser;
use viewer_app::{init_tracing, CliArgs, DisplayController, ViewerConfig};
use viewer_core::{lock_surface, CanvasStore, PointerEvent, Surface, SurfaceSlot};
use viewer_render::{AdapterConfig, CanvasAdapter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let image = args.image.clone();
    let clicks = args.clicks.clone();
    let emit = args.emit;
    let config = ViewerConfig::from(args);

    init_tracing(config.log_format);
    tracing::info!("Starting pixel viewer {}", viewer_core::VERSION);

    let store = CanvasStore::new();
    let adapter = CanvasAdapter::with_config(
        store.clone(),
        AdapterConfig {
            css_alpha: config.css_alpha,
        },
    );
    let mut controller = DisplayController::new(adapter);

    controller.on_slider_change(config.zoom);
    if let Some(ref multiplier) = config.multiplier {
        controller.on_multiplier_input(multiplier)?;
    }

    let surface = Surface::new(1, 1)
        .with_offset(config.offset.x, config.offset.y)
        .into_shared();
    controller.on_raw_surface_ready(Some(surface.clone()));

    let grid = controller
        .load_encoded_image(&image)
        .await?
        .context("no image given")?;
    tracing::info!("Loaded {}x{} image", grid.width(), grid.height());

    for point in clicks {
        let streams = controller
            .adapter_mut()
            .start_hit_testing(SurfaceSlot::Raw)?;
        let delivered = lock_surface(&surface).dispatch(PointerEvent::click(point.x, point.y));
        tracing::debug!("Click at {},{} delivered to {delivered} listeners", point.x, point.y);

        let event = streams
            .on_click
            .await
            .context("hit testing stopped before the click arrived")?;
        let color = controller
            .adapter()
            .pixel_from_event(SurfaceSlot::Raw, &event)?
            .map_or_else(|| "none".to_string(), |p| controller.adapter().to_css_color(p));
        println!("{},{}\t{color}", point.x, point.y);

        controller.adapter_mut().stop_hit_testing(SurfaceSlot::Raw)?;
    }

    println!(
        "zoom\t{}",
        DisplayController::format_slider_label(controller.zoom())
    );

    if emit {
        let (_, encoded) = controller
            .adapter()
            .get_image_data(&mut lock_surface(&surface))?;
        println!("{encoded}");
    }

    controller.adapter_mut().reset()?;
    tracing::info!("Pixel viewer exited");
    Ok(())
}
