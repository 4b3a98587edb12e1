//! Frameflight - headless frame pipelining demo
//!
//! Renders the courtyard scene against a simulated GPU queue for a fixed
//! number of frames, then drains the ring and reports statistics.
//!
//! ```text
//! frameflight [config.toml]
//! ```

mod demo;
mod shapes;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use frameflight_core::{Config, Timer, init_logging};
use frameflight_renderer::{Renderer, RendererSettings};
use frameflight_rhi::queue::SimulatedQueue;
use frameflight_rhi::sync::TimelineFence;

fn load_config() -> Result<Config> {
    match std::env::args().nth(1) {
        Some(path) => Config::load(Path::new(&path))
            .with_context(|| format!("Failed to load config from {path}")),
        None => Ok(Config::default()),
    }
}

fn run(config: &Config) -> Result<()> {
    let settings = RendererSettings::from_config(config);
    let mut demo = demo::build(settings.frames_in_flight, None).context("Failed to build demo scene")?;
    demo.context
        .camera_mut()
        .set_aspect(settings.render_width, settings.render_height);
    info!(
        "Uploaded {} bytes of static geometry",
        demo.buffers.size_in_bytes()
    );

    let queue = Arc::new(SimulatedQueue::new(config.gpu_latency()));
    let fence = Arc::new(TimelineFence::new());
    let mut renderer = Renderer::new(settings, &demo.context, queue.clone(), fence)
        .context("Failed to create renderer")?;

    info!("Initialization complete, rendering {} frames", config.frame_count);

    let mut timer = Timer::new();
    let mut objects_written = 0;
    let mut materials_written = 0;
    for _ in 0..config.frame_count {
        let delta = timer.tick().delta;
        let stats = renderer
            .run_frame(&mut demo.context, delta)
            .with_context(|| format!("Frame {} failed", renderer.frame_number()))?;
        objects_written += stats.objects_written;
        materials_written += stats.materials_written;
    }

    renderer.shutdown().context("Failed to drain frames in flight")?;

    let elapsed = timer.elapsed();
    let queue_stats = queue.stats();
    info!(
        "Rendered {} frames in {:.2?} ({:.1} fps)",
        renderer.frame_number(),
        elapsed,
        renderer.frame_number() as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    info!(
        "GPU executed {} submissions, {} draws, {} fence signals (last fence {})",
        queue_stats.submissions,
        queue_stats.draws,
        queue_stats.signals,
        renderer.sync().last_issued()
    );
    info!(
        "Uploaded {} object and {} material constant entries",
        objects_written, materials_written
    );
    Ok(())
}

fn main() {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("frameflight: {e:#}");
            std::process::exit(2);
        }
    };
    init_logging(&config.log_filter);

    info!("Starting frameflight v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&config) {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }

    info!("Shutdown complete");
}
