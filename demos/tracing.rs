//! Lanes driven by `tracing` spans through [`LaneLayer`].
//!
//! Each worker opens a span with a `lane` field and reports progress as
//! events; the layer turns those into lane updates.

use std::time::Duration;

use lanebar::{LaneLayer, ProgressRenderer, RenderLoop};
use tracing::{info, info_span};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const STEPS: &[&[&str]] = &[
    &["parse", "type check", "codegen", "link"],
    &["pull base image", "layer 1/3", "layer 2/3", "layer 3/3", "push"],
    &["preflight", "swap containers", "health check"],
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let renderer = ProgressRenderer::new("$20t $=b. $6p%", STEPS.len())?;
    tracing_subscriber::registry()
        .with(LaneLayer::new(renderer.lanes()))
        .init();

    let workers: Vec<_> = STEPS
        .iter()
        .enumerate()
        .map(|(lane, steps)| {
            // opening the span starts the lane
            let span = info_span!("job", lane, title = steps[0]);
            std::thread::spawn(move || {
                let _guard = span.enter();
                for (done, step) in steps.iter().enumerate() {
                    info!(title = *step, progress = 100.0 * done as f64 / steps.len() as f64);
                    std::thread::sleep(Duration::from_millis(400 + 150 * lane as u64));
                }
                info!(progress = 100.0);
            })
        })
        .collect();

    RenderLoop::new(renderer, std::io::stderr()).fps(15).run()?;

    for worker in workers {
        worker.join().ok();
    }
    Ok(())
}
