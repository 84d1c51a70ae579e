//! One lane per worker thread, drawn by [`RenderLoop`] on the main thread.
//!
//! Workers run at different speeds and one of them gives up halfway, so the
//! output shows finished lines settling above the ones still running.

use std::time::Duration;

use lanebar::{EventKind, ProgressRenderer, RenderLoop};

const JOBS: &[(&str, u64)] = &[
    ("fetch index", 15),
    ("resolve deps", 25),
    ("download crates", 40),
    ("compile", 60),
    ("flaky mirror", 30),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut renderer = ProgressRenderer::new("$=t [$30b#] $6p%", JOBS.len())?;
    renderer.subscribe(EventKind::Finished, |_| eprintln!("all jobs done"));

    let lanes = renderer.lanes();
    lanes.start_all();

    let workers: Vec<_> = JOBS
        .iter()
        .enumerate()
        .map(|(lane, &(title, step_ms))| {
            let lanes = lanes.clone();
            std::thread::spawn(move || {
                lanes.set_title(lane, title);
                for step in 1..=100 {
                    if title == "flaky mirror" && step == 50 {
                        lanes.set_title(lane, "flaky mirror (gave up)");
                        lanes.abort(lane);
                        return;
                    }
                    lanes.set_percentage(lane, step as f32);
                    sleep(step_ms);
                }
            })
        })
        .collect();

    RenderLoop::new(renderer, std::io::stderr()).fps(20).run()?;

    for worker in workers {
        worker.join().ok();
    }
    Ok(())
}

fn sleep(ms: u64) {
    std::thread::sleep(Duration::from_millis(ms));
}
