//! A single aggregate line for many lanes.
//!
//! Twenty short jobs share one bar showing the average of whatever is still
//! in progress.

use std::time::Duration;

use lanebar::{ProgressRenderer, RenderLoop};

const LANES: usize = 20;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let renderer = ProgressRenderer::new("$16t [$=b=] $6p%", LANES)?;
    let lanes = renderer.lanes();
    lanes.start_all();

    std::thread::scope(|scope| {
        for lane in 0..LANES {
            let lanes = &lanes;
            scope.spawn(move || {
                let step = 1 + lane as u64 % 4;
                let mut done = 0.0;
                while done < 100.0 {
                    done += step as f32;
                    lanes.set_percentage(lane, done);
                    std::thread::sleep(Duration::from_millis(20 * step));
                }
            });
        }

        RenderLoop::new(renderer, std::io::stderr())
            .interval(Duration::from_millis(50))
            .summary(format!("{LANES} jobs"))
            .run()
            .map(|_| ())
    })?;
    Ok(())
}
