//! Async producers with a tokio interval driving the repaint.
//!
//! Each lane is a tokio task. The render side calls [`RenderLoop::tick`]
//! from its own task instead of blocking a thread in `run`.

use std::time::Duration;

use lanebar::{ProgressRenderer, RenderLoop};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let renderer = ProgressRenderer::new("$=t [$40b#] $6p%", 4)?;
    let lanes = renderer.lanes();
    // started up front so the first tick does not see an idle renderer
    lanes.start_all();

    let producers: Vec<_> = ["pull image", "build layers", "push", "deploy"]
        .into_iter()
        .enumerate()
        .map(|(lane, title)| {
            let lanes = lanes.clone();
            tokio::spawn(async move {
                lanes.set_title(lane, title);
                for step in 1..=50 {
                    sleep(30 * (lane as u64 + 1)).await;
                    lanes.set_percentage(lane, step as f32 * 2.0);
                }
            })
        })
        .collect();

    let render = tokio::spawn(async move {
        let mut render = RenderLoop::new(renderer, std::io::stderr());
        let mut interval = tokio::time::interval(Duration::from_millis(50));
        loop {
            interval.tick().await;
            if !render.tick()? {
                break;
            }
        }
        Ok::<_, std::io::Error>(())
    });

    for producer in producers {
        producer.await?;
    }
    render.await??;
    Ok(())
}

async fn sleep(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
