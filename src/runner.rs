use std::io::Write;
use std::time::Duration;

use crate::ProgressRenderer;

/// Repaint interval used by [`RenderLoop::new`].
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// A self-contained render loop that repaints on a fixed interval until every
/// lane is done.
///
/// # Example
///
/// ```rust,no_run
/// use lanebar::{ProgressRenderer, RenderLoop};
///
/// let renderer = ProgressRenderer::new("$=t [$30b#] $p%", 3)?;
/// let lanes = renderer.lanes();
/// lanes.start_all();
///
/// for lane in 0..lanes.len() {
///     let lanes = lanes.clone();
///     std::thread::spawn(move || {
///         lanes.set_title(lane, &format!("job {lane}"));
///         for step in 1..=50 {
///             lanes.set_percentage(lane, step as f32 * 2.0);
///             std::thread::sleep(std::time::Duration::from_millis(40));
///         }
///     });
/// }
///
/// RenderLoop::new(renderer, std::io::stderr()).fps(30).run()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct RenderLoop<W: Write> {
    renderer: ProgressRenderer,
    writer: W,
    interval: Duration,
    summary: Option<String>,
}

impl<W: Write> RenderLoop<W> {
    /// Create a loop repainting every [`DEFAULT_INTERVAL`].
    pub fn new(renderer: ProgressRenderer, writer: W) -> Self {
        Self {
            renderer,
            writer,
            interval: DEFAULT_INTERVAL,
            summary: None,
        }
    }

    /// Set the repaint interval.
    pub fn interval(mut self, d: Duration) -> Self {
        self.interval = d;
        self
    }

    /// Set the repaint interval as frames per second. Zero is treated as one.
    pub fn fps(self, fps: u32) -> Self {
        self.interval(Duration::from_secs(1) / fps.max(1))
    }

    /// Draw one aggregate line titled `title` instead of a line per lane.
    pub fn summary(mut self, title: impl Into<String>) -> Self {
        self.summary = Some(title.into());
        self
    }

    pub fn renderer(&self) -> &ProgressRenderer {
        &self.renderer
    }

    /// Mutable access, e.g. to subscribe to events before running.
    pub fn renderer_mut(&mut self) -> &mut ProgressRenderer {
        &mut self.renderer
    }

    /// Draws one frame if the renderer is still active. Returns whether it
    /// was.
    ///
    /// Use this to drive the loop yourself, e.g. from an async interval.
    ///
    /// # Errors
    ///
    /// Propagates write failures from the writer.
    pub fn tick(&mut self) -> std::io::Result<bool> {
        if !self.renderer.is_active() {
            return Ok(false);
        }
        match &self.summary {
            Some(title) => self.renderer.render_summary(&mut self.writer, title)?,
            None => self.renderer.render_frame(&mut self.writer)?,
        }
        Ok(true)
    }

    /// Run the loop until every lane is done or the renderer is aborted.
    ///
    /// Blocks the calling thread and hands the renderer back at the end.
    ///
    /// # Errors
    ///
    /// Stops at the first write failure and returns it.
    pub fn run(self) -> std::io::Result<ProgressRenderer> {
        self.run_until(|| false)
    }

    /// Like [`run`](Self::run), but aborts the renderer as soon as `stop`
    /// returns `true`.
    ///
    /// # Errors
    ///
    /// Stops at the first write failure and returns it.
    pub fn run_until(mut self, stop: impl Fn() -> bool) -> std::io::Result<ProgressRenderer> {
        while self.tick()? {
            if stop() {
                self.renderer.abort();
                break;
            }
            std::thread::sleep(self.interval);
        }
        if self.summary.is_some() {
            // leave the summary line in place
            writeln!(self.writer)?;
        }
        self.writer.flush()?;
        Ok(self.renderer)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::{EventKind, FixedWidth};

    fn renderer(template: &str, lanes: usize) -> ProgressRenderer {
        ProgressRenderer::new(template, lanes)
            .unwrap()
            .with_width(FixedWidth(40))
    }

    #[test]
    fn fps_sets_the_interval() {
        let r = RenderLoop::new(renderer("$t", 0), Vec::new()).fps(20);
        assert_eq!(r.interval, Duration::from_millis(50));
        let r = RenderLoop::new(renderer("$t", 0), Vec::new()).fps(0);
        assert_eq!(r.interval, Duration::from_secs(1));
    }

    #[test]
    fn runs_until_every_lane_is_drawn_finished() {
        let renderer = renderer("$t:$p", 2);
        let lanes = renderer.lanes();
        lanes.start_all();
        lanes.set_title(0, "a");
        lanes.set_title(1, "b");
        lanes.set_percentage(0, 100.0);
        lanes.abort(1);

        let mut out = Vec::new();
        let renderer = RenderLoop::new(renderer, &mut out)
            .interval(Duration::ZERO)
            .run()
            .unwrap();

        assert!(!renderer.lanes().is_cancelled());
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("a:100.00\n"), "{text:?}");
        assert!(text.contains("b:0.00\n"), "{text:?}");
    }

    #[test]
    fn idle_renderer_draws_nothing() {
        let mut out = Vec::new();
        RenderLoop::new(renderer("$t", 3), &mut out).run().unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn stop_condition_aborts() {
        let renderer = renderer("$t", 1);
        renderer.start_all();
        let ticks = AtomicUsize::new(0);

        let renderer = RenderLoop::new(renderer, Vec::new())
            .interval(Duration::ZERO)
            .run_until(|| ticks.fetch_add(1, Ordering::Relaxed) >= 2)
            .unwrap();

        assert_eq!(ticks.load(Ordering::Relaxed), 3);
        assert!(renderer.lanes().is_cancelled());
    }

    #[test]
    fn summary_mode_ends_with_a_newline() {
        let renderer = renderer("$t $p", 2);
        renderer.start_all();
        renderer.set_percentage(0, 100.0);
        renderer.set_percentage(1, 100.0);

        let finished = Arc::new(AtomicUsize::new(0));
        let mut out = Vec::new();
        let mut run = RenderLoop::new(renderer, &mut out)
            .interval(Duration::ZERO)
            .summary("all");
        {
            let finished = finished.clone();
            run.renderer_mut()
                .subscribe(EventKind::LaneFinished, move |_| {
                    finished.fetch_add(1, Ordering::Relaxed);
                });
        }
        run.run().unwrap();

        assert_eq!(finished.load(Ordering::Relaxed), 2);
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("all 100.00\n"), "{text:?}");
    }
}
