use std::io::Write;
use std::sync::Arc;

use crate::event::{Event, EventKind, Subscribers};
use crate::format::{CompileError, Format};
use crate::lane::LaneRegistry;
use crate::layout::{BYTES_PER_COLUMN, LineBuffer, render_line};
use crate::terminal::{TerminalWidth, WidthTracker, default_source};

/// Write target with ANSI cursor control for redrawing a block of lines.
///
/// Every line is drawn from column 1 over a cleared row, so a frame can be
/// painted straight over the previous one after [`FrameWriter::rewind`].
pub struct FrameWriter<'a> {
    target: &'a mut dyn Write,
    lines: usize,
}

impl<'a> FrameWriter<'a> {
    pub fn new(target: &'a mut dyn Write) -> Self {
        Self { target, lines: 0 }
    }

    /// Moves the cursor up over `lines` rows drawn earlier.
    pub fn rewind(&mut self, lines: usize) -> std::io::Result<()> {
        if lines > 0 {
            write!(self.target, "\x1b[{lines}A")?;
        }
        Ok(())
    }

    /// Replaces the current row with `line` and moves to the next row.
    pub fn line(&mut self, line: &str) -> std::io::Result<()> {
        writeln!(self, "\x1b[1G\x1b[2K{line}")
    }

    /// Replaces the current row with `line`, leaving the cursor on it.
    pub fn overwrite(&mut self, line: &str) -> std::io::Result<()> {
        write!(self, "\x1b[1G\x1b[2K{line}")
    }

    /// Clears everything from the cursor to the end of the screen.
    pub fn clear_below(&mut self) -> std::io::Result<()> {
        self.target.write_all(b"\x1b[J")
    }

    /// Rows written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }
}

impl Write for FrameWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.target.write(buf)?;
        self.lines += buf[..written].iter().filter(|&&b| b == b'\n').count();
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.target.flush()
    }
}

/// One composed line of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLine {
    pub lane: usize,
    /// `true` for the single final line of a lane that just stopped.
    pub finished: bool,
    pub text: String,
}

/// Draws every lane of a [`LaneRegistry`] through one compiled [`Format`].
///
/// The renderer is immediate-mode: producers update lanes through the
/// shared [`LaneRegistry`] from any thread, and the render thread calls
/// [`render_frame`](Self::render_frame) while [`is_active`](Self::is_active)
/// holds.
///
/// Each frame first draws the final line of every lane that stopped since
/// the previous frame, then a line for each running lane. Final lines stay
/// on screen; only the running lines are redrawn by the next frame.
///
/// ```rust,no_run
/// use lanebar::{FixedWidth, ProgressRenderer};
///
/// let mut renderer = ProgressRenderer::new("$=t [$40b#] $p%", 4)?
///     .with_width(FixedWidth(100));
/// let lanes = renderer.lanes();
/// lanes.start_all();
///
/// std::thread::spawn(move || {
///     for step in 0..=100 {
///         for lane in 0..lanes.len() {
///             lanes.set_title(lane, &format!("worker {lane}"));
///             lanes.set_percentage(lane, step as f32);
///         }
///         std::thread::sleep(std::time::Duration::from_millis(20));
///     }
/// });
///
/// let mut stdout = std::io::stdout();
/// while renderer.is_active() {
///     renderer.render_frame(&mut stdout)?;
///     std::thread::sleep(std::time::Duration::from_millis(33));
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct ProgressRenderer {
    format: Format,
    lanes: Arc<LaneRegistry>,
    width: WidthTracker,
    line: LineBuffer,
    frame: Vec<FrameLine>,
    subscribers: Subscribers,
    pending: Vec<Event>,
    active: bool,
    live_lines: usize,
}

impl ProgressRenderer {
    /// Compiles `template` and creates `lanes` idle lanes.
    ///
    /// # Errors
    ///
    /// Returns the [`CompileError`] if the template is malformed; no renderer
    /// is created in that case.
    pub fn new(template: &str, lanes: usize) -> Result<Self, CompileError> {
        match Format::compile(template) {
            Ok(format) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(template, directives = format.len(), lanes, "compiled progress format");
                Ok(Self::from_format(format, lanes))
            }
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(template, %error, "rejected progress format");
                Err(error)
            }
        }
    }

    pub fn from_format(format: Format, lanes: usize) -> Self {
        Self {
            format,
            lanes: Arc::new(LaneRegistry::new(lanes)),
            width: WidthTracker::new(default_source()),
            line: LineBuffer::default(),
            frame: Vec::with_capacity(lanes),
            subscribers: Subscribers::new(lanes),
            pending: Vec::new(),
            active: true,
            live_lines: 0,
        }
    }

    /// Replaces the terminal width source.
    pub fn with_width(mut self, source: impl TerminalWidth + Send + 'static) -> Self {
        self.width.set_source(Box::new(source));
        self
    }

    /// Queries the width source every `frames` frames instead of the default
    /// [`DEFAULT_WIDTH_REFRESH`](crate::terminal::DEFAULT_WIDTH_REFRESH).
    pub fn width_refresh_every(mut self, frames: usize) -> Self {
        self.width.set_refresh_every(frames);
        self
    }

    /// Handle for producers. Clone it into as many threads as needed.
    pub fn lanes(&self) -> Arc<LaneRegistry> {
        self.lanes.clone()
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    /// Width the last frame was laid out at.
    pub fn width(&self) -> usize {
        self.width.width()
    }

    /// Running lines drawn by the last frame, which the next frame rewinds
    /// over.
    pub fn live_lines(&self) -> usize {
        self.live_lines
    }

    pub fn start(&self, lane: usize) {
        self.lanes.start(lane);
    }

    pub fn start_all(&self) {
        self.lanes.start_all();
    }

    pub fn abort_lane(&self, lane: usize) {
        self.lanes.abort(lane);
    }

    pub fn set_title(&self, lane: usize, title: &str) {
        self.lanes.set_title(lane, title);
    }

    pub fn set_percentage(&self, lane: usize, percentage: f32) {
        self.lanes.set_percentage(lane, percentage);
    }

    /// Stops rendering for good, whatever state the lanes are in.
    pub fn abort(&self) {
        self.lanes.cancel();
    }

    /// Registers `f` to run on the render thread whenever an event of `kind`
    /// fires. Subscribers of one kind run in registration order.
    pub fn subscribe(&mut self, kind: EventKind, f: impl FnMut(&Event) + Send + 'static) {
        self.subscribers.subscribe(kind, Box::new(f));
    }

    /// `false` once the renderer was aborted, or once every lane has stopped
    /// and had its final line drawn. Stays `false` from then on.
    ///
    /// Lanes start idle, so start them before polling this.
    pub fn is_active(&mut self) -> bool {
        if !self.active {
            return false;
        }
        if self.lanes.is_cancelled() || self.lanes.is_settled() {
            self.active = false;
            #[cfg(feature = "tracing")]
            tracing::debug!(cancelled = self.lanes.is_cancelled(), "progress renderer finished");
            self.subscribers.emit(Event::Finished);
            return false;
        }
        true
    }

    /// Draws one frame to `target`. Does nothing after [`abort`](Self::abort).
    ///
    /// # Errors
    ///
    /// Propagates write failures from `target`.
    pub fn render_frame(&mut self, target: &mut dyn Write) -> std::io::Result<()> {
        if self.lanes.is_cancelled() {
            return Ok(());
        }
        self.compose();

        let mut frame = FrameWriter::new(target);
        frame.rewind(self.live_lines)?;
        for line in &self.frame {
            frame.line(&line.text)?;
        }
        frame.clear_below()?;
        frame.flush()?;

        self.live_lines = self.frame.iter().filter(|line| !line.finished).count();
        self.dispatch();
        Ok(())
    }

    /// Composes the next frame without writing it anywhere, for callers that
    /// drive their own output. Consumes finish edges and fires events exactly
    /// like [`render_frame`](Self::render_frame).
    pub fn compose_frame(&mut self) -> &[FrameLine] {
        if self.lanes.is_cancelled() {
            self.frame.clear();
        } else {
            self.compose();
            self.dispatch();
        }
        &self.frame
    }

    /// Redraws a single line in place showing `title` and the average
    /// percentage of the lanes still in progress. Finish edges are consumed
    /// as in a normal frame. Nothing is drawn when no lane is in progress.
    ///
    /// # Errors
    ///
    /// Propagates write failures from `target`.
    pub fn render_summary(&mut self, target: &mut dyn Write, title: &str) -> std::io::Result<()> {
        if self.lanes.is_cancelled() {
            return Ok(());
        }
        let width = self.refresh_width();
        self.collect_started();

        let mut total = 0.0;
        let mut count = 0usize;
        for lane in 0..self.lanes.len() {
            if let Some(percentage) = self.lanes.take_finished(lane, |state| state.percentage) {
                self.pending.push(Event::LaneFinished { lane });
                total += percentage;
                count += 1;
            } else if let Some(percentage) = self.lanes.with_running(lane, |state| state.percentage) {
                total += percentage;
                count += 1;
            }
        }

        if count > 0 {
            render_line(&self.format, title, total / count as f32, width, &mut self.line);
            let mut frame = FrameWriter::new(target);
            frame.overwrite(self.line.as_str())?;
            frame.flush()?;
        }
        self.dispatch();
        Ok(())
    }

    fn compose(&mut self) {
        self.frame.clear();
        let width = self.refresh_width();
        self.collect_started();

        let Self {
            format,
            lanes,
            line,
            frame,
            pending,
            ..
        } = self;

        for lane in 0..lanes.len() {
            let drawn = lanes.take_finished(lane, |state| {
                render_line(format, &state.title, state.percentage, width, line);
            });
            if drawn.is_some() {
                #[cfg(feature = "tracing")]
                tracing::trace!(lane, "lane finished");
                frame.push(FrameLine {
                    lane,
                    finished: true,
                    text: line.as_str().to_owned(),
                });
                pending.push(Event::LaneFinished { lane });
            }
        }

        for lane in 0..lanes.len() {
            let drawn = lanes.with_running(lane, |state| {
                render_line(format, &state.title, state.percentage, width, line);
            });
            if drawn.is_some() {
                frame.push(FrameLine {
                    lane,
                    finished: false,
                    text: line.as_str().to_owned(),
                });
            }
        }
    }

    fn refresh_width(&mut self) -> usize {
        let (width, changed) = self.width.tick();
        if changed {
            #[cfg(feature = "tracing")]
            tracing::debug!(width, "terminal width changed");
            self.line.resize(width.saturating_mul(BYTES_PER_COLUMN));
        }
        width
    }

    fn collect_started(&mut self) {
        for lane in 0..self.lanes.len() {
            if self.lanes.take_started(lane) {
                self.pending.push(Event::LaneStarted { lane });
            }
        }
    }

    fn dispatch(&mut self) {
        for event in self.pending.drain(..) {
            self.subscribers.emit(event);
        }
    }
}
