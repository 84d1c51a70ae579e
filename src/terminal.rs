//! Terminal width sources.
//!
//! The renderer asks its [`TerminalWidth`] once up front and then again every
//! few frames, so a resized terminal is picked up without paying for a query
//! on every frame.

/// Width assumed until a query succeeds.
pub const DEFAULT_WIDTH: usize = 80;

/// Frames between width queries.
pub const DEFAULT_WIDTH_REFRESH: usize = 10;

/// Reports the current terminal width in columns.
///
/// Implemented for any `FnMut() -> Option<usize>`, so a closure works as a
/// source.
pub trait TerminalWidth {
    /// `None` when the width cannot be determined right now.
    fn columns(&mut self) -> Option<usize>;
}

impl<F> TerminalWidth for F
where
    F: FnMut() -> Option<usize>,
{
    fn columns(&mut self) -> Option<usize> {
        self()
    }
}

/// A width that never changes. Useful when output is not a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWidth(pub usize);

impl TerminalWidth for FixedWidth {
    fn columns(&mut self) -> Option<usize> {
        Some(self.0)
    }
}

/// Width of the terminal attached to the process, queried through crossterm.
#[cfg(feature = "crossterm")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminalColumns;

#[cfg(feature = "crossterm")]
impl TerminalWidth for TerminalColumns {
    fn columns(&mut self) -> Option<usize> {
        crossterm::terminal::size()
            .ok()
            .map(|(columns, _rows)| usize::from(columns))
    }
}

/// The width source a renderer uses when none is given.
pub(crate) fn default_source() -> Box<dyn TerminalWidth + Send> {
    #[cfg(feature = "crossterm")]
    return Box::new(TerminalColumns);
    #[cfg(not(feature = "crossterm"))]
    return Box::new(FixedWidth(DEFAULT_WIDTH));
}

/// Caches the width between periodic queries.
pub(crate) struct WidthTracker {
    source: Box<dyn TerminalWidth + Send>,
    width: usize,
    refresh_every: usize,
    frames_since_query: Option<usize>,
}

impl std::fmt::Debug for WidthTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidthTracker")
            .field("width", &self.width)
            .field("refresh_every", &self.refresh_every)
            .field("frames_since_query", &self.frames_since_query)
            .finish_non_exhaustive()
    }
}

impl WidthTracker {
    pub(crate) fn new(source: Box<dyn TerminalWidth + Send>) -> Self {
        Self {
            source,
            width: DEFAULT_WIDTH,
            refresh_every: DEFAULT_WIDTH_REFRESH,
            frames_since_query: None,
        }
    }

    pub(crate) fn set_source(&mut self, source: Box<dyn TerminalWidth + Send>) {
        self.source = source;
        self.frames_since_query = None;
    }

    /// Queries every `frames` frames; 0 and 1 both mean every frame.
    pub(crate) fn set_refresh_every(&mut self, frames: usize) {
        self.refresh_every = frames.max(1);
    }

    /// Last known width, without querying.
    pub(crate) fn width(&self) -> usize {
        self.width
    }

    /// Advances one frame and returns the width to lay it out at, plus
    /// whether it differs from the previous frame's. A failed or zero-width
    /// query keeps the last width.
    pub(crate) fn tick(&mut self) -> (usize, bool) {
        let due = self
            .frames_since_query
            .is_none_or(|frames| frames >= self.refresh_every);
        if !due {
            self.frames_since_query = self.frames_since_query.map(|frames| frames + 1);
            return (self.width, false);
        }

        let first = self.frames_since_query.is_none();
        self.frames_since_query = Some(1);
        match self.source.columns().filter(|&columns| columns > 0) {
            Some(columns) if columns != self.width => {
                self.width = columns;
                (columns, true)
            }
            _ => (self.width, first),
        }
    }
}
