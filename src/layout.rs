//! Line layout: resolves a compiled [`Format`] against one lane's title and
//! percentage into a single terminal line.
//!
//! Layout runs in two passes. The first sums the columns of every directive
//! that is not flex: fixed widths as given, everything else measured from the
//! text it will show. The second hands the flex directive whatever is left of
//! the target width (possibly nothing) and writes each directive, padded or
//! cut to its resolved width.
//!
//! ```rust
//! use lanebar::{Format, LineBuffer, render_line};
//!
//! let format = Format::compile("$10t[$20b#]$p%").unwrap();
//! let mut line = LineBuffer::for_width(80);
//! render_line(&format, "Simple", 31.0, 80, &mut line);
//! assert_eq!(line.as_str(), "Simple    [######              ]31.00%");
//! ```

use std::fmt;

use crate::format::{Directive, DirectiveKind, Format, Width};

/// Bytes of line buffer reserved per terminal column.
pub const BYTES_PER_COLUMN: usize = 4;

/// Bounded output buffer for one composed line.
///
/// Writes stop once the byte capacity is reached; a `char` is never split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    text: String,
    capacity: usize,
}

impl LineBuffer {
    /// A buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            capacity,
        }
    }

    /// A buffer sized for a terminal `columns` wide.
    pub fn for_width(columns: usize) -> Self {
        Self::new(columns.saturating_mul(BYTES_PER_COLUMN))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity, dropping whole chars from the end if the current
    /// contents no longer fit.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.text.len() > capacity {
            self.text.pop();
        }
        self.text.reserve(capacity.saturating_sub(self.text.len()));
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of chars written, i.e. display columns.
    pub fn columns(&self) -> usize {
        self.text.chars().count()
    }

    fn push(&mut self, ch: char) -> bool {
        if self.text.len() + ch.len_utf8() > self.capacity {
            return false;
        }
        self.text.push(ch);
        true
    }

    fn push_repeat(&mut self, ch: char, count: usize) -> bool {
        (0..count).all(|_| self.push(ch))
    }
}

impl AsRef<str> for LineBuffer {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for LineBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Result of the measuring pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measure {
    /// Columns used by every directive except the flex one.
    pub taken: usize,
    /// Columns handed to the flex directive.
    pub flex: usize,
}

impl Measure {
    /// Total width of the line this measure describes.
    pub fn total(&self) -> usize {
        self.taken + self.flex
    }
}

/// Clamps a percentage into `0..=100`. NaN counts as zero.
pub fn clamp_percentage(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Percentage as shown by `$p`: always two decimals.
pub fn percentage_text(percentage: f32) -> String {
    format!("{:.2}", clamp_percentage(percentage))
}

/// Runs the measuring pass alone.
pub fn measure(format: &Format, title: &str, percentage: f32, target_width: usize) -> Measure {
    let percent = percentage_text(percentage);
    let content = Content::new(title, &percent);
    content.measure(format, target_width)
}

/// Composes the line for one lane into `out`, replacing what it held.
///
/// With a flex directive the line is exactly `target_width` columns unless
/// the other directives alone are wider, in which case flex gets nothing and
/// the line overflows. Without one, the line is as wide as its directives.
/// Nothing is drawn for a `target_width` of 0 or 1.
pub fn render_line(
    format: &Format, title: &str, percentage: f32, target_width: usize, out: &mut LineBuffer,
) {
    out.clear();
    if target_width <= 1 {
        return;
    }

    let percentage = clamp_percentage(percentage);
    let percent = percentage_text(percentage);
    let content = Content::new(title, &percent);
    let measure = content.measure(format, target_width);

    for directive in format.directives() {
        let width = match directive.width() {
            Width::Flex => measure.flex,
            Width::Fixed(n) => n,
            Width::Content => content.columns(directive),
        };
        let fits = match directive.kind() {
            DirectiveKind::Literal(span) => write_text(out, format.literal(span), width),
            DirectiveKind::Title => write_text(out, title, width),
            DirectiveKind::Percentage => write_text(out, &percent, width),
            DirectiveKind::Bar { fill } => write_bar(out, fill, percentage, width),
        };
        if !fits {
            break;
        }
    }
}

/// Number of bar columns drawn with the fill glyph.
pub fn filled_columns(width: usize, percentage: f32) -> usize {
    let ratio = f64::from(clamp_percentage(percentage)) / 100.0;
    ((width as f64 * ratio).floor() as usize).min(width)
}

/// Live text measured once per line.
struct Content<'a> {
    title_columns: usize,
    percent: &'a str,
}

impl<'a> Content<'a> {
    fn new(title: &str, percent: &'a str) -> Self {
        Self {
            title_columns: title.chars().count(),
            percent,
        }
    }

    fn columns(&self, directive: &Directive) -> usize {
        match directive.kind() {
            DirectiveKind::Literal(span) => span.columns(),
            DirectiveKind::Title => self.title_columns,
            DirectiveKind::Percentage => self.percent.len(),
            // rejected by the compiler
            DirectiveKind::Bar { .. } => 0,
        }
    }

    fn measure(&self, format: &Format, target_width: usize) -> Measure {
        let taken = format
            .directives()
            .iter()
            .map(|directive| match directive.width() {
                Width::Flex => 0,
                Width::Fixed(n) => n,
                Width::Content => self.columns(directive),
            })
            .fold(0usize, usize::saturating_add);

        let flex = match format.flex_index() {
            Some(_) => target_width.saturating_sub(taken),
            None => 0,
        };
        Measure { taken, flex }
    }
}

fn write_text(out: &mut LineBuffer, text: &str, width: usize) -> bool {
    let mut written = 0;
    for ch in text.chars().take(width) {
        if !out.push(ch) {
            return false;
        }
        written += 1;
    }
    out.push_repeat(' ', width - written)
}

fn write_bar(out: &mut LineBuffer, fill: char, percentage: f32, width: usize) -> bool {
    let filled = filled_columns(width, percentage);
    out.push_repeat(fill, filled) && out.push_repeat(' ', width - filled)
}
