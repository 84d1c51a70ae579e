//! Template compiler.
//!
//! A template is literal text with `$`-directives mixed in:
//!
//! ```text
//! $[<width> | =]<kind>[<fill>]
//! ```
//!
//! | kind | shows                 | width                                  |
//! |------|-----------------------|----------------------------------------|
//! | `t`  | lane title            | fixed, flex, or measured from the text |
//! | `p`  | percentage (`31.00`)  | fixed, flex, or measured from the text |
//! | `b`  | bar, filled with the  | fixed or flex, never measured          |
//! |      | next character        |                                        |
//!
//! A `=` in place of the width marks the one flex field of the template: it
//! takes whatever columns the other fields leave over. `$$` writes a single
//! `$`. Everything else is copied through as literal text.
//!
//! ```rust
//! use lanebar::{DirectiveKind, Format, Width};
//!
//! let format = Format::compile("$=t [$40b#] $p%").unwrap();
//! assert_eq!(format.directives().len(), 6);
//! assert_eq!(format.directives()[0].width(), Width::Flex);
//! assert_eq!(format.directives()[2].kind(), DirectiveKind::Bar { fill: '#' });
//! ```

use std::fmt;
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

/// Upper bound on directives in one template, literal runs included.
pub const MAX_DIRECTIVES: usize = 15;

/// How many columns a directive occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Width {
    /// Measured from the text the directive displays.
    Content,
    /// Exactly this many columns; longer text is cut, shorter text padded.
    Fixed(usize),
    /// Whatever is left of the line after every other directive is sized.
    Flex,
}

impl Width {
    pub fn is_flex(&self) -> bool {
        matches!(self, Width::Flex)
    }

    pub fn fixed(&self) -> Option<usize> {
        match self {
            Width::Fixed(n) => Some(*n),
            _ => None,
        }
    }
}

/// A run of literal text stored in the [`Format`]'s arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextSpan {
    offset: usize,
    len: usize,
    columns: usize,
}

impl TextSpan {
    /// Byte offset into the arena.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Display width, one column per `char`.
    pub fn columns(&self) -> usize {
        self.columns
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Literal(TextSpan),
    Title,
    Bar { fill: char },
    Percentage,
}

/// One compiled unit of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Directive {
    kind: DirectiveKind,
    width: Width,
}

impl Directive {
    pub fn kind(&self) -> DirectiveKind {
        self.kind
    }

    pub fn width(&self) -> Width {
        self.width
    }
}

/// A compiled template.
///
/// Immutable once built, so a single `Format` can be read from any number of
/// threads without synchronisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Format {
    directives: Vec<Directive>,
    arena: String,
    flex: Option<usize>,
}

impl Format {
    /// Compiles `template`. Either every directive is valid and the whole
    /// format is returned, or nothing is.
    ///
    /// # Errors
    ///
    /// See [`CompileError`] for the ways a template can be rejected.
    pub fn compile(template: &str) -> Result<Self, CompileError> {
        Compiler::new(template).run()
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Text of a literal directive.
    ///
    /// # Panics
    ///
    /// If `span` was not taken from this format's directives and falls
    /// outside its arena or off a `char` boundary.
    pub fn literal(&self, span: TextSpan) -> &str {
        &self.arena[span.offset..span.offset + span.len]
    }

    /// Position of the flex directive, if the template has one.
    pub fn flex_index(&self) -> Option<usize> {
        self.flex
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

impl FromStr for Format {
    type Err = CompileError;

    fn from_str(template: &str) -> Result<Self, Self::Err> {
        Self::compile(template)
    }
}

/// Writes the format back out as a template that compiles to the same
/// directives.
impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for directive in &self.directives {
            let letter = match directive.kind {
                DirectiveKind::Literal(span) => {
                    f.write_str(&self.literal(span).replace('$', "$$"))?;
                    continue;
                }
                DirectiveKind::Title => 't',
                DirectiveKind::Percentage => 'p',
                DirectiveKind::Bar { .. } => 'b',
            };
            f.write_str("$")?;
            match directive.width {
                Width::Content => {}
                Width::Fixed(n) => write!(f, "{n}")?,
                Width::Flex => f.write_str("=")?,
            }
            write!(f, "{letter}")?;
            if let DirectiveKind::Bar { fill } = directive.kind {
                write!(f, "{fill}")?;
            }
        }
        Ok(())
    }
}

/// Why a template failed to compile. Positions are byte offsets of the `$`
/// that opened the offending directive.
///
/// Every `$` opens a directive, with one exception: `$$` is not an error but
/// compiles to a literal `$`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("invalid directive at byte {position}: {reason}")]
    InvalidDirective {
        position: usize,
        reason: InvalidReason,
    },
    #[error("template has more than {max} directives")]
    TooManyDirectives { max: usize },
    #[error("second flex field at byte {position}, only one `$=` directive is allowed")]
    MultipleFlexFields { position: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidReason {
    #[error("unknown directive kind `{0}`")]
    UnknownKind(char),
    #[error("expected a directive kind letter")]
    MissingKind,
    #[error("a directive cannot have both a width and the flex marker")]
    WidthWithFlex,
    #[error("bar directive is missing its fill character")]
    MissingFill,
    #[error("bar directive needs a fixed width or the flex marker")]
    BarWithoutWidth,
    #[error("width does not fit in a usize")]
    WidthOverflow,
}

struct Compiler<'a> {
    chars: Peekable<CharIndices<'a>>,
    format: Format,
    // Arena offset where the pending literal run started.
    literal_start: usize,
    literal_columns: usize,
}

impl<'a> Compiler<'a> {
    fn new(template: &'a str) -> Self {
        Self {
            chars: template.char_indices().peekable(),
            format: Format {
                directives: Vec::new(),
                arena: String::with_capacity(template.len()),
                flex: None,
            },
            literal_start: 0,
            literal_columns: 0,
        }
    }

    fn run(mut self) -> Result<Format, CompileError> {
        while let Some((position, ch)) = self.chars.next() {
            if ch != '$' {
                self.push_literal(ch);
                continue;
            }
            if self.chars.next_if(|&(_, next)| next == '$').is_some() {
                self.push_literal('$');
                continue;
            }
            self.flush_literal()?;
            let directive = self.directive(position)?;
            self.push(directive)?;
        }
        self.flush_literal()?;
        Ok(self.format)
    }

    /// Parses the body of a directive; the opening `$` is already consumed.
    fn directive(&mut self, position: usize) -> Result<Directive, CompileError> {
        let invalid = |reason| CompileError::InvalidDirective { position, reason };

        let mut fixed = None;
        let mut flex = false;
        let letter = loop {
            match self.chars.next() {
                Some((_, '=')) => {
                    if flex || self.format.flex.is_some() {
                        return Err(CompileError::MultipleFlexFields { position });
                    }
                    if fixed.is_some() {
                        return Err(invalid(InvalidReason::WidthWithFlex));
                    }
                    flex = true;
                }
                Some((_, digit)) if digit.is_ascii_digit() => {
                    if flex {
                        return Err(invalid(InvalidReason::WidthWithFlex));
                    }
                    let n = self
                        .number(digit)
                        .ok_or(invalid(InvalidReason::WidthOverflow))?;
                    fixed = Some(n);
                }
                Some((_, letter)) if letter.is_ascii_alphabetic() => break letter,
                _ => return Err(invalid(InvalidReason::MissingKind)),
            }
        };

        let width = match (fixed, flex) {
            (Some(n), _) => Width::Fixed(n),
            (None, true) => Width::Flex,
            (None, false) => Width::Content,
        };

        let kind = match letter {
            't' => DirectiveKind::Title,
            'p' => DirectiveKind::Percentage,
            'b' => {
                let Some((_, fill)) = self.chars.next() else {
                    return Err(invalid(InvalidReason::MissingFill));
                };
                if width == Width::Content {
                    return Err(invalid(InvalidReason::BarWithoutWidth));
                }
                DirectiveKind::Bar { fill }
            }
            other => return Err(invalid(InvalidReason::UnknownKind(other))),
        };

        Ok(Directive { kind, width })
    }

    /// Reads the rest of a digit run starting with `first`. `None` on overflow.
    fn number(&mut self, first: char) -> Option<usize> {
        let mut value = first.to_digit(10)? as usize;
        while let Some((_, ch)) = self.chars.next_if(|(_, ch)| ch.is_ascii_digit()) {
            value = value.checked_mul(10)?.checked_add(ch.to_digit(10)? as usize)?;
        }
        Some(value)
    }

    fn push_literal(&mut self, ch: char) {
        self.format.arena.push(ch);
        self.literal_columns += 1;
    }

    fn flush_literal(&mut self) -> Result<(), CompileError> {
        let end = self.format.arena.len();
        if end > self.literal_start {
            let span = TextSpan {
                offset: self.literal_start,
                len: end - self.literal_start,
                columns: self.literal_columns,
            };
            self.push(Directive {
                kind: DirectiveKind::Literal(span),
                width: Width::Content,
            })?;
        }
        self.literal_start = end;
        self.literal_columns = 0;
        Ok(())
    }

    fn push(&mut self, directive: Directive) -> Result<(), CompileError> {
        if self.format.directives.len() >= MAX_DIRECTIVES {
            return Err(CompileError::TooManyDirectives {
                max: MAX_DIRECTIVES,
            });
        }
        if directive.width.is_flex() {
            self.format.flex = Some(self.format.directives.len());
        }
        self.format.directives.push(directive);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(format: &Format, index: usize) -> &str {
        match format.directives()[index].kind() {
            DirectiveKind::Literal(span) => format.literal(span),
            other => panic!("directive {index} is {other:?}, not a literal"),
        }
    }

    #[test]
    fn compiles_the_readme_template() {
        let format = Format::compile("$=t [$40b#] $p%").unwrap();
        let d = format.directives();
        assert_eq!(d.len(), 6);

        assert_eq!(d[0].kind(), DirectiveKind::Title);
        assert_eq!(d[0].width(), Width::Flex);
        assert_eq!(literal(&format, 1), " [");
        assert_eq!(d[2].kind(), DirectiveKind::Bar { fill: '#' });
        assert_eq!(d[2].width(), Width::Fixed(40));
        assert_eq!(literal(&format, 3), "] ");
        assert_eq!(d[4].kind(), DirectiveKind::Percentage);
        assert_eq!(d[4].width(), Width::Content);
        assert_eq!(literal(&format, 5), "%");

        assert_eq!(format.flex_index(), Some(0));
    }

    #[test]
    fn literals_share_one_arena() {
        let format = Format::compile("a$tbc$pdef").unwrap();
        let spans: Vec<_> = format
            .directives()
            .iter()
            .filter_map(|d| match d.kind() {
                DirectiveKind::Literal(span) => Some(span),
                _ => None,
            })
            .collect();
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].offset(), 0);
        assert_eq!(spans[1].offset(), 1);
        assert_eq!(spans[2].offset(), 3);
        assert_eq!(format.literal(spans[2]), "def");
    }

    #[test]
    fn literal_columns_count_chars_not_bytes() {
        let format = Format::compile("→ $t").unwrap();
        let DirectiveKind::Literal(span) = format.directives()[0].kind() else {
            panic!("expected literal");
        };
        assert_eq!(span.len(), "→ ".len());
        assert_eq!(span.columns(), 2);
    }

    #[test]
    fn bar_requires_width_or_flex() {
        assert_eq!(
            Format::compile("$bX"),
            Err(CompileError::InvalidDirective {
                position: 0,
                reason: InvalidReason::BarWithoutWidth,
            })
        );
        assert!(Format::compile("$5bX").is_ok());
        assert!(Format::compile("$=bX").is_ok());
    }

    #[test]
    fn bar_fill_is_the_next_char_verbatim() {
        let format = Format::compile("$3b $4b█").unwrap();
        assert_eq!(format.directives()[0].kind(), DirectiveKind::Bar { fill: ' ' });
        assert_eq!(format.directives()[1].kind(), DirectiveKind::Bar { fill: '█' });
    }

    #[test]
    fn bar_without_fill_at_end_of_template() {
        assert_eq!(
            Format::compile("ab $10b"),
            Err(CompileError::InvalidDirective {
                position: 3,
                reason: InvalidReason::MissingFill,
            })
        );
    }

    #[test]
    fn rejects_a_second_flex_field() {
        let err = Format::compile("$=t $=p").unwrap_err();
        assert_eq!(err, CompileError::MultipleFlexFields { position: 4 });

        let err = Format::compile("$==t").unwrap_err();
        assert_eq!(err, CompileError::MultipleFlexFields { position: 0 });
    }

    #[test]
    fn rejects_width_combined_with_flex() {
        for template in ["$5=t", "$=5t"] {
            assert_eq!(
                Format::compile(template),
                Err(CompileError::InvalidDirective {
                    position: 0,
                    reason: InvalidReason::WidthWithFlex,
                }),
                "{template}"
            );
        }
    }

    #[test]
    fn rejects_unknown_and_missing_kinds() {
        assert_eq!(
            Format::compile("x $q"),
            Err(CompileError::InvalidDirective {
                position: 2,
                reason: InvalidReason::UnknownKind('q'),
            })
        );
        for template in ["$", "$12", "$ t", "$%"] {
            assert!(
                matches!(
                    Format::compile(template),
                    Err(CompileError::InvalidDirective {
                        reason: InvalidReason::MissingKind,
                        ..
                    })
                ),
                "{template}"
            );
        }
    }

    #[test]
    fn rejects_width_overflow() {
        let template = format!("${}t", "9".repeat(40));
        assert_eq!(
            Format::compile(&template),
            Err(CompileError::InvalidDirective {
                position: 0,
                reason: InvalidReason::WidthOverflow,
            })
        );
    }

    #[test]
    fn caps_directive_count() {
        let at_cap = "$t".repeat(MAX_DIRECTIVES);
        assert_eq!(Format::compile(&at_cap).unwrap().len(), MAX_DIRECTIVES);

        let over = format!("{at_cap}!");
        assert_eq!(
            Format::compile(&over),
            Err(CompileError::TooManyDirectives {
                max: MAX_DIRECTIVES
            })
        );
    }

    #[test]
    fn literal_only_and_empty_templates_are_valid() {
        let format = Format::compile("  static  text ").unwrap();
        assert_eq!(format.len(), 1);
        assert_eq!(literal(&format, 0), "  static  text ");
        assert_eq!(format.flex_index(), None);

        assert!(Format::compile("").unwrap().is_empty());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn literal_rejects_a_foreign_span() {
        let long = Format::compile("a fairly long literal $t").unwrap();
        let short = Format::compile("x$t").unwrap();
        let DirectiveKind::Literal(span) = long.directives()[0].kind() else {
            panic!("expected a literal");
        };
        let _ = short.literal(span);
    }

    #[test]
    fn double_dollar_is_a_literal_dollar() {
        let format = Format::compile("cost $$ $p").unwrap();
        assert_eq!(format.len(), 2);
        assert_eq!(literal(&format, 0), "cost $ ");
    }

    #[test]
    fn display_round_trips() {
        for template in ["$=t [$40b#] $p%", "$10t[$20b#]$p%", "$$ $5p $=b-", "plain"] {
            let format = Format::compile(template).unwrap();
            let again = Format::compile(&format.to_string()).unwrap();
            assert_eq!(format, again, "{template}");
        }
    }

    #[test]
    fn errors_render_readably() {
        let err = Format::compile("$7=t").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid directive at byte 0: a directive cannot have both a width and the flex marker"
        );
    }
}
