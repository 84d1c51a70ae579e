#![doc = include_str!("../README.md")]

pub mod event;
pub mod format;
pub(crate) mod lane;
#[cfg(feature = "tracing")]
pub mod layer;
pub mod layout;
pub(crate) mod runner;
pub mod terminal;
pub(crate) mod writer;


/// Re-exports of the types needed to drive a renderer.
pub mod prelude {
    pub use crate::event::{Event, EventKind};
    pub use crate::format::{CompileError, Format};
    pub use crate::lane::{LaneRegistry, LaneState};
    #[cfg(feature = "tracing")]
    pub use crate::layer::LaneLayer;
    pub use crate::runner::RenderLoop;
    pub use crate::terminal::{FixedWidth, TerminalWidth};
    pub use crate::writer::{FrameLine, FrameWriter, ProgressRenderer};
}

pub use crate::prelude::*;

pub use crate::event::Subscriber;
pub use crate::format::{Directive, DirectiveKind, InvalidReason, MAX_DIRECTIVES, TextSpan, Width};
pub use crate::layout::{LineBuffer, Measure, measure, render_line};
pub use crate::runner::DEFAULT_INTERVAL;
#[cfg(feature = "crossterm")]
pub use crate::terminal::TerminalColumns;
