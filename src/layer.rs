//! Reporting lane progress through `tracing`.
//!
//! [`LaneLayer`] watches for spans and events carrying a `lane` field and
//! applies them to a [`LaneRegistry`]:
//!
//! ```rust,ignore
//! let renderer = ProgressRenderer::new("$=t [$30b#] $p%", 2)?;
//! tracing_subscriber::registry()
//!     .with(LaneLayer::new(renderer.lanes()))
//!     .init();
//!
//! // on a worker thread
//! let span = tracing::info_span!("download", lane = 0, title = "fetching index");
//! let _guard = span.enter();
//! for chunk in 1..=10 {
//!     tracing::info!(progress = chunk as f64 * 10.0);
//! }
//! ```
//!
//! A new span with a `lane` field starts that lane, titled by its `title`
//! field or else the span name. Events with `progress` or `title` update the
//! lane named by their own `lane` field, or else the nearest enclosing lane
//! span. Closing a lane span aborts the lane if it has not reached 100%.

use std::fmt;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::{LookupSpan, SpanRef};

use crate::LaneRegistry;

pub const LANE_FIELD: &str = "lane";
pub const PROGRESS_FIELD: &str = "progress";
pub const TITLE_FIELD: &str = "title";

/// A `tracing` [`Layer`] that feeds spans and events into a [`LaneRegistry`].
#[derive(Debug, Clone)]
pub struct LaneLayer {
    lanes: Arc<LaneRegistry>,
}

impl LaneLayer {
    pub fn new(lanes: Arc<LaneRegistry>) -> Self {
        Self { lanes }
    }

    fn apply(&self, lane: usize, fields: &LaneFields) {
        if let Some(title) = &fields.title {
            self.lanes.set_title(lane, title);
        }
        if let Some(progress) = fields.progress {
            self.lanes.set_percentage(lane, progress);
        }
    }
}

impl<S> Layer<S> for LaneLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut fields = LaneFields::default();
        attrs.record(&mut fields);
        let Some(lane) = fields.lane else {
            return;
        };
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(LaneExt(lane));
        }

        self.lanes.start(lane);
        if fields.title.is_none() {
            self.lanes.set_title(lane, attrs.metadata().name());
        }
        self.apply(lane, &fields);
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(lane) = ctx.span(id).and_then(|span| lane_of(&span)) else {
            return;
        };
        let mut fields = LaneFields::default();
        values.record(&mut fields);
        self.apply(lane, &fields);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = LaneFields::default();
        event.record(&mut fields);
        if fields.title.is_none() && fields.progress.is_none() {
            return;
        }
        let lane = fields.lane.or_else(|| {
            ctx.event_scope(event)
                .and_then(|mut scope| scope.find_map(|span| lane_of(&span)))
        });
        if let Some(lane) = lane {
            self.apply(lane, &fields);
        }
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        if let Some(lane) = ctx.span(&id).and_then(|span| lane_of(&span)) {
            self.lanes.abort_running(lane);
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct LaneExt(usize);

fn lane_of<S>(span: &SpanRef<'_, S>) -> Option<usize>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    span.extensions().get::<LaneExt>().map(|ext| ext.0)
}

#[derive(Debug, Default)]
struct LaneFields {
    lane: Option<usize>,
    progress: Option<f32>,
    title: Option<String>,
}

impl Visit for LaneFields {
    fn record_f64(&mut self, field: &Field, value: f64) {
        if field.name() == PROGRESS_FIELD {
            self.progress = Some(value as f32);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        match field.name() {
            LANE_FIELD => self.lane = usize::try_from(value).ok(),
            PROGRESS_FIELD => self.progress = Some(value as f32),
            _ => {}
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        match field.name() {
            LANE_FIELD => self.lane = usize::try_from(value).ok(),
            PROGRESS_FIELD => self.progress = Some(value as f32),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == TITLE_FIELD {
            self.title = Some(value.to_owned());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == TITLE_FIELD {
            self.title = Some(format!("{value:?}"));
        }
    }
}
