use indexmap::IndexMap;

/// Kinds of events a [`crate::ProgressRenderer`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    LaneStarted,
    LaneFinished,
    Finished,
}

/// A lifecycle event, fired on the render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The lane was started and has been picked up by a frame.
    LaneStarted { lane: usize },
    /// The lane's final line has been drawn.
    LaneFinished { lane: usize },
    /// The renderer went inactive: every lane is done, or it was aborted.
    Finished,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::LaneStarted { .. } => EventKind::LaneStarted,
            Event::LaneFinished { .. } => EventKind::LaneFinished,
            Event::Finished => EventKind::Finished,
        }
    }

    /// The lane the event is about, if any.
    pub fn lane(&self) -> Option<usize> {
        match self {
            Event::LaneStarted { lane } | Event::LaneFinished { lane } => Some(*lane),
            Event::Finished => None,
        }
    }
}

/// Callback registered with [`crate::ProgressRenderer::subscribe`].
pub type Subscriber = Box<dyn FnMut(&Event) + Send>;

/// Callbacks grouped by event kind, run in registration order.
pub(crate) struct Subscribers {
    lanes: usize,
    by_kind: IndexMap<EventKind, Vec<Subscriber>>,
}

impl std::fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (kind, subscribers) in &self.by_kind {
            map.entry(kind, &subscribers.len());
        }
        map.finish()
    }
}

impl Subscribers {
    pub(crate) fn new(lanes: usize) -> Self {
        Self {
            lanes,
            by_kind: IndexMap::new(),
        }
    }

    pub(crate) fn subscribe(&mut self, kind: EventKind, subscriber: Subscriber) {
        self.by_kind.entry(kind).or_default().push(subscriber);
    }

    /// Runs every subscriber for the event's kind. Events naming a lane the
    /// renderer does not have are dropped.
    pub(crate) fn emit(&mut self, event: Event) {
        if event.lane().is_some_and(|lane| lane >= self.lanes) {
            return;
        }
        if let Some(subscribers) = self.by_kind.get_mut(&event.kind()) {
            for subscriber in subscribers {
                subscriber(&event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Subscriber) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = log.clone();
            move |name: &'static str| -> Subscriber {
                let log = log.clone();
                Box::new(move |event: &Event| {
                    log.lock().unwrap().push(format!("{name}:{:?}", event.lane()));
                })
            }
        };
        (log, make)
    }

    #[test]
    fn runs_subscribers_in_registration_order() {
        let (log, make) = recorder();
        let mut subscribers = Subscribers::new(2);
        subscribers.subscribe(EventKind::LaneFinished, make("a"));
        subscribers.subscribe(EventKind::LaneFinished, make("b"));
        subscribers.subscribe(EventKind::Finished, make("done"));

        subscribers.emit(Event::LaneFinished { lane: 1 });
        subscribers.emit(Event::Finished);

        assert_eq!(*log.lock().unwrap(), ["a:Some(1)", "b:Some(1)", "done:None"]);
    }

    #[test]
    fn only_matching_kind_is_notified() {
        let (log, make) = recorder();
        let mut subscribers = Subscribers::new(1);
        subscribers.subscribe(EventKind::LaneStarted, make("start"));

        subscribers.emit(Event::LaneFinished { lane: 0 });
        subscribers.emit(Event::Finished);
        assert!(log.lock().unwrap().is_empty());

        subscribers.emit(Event::LaneStarted { lane: 0 });
        assert_eq!(*log.lock().unwrap(), ["start:Some(0)"]);
    }

    #[test]
    fn drops_events_for_unknown_lanes() {
        let (log, make) = recorder();
        let mut subscribers = Subscribers::new(2);
        subscribers.subscribe(EventKind::LaneStarted, make("start"));
        subscribers.subscribe(EventKind::Finished, make("done"));

        subscribers.emit(Event::LaneStarted { lane: 2 });
        assert!(log.lock().unwrap().is_empty());

        // lane-less events always pass
        subscribers.emit(Event::Finished);
        assert_eq!(*log.lock().unwrap(), ["done:None"]);
    }
}
