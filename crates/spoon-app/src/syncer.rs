//! Handler registry driven by the sync feed.

use std::{collections::HashMap, fmt};

use crate::{Event, EventSource, EventType};

type EventHandler = Box<dyn Fn(EventSource, &Event) + Send + Sync>;
type BatchHandler = Box<dyn Fn(&str) + Send + Sync>;

/// Event handlers keyed by event type, plus batch-completion hooks.
///
/// Built once before the feed starts, then shared immutably with the
/// transport, which calls [`Syncer::dispatch`] for every event in delivery
/// order and [`Syncer::complete_batch`] once per applied batch.
#[derive(Default)]
pub struct Syncer {
    handlers: HashMap<EventType, Vec<EventHandler>>,
    batch_handlers: Vec<BatchHandler>,
}

impl Syncer {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event type. Handlers for the same type run
    /// in registration order.
    pub fn on_event_type<F>(&mut self, event_type: EventType, handler: F)
    where
        F: Fn(EventSource, &Event) + Send + Sync + 'static,
    {
        self.handlers.entry(event_type).or_default().push(Box::new(handler));
    }

    /// Register a hook that receives the `next_batch` token after every event
    /// of a batch has been dispatched.
    pub fn on_batch_complete<F>(&mut self, handler: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.batch_handlers.push(Box::new(handler));
    }

    /// True if at least one handler is registered for `event_type`.
    pub fn handles(&self, event_type: &EventType) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Invoke every handler registered for the event's type.
    ///
    /// Returns the number of handlers invoked. Events without a handler are
    /// skipped.
    pub fn dispatch(&self, source: EventSource, event: &Event) -> usize {
        let Some(handlers) = self.handlers.get(&event.event_type) else {
            tracing::trace!(event_type = %event.event_type, room_id = %event.room_id, "no handler");
            return 0;
        };

        for handler in handlers {
            handler(source, event);
        }
        handlers.len()
    }

    /// Signal that a batch has been fully dispatched.
    pub fn complete_batch(&self, next_batch: &str) {
        for handler in &self.batch_handlers {
            handler(next_batch);
        }
    }
}

impl fmt::Debug for Syncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.handlers.keys().map(EventType::as_str).collect();
        types.sort_unstable();
        f.debug_struct("Syncer")
            .field("event_types", &types)
            .field("batch_handlers", &self.batch_handlers.len())
            .finish()
    }
}
