//! Fluent state reconstruction shared by aggregate and process-manager
//! engines.
//!
//! Register appliers once at construction; every `with_event_book` call
//! creates fresh state and folds every page's event into it in order.
//! Events whose type URL matches no registered suffix are ignored — this
//! is a forward-compatibility guarantee, not best-effort: a component must
//! be able to add new event types without breaking older readers that
//! haven't learned to apply them yet.

use prost_types::Any;

use crate::proto::{EventBook, EventPage};

pub type EventApplier<S> = Box<dyn Fn(&mut S, &[u8]) + Send + Sync>;
pub type StateFactory<S> = Box<dyn Fn() -> S + Send + Sync>;

pub struct StateRouter<S: Default> {
    handlers: Vec<(String, EventApplier<S>)>,
    factory: Option<StateFactory<S>>,
}

impl<S: Default + 'static> Default for StateRouter<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Default + 'static> StateRouter<S> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            factory: None,
        }
    }

    /// Use a custom constructor instead of `S::default()` for fresh state
    /// (e.g. state that needs non-empty collections pre-populated).
    pub fn with_factory(factory: fn() -> S) -> Self {
        Self {
            handlers: Vec::new(),
            factory: Some(Box::new(factory)),
        }
    }

    fn create_state(&self) -> S {
        match &self.factory {
            Some(factory) => factory(),
            None => S::default(),
        }
    }

    /// Register an applier for events whose type URL ends with `suffix`.
    /// The event is auto-decoded to `E` before `handler` runs.
    pub fn on<E>(mut self, suffix: impl Into<String>, handler: fn(&mut S, E)) -> Self
    where
        E: prost::Message + Default + 'static,
    {
        let suffix = suffix.into();
        let boxed: EventApplier<S> = Box::new(move |state, bytes| {
            if let Ok(event) = E::decode(bytes) {
                handler(state, event);
            }
        });
        self.handlers.push((suffix, boxed));
        self
    }

    pub fn with_events(&self, pages: &[EventPage]) -> S {
        let mut state = self.create_state();
        for page in pages {
            if let Some(event) = &page.event {
                self.apply_single(&mut state, event);
            }
        }
        state
    }

    pub fn with_event_book(&self, event_book: &EventBook) -> S {
        self.with_events(&event_book.pages)
    }

    pub fn apply_single(&self, state: &mut S, event_any: &Any) {
        let type_url = &event_any.type_url;
        for (suffix, handler) in &self.handlers {
            if type_url.ends_with(suffix.as_str()) {
                handler(state, &event_any.value);
                return;
            }
        }
        // Unknown event type: silently ignored, per forward-compatibility contract.
    }
}
