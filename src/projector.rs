//! Projector dispatch engine.
//!
//! A projector turns an event history into read-model projections. Unlike
//! the other engines, more than one registered handler can match a single
//! event (e.g. a "table summary" projector and a "table history" projector
//! both react to `HandStarted`): `handle` folds the whole event book and
//! returns the last non-empty projection produced, matching the documented
//! contract precisely; `handle_all` returns every non-empty projection, for
//! callers that want the full set instead of a single result.

use prost_types::Any;

use crate::config::RuntimeConfig;
use crate::proto::{EventBook, Projection};
use crate::registry::SuffixTable;

pub type ProjectionHandler = Box<dyn Fn(&Any) -> Option<Any> + Send + Sync>;

pub struct ProjectorRouter {
    name: String,
    domains: Vec<String>,
    handlers: SuffixTable<ProjectionHandler>,
    config: RuntimeConfig,
}

impl ProjectorRouter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domains: Vec::new(),
            handlers: SuffixTable::new("projector".to_string()),
            config: RuntimeConfig::default(),
        }
    }

    /// Override the runtime config governing this router's diagnostic
    /// logging (unmatched dispatch).
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn subscribes(mut self, domain: impl Into<String>) -> Self {
        self.domains.push(domain.into());
        self
    }

    pub fn on<F>(mut self, suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Any) -> Option<Any> + Send + Sync + 'static,
    {
        self.handlers
            .insert(suffix, Box::new(handler))
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn event_types(&self) -> Vec<String> {
        self.handlers.suffixes()
    }

    /// Topology-discovery metadata for this projector.
    pub fn descriptor(&self) -> crate::proto::ComponentDescriptor {
        crate::proto::ComponentDescriptor {
            name: self.name.clone(),
            component_type: crate::proto::ComponentType::ComponentProjector as i32,
            inputs: Some(crate::proto::DomainInputs {
                // `subscribes` doesn't partition event types per domain, so
                // every subscribed domain is paired with the full handled
                // event-type list.
                entries: self
                    .domains
                    .iter()
                    .map(|domain| crate::proto::DomainInput {
                        domain: domain.clone(),
                        types: self.event_types(),
                    })
                    .collect(),
            }),
            output_types: vec![],
        }
    }

    /// The last non-empty projection produced while folding `event_book`,
    /// or `None` if nothing projected.
    pub fn handle(&self, event_book: &EventBook) -> Option<Projection> {
        self.handle_all(event_book).into_iter().last()
    }

    /// Every non-empty projection produced while folding `event_book`, in
    /// event order.
    pub fn handle_all(&self, event_book: &EventBook) -> Vec<Projection> {
        tracing::trace!(name = %self.name, "projector dispatch entered");
        let projections: Vec<Projection> = event_book
            .pages
            .iter()
            .filter_map(|page| {
                let event_any = page.event.as_ref()?;
                let sequence = match page.sequence {
                    Some(crate::proto::event_page::Sequence::Num(n)) => n,
                    _ => 0,
                };
                let payload = self.project_one(event_any)?;
                Some(Projection {
                    cover: event_book.cover.clone(),
                    projector: self.name.clone(),
                    sequence,
                    projection: Some(payload),
                })
            })
            .collect();
        tracing::trace!(name = %self.name, count = projections.len(), "projector dispatch exited");
        projections
    }

    fn project_one(&self, event_any: &Any) -> Option<Any> {
        let handler = self.handlers.find(&event_any.type_url);
        if handler.is_none() && self.config.log_unmatched_dispatch {
            tracing::debug!(name = %self.name, type_url = %event_any.type_url, "no handler registered for event type, ignoring");
        }
        handler.and_then(|h| h(event_any))
    }
}
