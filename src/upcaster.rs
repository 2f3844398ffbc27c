//! Upcaster dispatch engine.
//!
//! Transforms event payloads recorded under an old schema version into the
//! current one during replay, keyed by the old type's discriminator suffix.
//! Pages whose event doesn't match any registered transform, or that carry
//! no event at all, pass through unchanged — sequence and timestamp are
//! never touched.

use prost_types::Any;

use crate::config::RuntimeConfig;
use crate::proto::EventPage;
use crate::registry::SuffixTable;

pub type UpcastHandler = Box<dyn Fn(&Any) -> Any + Send + Sync>;

pub struct UpcasterRouter {
    name: String,
    domain: String,
    handlers: SuffixTable<UpcastHandler>,
    config: RuntimeConfig,
}

impl UpcasterRouter {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            handlers: SuffixTable::new("upcaster".to_string()),
            config: RuntimeConfig::default(),
        }
    }

    /// Override the runtime config governing this router's diagnostic
    /// logging (unmatched dispatch).
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a transform from the old type (matched by `from_suffix`) to
    /// its current replacement.
    pub fn upcasts<F>(mut self, from_suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Any) -> Any + Send + Sync + 'static,
    {
        self.handlers
            .insert(from_suffix, Box::new(handler))
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn from_types(&self) -> Vec<String> {
        self.handlers.suffixes()
    }

    /// Topology-discovery metadata for this upcaster.
    pub fn descriptor(&self) -> crate::proto::ComponentDescriptor {
        crate::proto::ComponentDescriptor {
            name: self.name.clone(),
            component_type: crate::proto::ComponentType::ComponentUpcaster as i32,
            inputs: Some(crate::proto::DomainInputs {
                entries: vec![crate::proto::DomainInput {
                    domain: self.domain.clone(),
                    types: self.from_types(),
                }],
            }),
            output_types: vec![],
        }
    }

    fn upcast_one(&self, event_any: &Any) -> Any {
        match self.handlers.find(&event_any.type_url) {
            Some(handler) => handler(event_any),
            None => {
                if self.config.log_unmatched_dispatch {
                    tracing::debug!(name = %self.name, type_url = %event_any.type_url, "no transform registered for event type, passing through");
                }
                event_any.clone()
            }
        }
    }

    /// Transform every page's event in place, preserving sequence,
    /// `created_at` and ordering.
    pub fn upcast(&self, events: Vec<EventPage>) -> Vec<EventPage> {
        tracing::trace!(name = %self.name, count = events.len(), "upcaster dispatch entered");
        let upcast: Vec<EventPage> = events
            .into_iter()
            .map(|page| match &page.event {
                Some(event_any) => EventPage {
                    event: Some(self.upcast_one(event_any)),
                    ..page
                },
                None => page,
            })
            .collect();
        tracing::trace!(name = %self.name, "upcaster dispatch exited");
        upcast
    }
}
