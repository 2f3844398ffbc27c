//! Saga dispatch engine.
//!
//! Sagas are stateless: a `prepare` step declares which other aggregates'
//! event histories the coordinator must fetch before `dispatch` can react
//! to the triggering event, and `dispatch` turns that event (plus the
//! fetched destinations) into zero or more outgoing commands.

use prost_types::Any;
use tonic::Status;

use crate::config::RuntimeConfig;
use crate::error::CommandResult;
use crate::proto::{CommandBook, Cover, EventBook};
use crate::registry::SuffixTable;

pub type EventHandler = Box<dyn Fn(&EventBook, &Any, &[EventBook]) -> CommandResult<Option<CommandBook>> + Send + Sync>;
pub type MultiEventHandler = Box<dyn Fn(&EventBook, &Any, &[EventBook]) -> CommandResult<Vec<CommandBook>> + Send + Sync>;
pub type PrepareHandler = Box<dyn Fn(&EventBook, &Any) -> Vec<Cover> + Send + Sync>;

enum HandlerType {
    Single(EventHandler),
    Multi(MultiEventHandler),
}

pub struct EventRouter {
    name: String,
    input_domain: String,
    output_domain: String,
    output_types: Vec<String>,
    handlers: SuffixTable<HandlerType>,
    prepare_handlers: SuffixTable<PrepareHandler>,
    config: RuntimeConfig,
}

impl EventRouter {
    pub fn new(name: impl Into<String>, input_domain: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            handlers: SuffixTable::new(format!("saga:{name}")),
            prepare_handlers: SuffixTable::new(format!("saga:{name}:prepare")),
            name,
            input_domain: input_domain.into(),
            output_domain: String::new(),
            output_types: Vec::new(),
            config: RuntimeConfig::default(),
        }
    }

    /// Override the runtime config governing this router's diagnostic
    /// logging (unmatched dispatch).
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sends(mut self, domain: impl Into<String>, command_type: impl Into<String>) -> Self {
        self.output_domain = domain.into();
        self.output_types.push(command_type.into());
        self
    }

    pub fn sends_domain(mut self, domain: impl Into<String>) -> Self {
        self.output_domain = domain.into();
        self
    }

    pub fn on<F>(mut self, suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&EventBook, &Any, &[EventBook]) -> CommandResult<Option<CommandBook>> + Send + Sync + 'static,
    {
        self.handlers
            .insert(suffix, HandlerType::Single(Box::new(handler)))
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    /// For reactions that may emit more than one command for a single
    /// event (e.g. fanning a pot payout out to every winner).
    pub fn on_many<F>(mut self, suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&EventBook, &Any, &[EventBook]) -> CommandResult<Vec<CommandBook>> + Send + Sync + 'static,
    {
        self.handlers
            .insert(suffix, HandlerType::Multi(Box::new(handler)))
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    pub fn prepare<F>(mut self, suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&EventBook, &Any) -> Vec<Cover> + Send + Sync + 'static,
    {
        self.prepare_handlers
            .insert(suffix, Box::new(handler))
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_domain(&self) -> &str {
        &self.input_domain
    }

    pub fn output_domain(&self) -> &str {
        &self.output_domain
    }

    pub fn event_types(&self) -> Vec<String> {
        self.handlers.suffixes()
    }

    pub fn output_types(&self) -> &[String] {
        &self.output_types
    }

    /// Topology-discovery metadata for this saga.
    pub fn descriptor(&self) -> crate::proto::ComponentDescriptor {
        crate::proto::ComponentDescriptor {
            name: self.name.clone(),
            component_type: crate::proto::ComponentType::ComponentSaga as i32,
            inputs: Some(crate::proto::DomainInputs {
                entries: vec![crate::proto::DomainInput {
                    domain: self.input_domain.clone(),
                    types: self.event_types(),
                }],
            }),
            output_types: self.output_types.clone(),
        }
    }

    /// Destinations the coordinator must fetch before `dispatch` can run,
    /// based on the triggering event (the last page of `source`).
    pub fn prepare_destinations(&self, source: &Option<EventBook>) -> Vec<Cover> {
        let Some(source) = source else { return vec![] };
        let Some(event_any) = source.pages.last().and_then(|p| p.event.as_ref()) else {
            return vec![];
        };
        match self.prepare_handlers.find(&event_any.type_url) {
            Some(handler) => handler(source, event_any),
            None => vec![],
        }
    }

    pub fn dispatch(
        &self,
        event_book: &EventBook,
        destinations: &[EventBook],
    ) -> Result<Vec<CommandBook>, Status> {
        tracing::trace!(name = %self.name, "saga dispatch entered");
        let result = self.dispatch_inner(event_book, destinations);
        tracing::trace!(name = %self.name, ok = result.is_ok(), "saga dispatch exited");
        result
    }

    fn dispatch_inner(
        &self,
        event_book: &EventBook,
        destinations: &[EventBook],
    ) -> Result<Vec<CommandBook>, Status> {
        let Some(event_any) = event_book.pages.last().and_then(|p| p.event.as_ref()) else {
            return Ok(vec![]);
        };

        let handler = match self.handlers.find(&event_any.type_url) {
            Some(h) => h,
            None => {
                if self.config.log_unmatched_dispatch {
                    tracing::debug!(name = %self.name, type_url = %event_any.type_url, "no handler registered for event type, ignoring");
                }
                return Ok(vec![]);
            }
        };

        match handler {
            HandlerType::Single(h) => {
                let result = h(event_book, event_any, destinations).map_err(Status::from)?;
                Ok(result.into_iter().collect())
            }
            HandlerType::Multi(h) => h(event_book, event_any, destinations).map_err(Status::from),
        }
    }
}
