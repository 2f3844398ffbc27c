//! Process-manager dispatch engine.
//!
//! A process manager is a saga with its own persisted state: it reacts to
//! events across one or more input domains and may emit both commands
//! (for other aggregates) and process events (to its own domain). Rejected
//! commands route through the same [`compensation`](crate::compensation)
//! machinery the aggregate engine uses.

use prost_types::Any;
use tonic::Status;

use crate::compensation;
use crate::config::RuntimeConfig;
use crate::error::CommandResult;
use crate::proto::{CommandBook, Cover, EventBook, Notification, RevocationResponse};
use crate::registry::SuffixTable;

pub type StateRebuilder<S> = fn(&EventBook) -> S;
pub type PrepareHandler<S> = Box<dyn Fn(&EventBook, &S, &Any) -> Vec<Cover> + Send + Sync>;
pub type EventHandler<S> = Box<dyn Fn(&EventBook, &S, &Any, &[EventBook]) -> CommandResult<ProcessManagerResponse> + Send + Sync>;
pub type RevocationHandler<S> = Box<dyn Fn(&Notification, &S) -> CommandResult<PmRejectionOutcome> + Send + Sync>;

#[derive(Default)]
pub struct ProcessManagerResponse {
    pub commands: Vec<CommandBook>,
    pub process_events: Option<EventBook>,
    /// Set instead of `commands`/`process_events` when a rejection came back
    /// for which this process manager has no registered compensation
    /// handler — the same framework fallback `CommandRouter` falls back to.
    pub revocation: Option<RevocationResponse>,
    /// Set when a rejection handler decided to forward the rejection
    /// onward rather than (or alongside) emitting its own process events.
    pub propagate: Option<Notification>,
}

/// What a process manager's rejection handler decided to do about a
/// command it sent that came back rejected.
///
/// Both fields empty is a valid, explicit answer: "acknowledge the
/// rejection, make no PM-state change, no further notification" — distinct
/// from "no handler was registered", which falls through to
/// [`compensation::default_delegation`].
#[derive(Default)]
pub struct PmRejectionOutcome {
    pub process_events: Option<EventBook>,
    pub propagate: Option<Notification>,
}

pub struct ProcessManagerRouter<S> {
    name: String,
    pm_domain: String,
    input_domains: Vec<String>,
    output_domains: Vec<(String, Vec<String>)>,
    rebuild: StateRebuilder<S>,
    handlers: SuffixTable<EventHandler<S>>,
    prepare_handlers: SuffixTable<PrepareHandler<S>>,
    rejection_handlers: std::collections::HashMap<String, RevocationHandler<S>>,
    config: RuntimeConfig,
}

impl<S> ProcessManagerRouter<S> {
    pub fn new(name: impl Into<String>, pm_domain: impl Into<String>, rebuild: StateRebuilder<S>) -> Self {
        let name = name.into();
        Self {
            handlers: SuffixTable::new(format!("process-manager:{name}")),
            prepare_handlers: SuffixTable::new(format!("process-manager:{name}:prepare")),
            name,
            pm_domain: pm_domain.into(),
            input_domains: Vec::new(),
            output_domains: Vec::new(),
            rebuild,
            rejection_handlers: std::collections::HashMap::new(),
            config: RuntimeConfig::default(),
        }
    }

    /// Override the runtime config governing this router's diagnostic
    /// logging (unmatched dispatch, unhandled rejections).
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn subscribes(mut self, domain: impl Into<String>) -> Self {
        self.input_domains.push(domain.into());
        self
    }

    pub fn sends(mut self, domain: impl Into<String>, command_type: impl Into<String>) -> Self {
        let domain = domain.into();
        let command_type = command_type.into();
        match self.output_domains.iter_mut().find(|(d, _)| d == &domain) {
            Some((_, types)) => types.push(command_type),
            None => self.output_domains.push((domain, vec![command_type])),
        }
        self
    }

    pub fn on<F>(mut self, suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&EventBook, &S, &Any, &[EventBook]) -> CommandResult<ProcessManagerResponse> + Send + Sync + 'static,
    {
        self.handlers
            .insert(suffix, Box::new(handler))
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    pub fn prepare<F>(mut self, suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&EventBook, &S, &Any) -> Vec<Cover> + Send + Sync + 'static,
    {
        self.prepare_handlers
            .insert(suffix, Box::new(handler))
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    pub fn on_rejected<F>(mut self, domain: impl Into<String>, command: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Notification, &S) -> CommandResult<PmRejectionOutcome> + Send + Sync + 'static,
    {
        let key = format!("{}/{}", domain.into(), command.into());
        if self.rejection_handlers.insert(key.clone(), Box::new(handler)).is_some() {
            tracing::error!(component = %self.name, %key, "duplicate rejection handler registered");
            panic!("duplicate rejection handler for {key} on process-manager:{}", self.name);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pm_domain(&self) -> &str {
        &self.pm_domain
    }

    pub fn input_domains(&self) -> &[String] {
        &self.input_domains
    }

    pub fn event_types(&self) -> Vec<String> {
        self.handlers.suffixes()
    }

    /// Topology-discovery metadata for this process manager.
    pub fn descriptor(&self) -> crate::proto::ComponentDescriptor {
        crate::proto::ComponentDescriptor {
            name: self.name.clone(),
            component_type: crate::proto::ComponentType::ComponentProcessManager as i32,
            inputs: Some(crate::proto::DomainInputs {
                // `subscribes` doesn't partition event types per domain, so
                // every subscribed domain is paired with the full handled
                // event-type list.
                entries: self
                    .input_domains
                    .iter()
                    .map(|domain| crate::proto::DomainInput {
                        domain: domain.clone(),
                        types: self.event_types(),
                    })
                    .collect(),
            }),
            output_types: self
                .output_domains
                .iter()
                .flat_map(|(_, types)| types.clone())
                .collect(),
        }
    }

    pub fn prepare_destinations(&self, trigger: &EventBook, process_state: &EventBook) -> Vec<Cover> {
        let Some(event_any) = trigger.pages.last().and_then(|p| p.event.as_ref()) else {
            return vec![];
        };
        let state = (self.rebuild)(process_state);
        match self.prepare_handlers.find(&event_any.type_url) {
            Some(handler) => handler(trigger, &state, event_any),
            None => vec![],
        }
    }

    pub fn dispatch(
        &self,
        trigger: &EventBook,
        process_state: &EventBook,
        destinations: &[EventBook],
    ) -> Result<ProcessManagerResponse, Status> {
        tracing::trace!(name = %self.name, "process manager dispatch entered");
        let result = self.dispatch_inner(trigger, process_state, destinations);
        tracing::trace!(name = %self.name, ok = result.is_ok(), "process manager dispatch exited");
        result
    }

    fn dispatch_inner(
        &self,
        trigger: &EventBook,
        process_state: &EventBook,
        destinations: &[EventBook],
    ) -> Result<ProcessManagerResponse, Status> {
        let Some(event_any) = trigger.pages.last().and_then(|p| p.event.as_ref()) else {
            return Ok(ProcessManagerResponse::default());
        };

        let type_url = &event_any.type_url;

        if type_url.ends_with("Notification") {
            return self.dispatch_notification(event_any, process_state);
        }

        let state = (self.rebuild)(process_state);

        let handler = match self.handlers.find(type_url) {
            Some(h) => h,
            None => {
                if self.config.log_unmatched_dispatch {
                    tracing::debug!(name = %self.name, %type_url, "no handler registered for event type, ignoring");
                }
                return Ok(ProcessManagerResponse::default());
            }
        };

        handler(trigger, &state, event_any, destinations).map_err(Status::from)
    }

    fn dispatch_notification(
        &self,
        notification_any: &Any,
        process_state: &EventBook,
    ) -> Result<ProcessManagerResponse, Status> {
        use prost::Message;

        let state = (self.rebuild)(process_state);
        let notification = Notification::decode(notification_any.value.as_slice())
            .map_err(|e| Status::invalid_argument(format!("invalid Notification: {e}")))?;
        let rejection = compensation::decode_rejection(&notification)?;
        let key = compensation::rejection_key(&rejection);

        let Some(handler) = self.rejection_handlers.get(&key) else {
            if self.config.log_unhandled_rejections {
                tracing::debug!(name = %self.name, %key, "no compensation handler registered, delegating to framework default");
            }
            return Ok(ProcessManagerResponse {
                revocation: Some(compensation::default_delegation(&self.pm_domain, &key)),
                ..Default::default()
            });
        };

        let outcome = handler(&notification, &state)?;

        Ok(ProcessManagerResponse {
            process_events: outcome.process_events,
            propagate: outcome.propagate,
            ..Default::default()
        })
    }
}
