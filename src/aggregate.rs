//! Aggregate dispatch/lifecycle engine.
//!
//! Routes a `ContextualCommand` to the handler registered for its type URL
//! suffix, rebuilding state from the attached event history first.
//! `Notification` envelopes are recognized and routed separately, to a
//! compensation handler keyed by the rejected command's domain/suffix.

use prost_types::Any;
use tonic::Status;

use crate::compensation;
use crate::config::RuntimeConfig;
use crate::error::{CommandRejectedError, CommandResult};
use crate::proto::{business_response, BusinessResponse, CommandBook, ContextualCommand, EventBook, Notification};
use crate::proto_ext::EventBookExt;
use crate::registry::SuffixTable;

/// Rebuilds a component's state from its event history.
pub type StateRebuilder<S> = fn(&EventBook) -> S;

/// Packs in-memory state back into an opaque `Any` for the Replay
/// operation. Only set when an aggregate opts into replay (needed for
/// `MERGE_SERIALIZABLE` conflict detection); without it, Replay is
/// `UNIMPLEMENTED`.
pub type StatePacker<S> = fn(&S) -> Result<Any, Status>;

pub type CommandHandler<S> = Box<dyn Fn(&CommandBook, &Any, &S, u32) -> CommandResult<EventBook> + Send + Sync>;

/// Handles a rejection routed back to this aggregate for a command it
/// previously issued (via a saga or process manager) that was rejected by
/// its target.
pub type RevocationHandler<S> = Box<dyn Fn(&Notification, &S) -> CommandResult<EventBook> + Send + Sync>;

pub struct CommandRouter<S> {
    domain: String,
    rebuild: StateRebuilder<S>,
    state_packer: Option<StatePacker<S>>,
    handlers: SuffixTable<CommandHandler<S>>,
    rejection_handlers: std::collections::HashMap<String, RevocationHandler<S>>,
    config: RuntimeConfig,
}

impl<S> CommandRouter<S> {
    pub fn new(domain: impl Into<String>, rebuild: StateRebuilder<S>) -> Self {
        let domain = domain.into();
        Self {
            handlers: SuffixTable::new(format!("aggregate:{domain}")),
            domain,
            rebuild,
            state_packer: None,
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

    /// Register a command handler for commands whose type URL ends with
    /// `suffix`. Panics on a duplicate suffix — a component must never
    /// start with an ambiguous dispatch table.
    pub fn on<F>(mut self, suffix: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&CommandBook, &Any, &S, u32) -> CommandResult<EventBook> + Send + Sync + 'static,
    {
        let suffix = suffix.into();
        self.handlers
            .insert(suffix.clone(), Box::new(handler))
            .unwrap_or_else(|e| panic!("{e}"));
        self
    }

    /// Register a compensation handler for when a command this aggregate
    /// sent to `domain` (of type `command`) comes back rejected.
    pub fn on_rejected<F>(mut self, domain: impl Into<String>, command: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Notification, &S) -> CommandResult<EventBook> + Send + Sync + 'static,
    {
        let key = format!("{}/{}", domain.into(), command.into());
        if self.rejection_handlers.insert(key.clone(), Box::new(handler)).is_some() {
            tracing::error!(component = %self.domain, %key, "duplicate rejection handler registered");
            panic!("duplicate rejection handler for {key} on aggregate:{}", self.domain);
        }
        self
    }

    /// Enable the Replay operation by providing a state packer.
    pub fn with_replay(mut self, packer: StatePacker<S>) -> Self {
        self.state_packer = Some(packer);
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn command_types(&self) -> Vec<String> {
        self.handlers.suffixes()
    }

    /// Topology-discovery metadata for this aggregate.
    pub fn descriptor(&self) -> crate::proto::ComponentDescriptor {
        crate::proto::ComponentDescriptor {
            name: self.domain.clone(),
            component_type: crate::proto::ComponentType::ComponentAggregate as i32,
            inputs: Some(crate::proto::DomainInputs {
                entries: vec![crate::proto::DomainInput {
                    domain: self.domain.clone(),
                    types: self.command_types(),
                }],
            }),
            output_types: vec![],
        }
    }

    pub fn rebuild_state(&self, event_book: &EventBook) -> S {
        (self.rebuild)(event_book)
    }

    /// Compute state as of the given events/snapshot and pack it via the
    /// registered `StatePacker`. `UNIMPLEMENTED` if replay wasn't enabled.
    pub fn replay(&self, events: &[crate::proto::EventPage], base_snapshot: Option<crate::proto::Snapshot>) -> Result<Any, Status> {
        let packer = self.state_packer.ok_or_else(|| {
            Status::unimplemented("replay not enabled for this aggregate; call with_replay()")
        })?;
        let event_book = EventBook {
            cover: None,
            pages: events.to_vec(),
            snapshot: base_snapshot,
            next_sequence: 0,
        };
        let state = (self.rebuild)(&event_book);
        packer(&state)
    }

    pub fn handle(&self, cmd: &ContextualCommand) -> Result<BusinessResponse, Status> {
        tracing::trace!(domain = %self.domain, "aggregate dispatch entered");
        let result = self.handle_inner(cmd);
        tracing::trace!(domain = %self.domain, ok = result.is_ok(), "aggregate dispatch exited");
        result
    }

    fn handle_inner(&self, cmd: &ContextualCommand) -> Result<BusinessResponse, Status> {
        let command_book = cmd
            .command
            .as_ref()
            .ok_or_else(|| Status::invalid_argument("missing command book"))?;

        let command_page = command_book
            .pages
            .first()
            .ok_or_else(|| Status::invalid_argument("missing command page"))?;

        let command_any = command_page
            .command
            .as_ref()
            .ok_or_else(|| Status::invalid_argument("missing command payload"))?;

        let event_book = cmd
            .events
            .as_ref()
            .ok_or_else(|| Status::invalid_argument("missing event book"))?;

        let state = (self.rebuild)(event_book);

        let type_url = &command_any.type_url;

        if type_url.ends_with("Notification") {
            return self.dispatch_notification(command_any, &state);
        }

        let handler = self.handlers.find(type_url).ok_or_else(|| {
            if self.config.log_unmatched_dispatch {
                tracing::debug!(domain = %self.domain, %type_url, "no handler registered for command type");
            }
            Status::invalid_argument(format!("no handler for: {type_url}"))
        })?;

        let seq = event_book.next_sequence();
        let result_book = handler(command_book, command_any, &state, seq)?;

        Ok(BusinessResponse {
            result: Some(business_response::Result::Events(result_book)),
        })
    }

    fn dispatch_notification(&self, command_any: &Any, state: &S) -> Result<BusinessResponse, Status> {
        use prost::Message;

        let notification = Notification::decode(command_any.value.as_slice())
            .map_err(|e| Status::invalid_argument(format!("invalid Notification: {e}")))?;

        let rejection = compensation::decode_rejection(&notification)?;
        let key = compensation::rejection_key(&rejection);

        if let Some(handler) = self.rejection_handlers.get(&key) {
            let result_book = handler(&notification, state)?;
            return Ok(BusinessResponse {
                result: Some(business_response::Result::Events(result_book)),
            });
        }

        if self.config.log_unhandled_rejections {
            tracing::debug!(domain = %self.domain, %key, "no compensation handler registered, delegating to framework default");
        }

        Ok(BusinessResponse {
            result: Some(business_response::Result::Revocation(
                compensation::default_delegation(&self.domain, &key),
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::{event_page, CommandPage, Cover, EventPage};
    use prost::Message;

    #[derive(Clone, PartialEq, prost::Message)]
    struct RegisterPlayer {
        #[prost(string, tag = "1")]
        email: String,
    }

    #[derive(Clone, PartialEq, prost::Message)]
    struct PlayerRegistered {
        #[prost(string, tag = "1")]
        email: String,
    }

    #[derive(Default, Clone)]
    struct PlayerState {
        exists: bool,
        email: String,
    }

    fn rebuild(events: &EventBook) -> PlayerState {
        let mut state = PlayerState::default();
        for page in &events.pages {
            if let Some(event) = &page.event {
                if event.type_url.ends_with("PlayerRegistered") {
                    if let Ok(e) = PlayerRegistered::decode(event.value.as_slice()) {
                        state.exists = true;
                        state.email = e.email;
                    }
                }
            }
        }
        state
    }

    fn handle_register(
        cb: &CommandBook,
        cmd: &Any,
        state: &PlayerState,
        seq: u32,
    ) -> CommandResult<EventBook> {
        let cmd = RegisterPlayer::decode(cmd.value.as_slice()).unwrap();
        if state.exists {
            return Err(CommandRejectedError::new("player already registered"));
        }
        let event = PlayerRegistered { email: cmd.email };
        Ok(EventBook {
            cover: cb.cover.clone(),
            pages: vec![EventPage {
                sequence: Some(event_page::Sequence::Num(seq)),
                event: Some(Any {
                    type_url: "type.googleapis.com/examples.PlayerRegistered".into(),
                    value: event.encode_to_vec(),
                }),
                ..Default::default()
            }],
            snapshot: None,
            next_sequence: 0,
        })
    }

    fn router() -> CommandRouter<PlayerState> {
        CommandRouter::new("player", rebuild).on("RegisterPlayer", handle_register)
    }

    fn contextual_command(email: &str, prior: EventBook) -> ContextualCommand {
        let cmd = RegisterPlayer {
            email: email.into(),
        };
        ContextualCommand {
            command: Some(CommandBook {
                cover: Some(Cover {
                    domain: "player".into(),
                    ..Default::default()
                }),
                pages: vec![CommandPage {
                    sequence: 0,
                    command: Some(Any {
                        type_url: "type.googleapis.com/examples.RegisterPlayer".into(),
                        value: cmd.encode_to_vec(),
                    }),
                    ..Default::default()
                }],
                saga_origin: None,
            }),
            events: Some(prior),
        }
    }

    #[test]
    fn handles_registered_command_against_empty_history() {
        let router = router();
        let response = router
            .handle(&contextual_command("a@example.com", EventBook::default()))
            .unwrap();
        match response.result {
            Some(business_response::Result::Events(book)) => {
                assert_eq!(book.pages.len(), 1);
            }
            _ => panic!("expected events"),
        }
    }

    #[test]
    fn rejects_duplicate_registration() {
        let router = router();
        let prior = EventBook {
            pages: vec![EventPage {
                sequence: Some(event_page::Sequence::Num(0)),
                event: Some(Any {
                    type_url: "type.googleapis.com/examples.PlayerRegistered".into(),
                    value: PlayerRegistered {
                        email: "a@example.com".into(),
                    }
                    .encode_to_vec(),
                }),
                ..Default::default()
            }],
            next_sequence: 1,
            ..Default::default()
        };
        let err = router
            .handle(&contextual_command("a@example.com", prior))
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::FailedPrecondition);
    }

    #[test]
    fn unhandled_command_type_is_invalid_argument() {
        let router = CommandRouter::new("player", rebuild);
        let err = router
            .handle(&contextual_command("a@example.com", EventBook::default()))
            .unwrap_err();
        assert_eq!(err.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn replay_without_packer_is_unimplemented() {
        let router = router();
        let err = router.replay(&[], None).unwrap_err();
        assert_eq!(err.code(), tonic::Code::Unimplemented);
    }

    #[test]
    #[should_panic(expected = "duplicate dispatch suffix")]
    fn duplicate_command_suffix_panics_at_construction() {
        CommandRouter::new("player", rebuild)
            .on("RegisterPlayer", handle_register)
            .on("RegisterPlayer", handle_register);
    }
}
