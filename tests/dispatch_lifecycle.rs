//! End-to-end dispatch/lifecycle scenarios exercising the public router
//! API the way an embedding coordinator would: build a router, feed it
//! `ContextualCommand`/event-book inputs, and assert on the wire types it
//! returns.

use prost::Message;
use prost_types::Any;

use meridian_core::proto::{
    business_response, event_page, CommandBook, CommandPage, ContextualCommand, Cover, EventBook,
    EventPage, Notification, RejectionNotification,
};
use meridian_core::{CommandRejectedError, CommandResult, CommandRouter, EventRouter, ProcessManagerResponse, ProcessManagerRouter, UpcasterRouter};

#[derive(Clone, PartialEq, Message)]
struct OpenAccount {
    #[prost(string, tag = "1")]
    owner: String,
}

#[derive(Clone, PartialEq, Message)]
struct AccountOpened {
    #[prost(string, tag = "1")]
    owner: String,
}

#[derive(Clone, PartialEq, Message)]
struct Deposit {
    #[prost(uint64, tag = "1")]
    amount: u64,
}

#[derive(Clone, PartialEq, Message)]
struct Deposited {
    #[prost(uint64, tag = "1")]
    amount: u64,
}

#[derive(Default, Clone)]
struct AccountState {
    opened: bool,
    balance: u64,
}

fn rebuild_account(events: &EventBook) -> AccountState {
    let mut state = AccountState::default();
    for page in &events.pages {
        let Some(event) = &page.event else { continue };
        if event.type_url.ends_with("AccountOpened") {
            if let Ok(e) = AccountOpened::decode(event.value.as_slice()) {
                state.opened = true;
                let _ = e.owner;
            }
        } else if event.type_url.ends_with("Deposited") {
            if let Ok(e) = Deposited::decode(event.value.as_slice()) {
                state.balance += e.amount;
            }
        }
    }
    state
}

fn handle_open_account(
    cb: &CommandBook,
    cmd: &Any,
    state: &AccountState,
    seq: u32,
) -> CommandResult<EventBook> {
    let cmd = OpenAccount::decode(cmd.value.as_slice()).unwrap();
    if state.opened {
        return Err(CommandRejectedError::new("account already open"));
    }
    Ok(EventBook {
        cover: cb.cover.clone(),
        pages: vec![EventPage {
            sequence: Some(event_page::Sequence::Num(seq)),
            event: Some(Any {
                type_url: "type.googleapis.com/examples.AccountOpened".into(),
                value: AccountOpened { owner: cmd.owner }.encode_to_vec(),
            }),
            ..Default::default()
        }],
        snapshot: None,
        next_sequence: 0,
    })
}

fn handle_deposit(
    cb: &CommandBook,
    cmd: &Any,
    state: &AccountState,
    seq: u32,
) -> CommandResult<EventBook> {
    let cmd = Deposit::decode(cmd.value.as_slice()).unwrap();
    if !state.opened {
        return Err(CommandRejectedError::new("account not open"));
    }
    Ok(EventBook {
        cover: cb.cover.clone(),
        pages: vec![EventPage {
            sequence: Some(event_page::Sequence::Num(seq)),
            event: Some(Any {
                type_url: "type.googleapis.com/examples.Deposited".into(),
                value: Deposited { amount: cmd.amount }.encode_to_vec(),
            }),
            ..Default::default()
        }],
        snapshot: None,
        next_sequence: 0,
    })
}

fn account_router() -> CommandRouter<AccountState> {
    CommandRouter::new("account", rebuild_account)
        .on("OpenAccount", handle_open_account)
        .on("Deposit", handle_deposit)
}

fn contextual_command(type_url: &str, value: Vec<u8>, prior: EventBook) -> ContextualCommand {
    ContextualCommand {
        command: Some(CommandBook {
            cover: Some(Cover {
                domain: "account".into(),
                ..Default::default()
            }),
            pages: vec![CommandPage {
                sequence: 0,
                command: Some(Any {
                    type_url: type_url.into(),
                    value,
                }),
                ..Default::default()
            }],
            saga_origin: None,
        }),
        events: Some(prior),
    }
}

fn event_page_for(type_url: &str, value: Vec<u8>, seq: u32) -> EventPage {
    EventPage {
        sequence: Some(event_page::Sequence::Num(seq)),
        event: Some(Any {
            type_url: type_url.into(),
            value,
        }),
        ..Default::default()
    }
}

/// New aggregate, single command producing a single event from empty
/// history.
#[test]
fn new_aggregate_single_command_yields_single_event() {
    let router = account_router();
    let response = router
        .handle(&contextual_command(
            "type.googleapis.com/examples.OpenAccount",
            OpenAccount {
                owner: "alice".into(),
            }
            .encode_to_vec(),
            EventBook::default(),
        ))
        .unwrap();

    match response.result {
        Some(business_response::Result::Events(book)) => {
            assert_eq!(book.pages.len(), 1);
            let event = book.pages[0].event.as_ref().unwrap();
            assert!(event.type_url.ends_with("AccountOpened"));
        }
        other => panic!("expected events, got {other:?}"),
    }
}

/// Optimistic concurrency: replaying a longer history advances the next
/// sequence number handed to the handler, and state folds every prior
/// event before the new command is dispatched.
#[test]
fn replay_advances_sequence_and_state() {
    let router = account_router();
    let prior = EventBook {
        pages: vec![
            event_page_for(
                "type.googleapis.com/examples.AccountOpened",
                AccountOpened {
                    owner: "alice".into(),
                }
                .encode_to_vec(),
                0,
            ),
            event_page_for(
                "type.googleapis.com/examples.Deposited",
                Deposited { amount: 50 }.encode_to_vec(),
                1,
            ),
        ],
        next_sequence: 2,
        ..Default::default()
    };

    let response = router
        .handle(&contextual_command(
            "type.googleapis.com/examples.Deposit",
            Deposit { amount: 25 }.encode_to_vec(),
            prior,
        ))
        .unwrap();

    match response.result {
        Some(business_response::Result::Events(book)) => {
            assert_eq!(book.pages.len(), 1);
            assert_eq!(book.pages[0].sequence, Some(event_page::Sequence::Num(2)));
        }
        other => panic!("expected events, got {other:?}"),
    }
}

#[derive(Clone, PartialEq, Message)]
struct AccountOpenedV1 {
    #[prost(string, tag = "1")]
    owner: String,
}

fn upcast_account_opened_v1(event_any: &Any) -> Any {
    let old = AccountOpenedV1::decode(event_any.value.as_slice()).unwrap();
    Any {
        type_url: "type.googleapis.com/examples.AccountOpened".into(),
        value: AccountOpened { owner: old.owner }.encode_to_vec(),
    }
}

/// An upcaster transforms the old-version event in place while leaving
/// sequence number and page ordering untouched.
#[test]
fn upcaster_transforms_old_version_preserving_sequence_and_order() {
    let upcaster = UpcasterRouter::new("upcaster-account", "account")
        .upcasts("AccountOpenedV1", upcast_account_opened_v1);

    let pages = vec![
        event_page_for(
            "type.googleapis.com/examples.AccountOpenedV1",
            AccountOpenedV1 {
                owner: "alice".into(),
            }
            .encode_to_vec(),
            0,
        ),
        event_page_for(
            "type.googleapis.com/examples.Deposited",
            Deposited { amount: 10 }.encode_to_vec(),
            1,
        ),
    ];

    let upcast = upcaster.upcast(pages);
    assert_eq!(upcast.len(), 2);
    assert_eq!(upcast[0].sequence, Some(event_page::Sequence::Num(0)));
    assert!(upcast[0].event.as_ref().unwrap().type_url.ends_with("AccountOpened"));
    assert_eq!(upcast[1].sequence, Some(event_page::Sequence::Num(1)));
    assert!(upcast[1].event.as_ref().unwrap().type_url.ends_with("Deposited"));
}

#[derive(Clone, PartialEq, Message)]
struct OrderPlaced {
    #[prost(string, tag = "1")]
    order_id: String,
}

#[derive(Clone, PartialEq, Message)]
struct ReserveStock {
    #[prost(string, tag = "1")]
    order_id: String,
}

fn prepare_order_placed(_source: &EventBook, _event_any: &Any) -> Vec<meridian_core::proto::Cover> {
    vec![meridian_core::proto::Cover {
        domain: "inventory".into(),
        ..Default::default()
    }]
}

fn handle_order_placed(
    _source: &EventBook,
    event_any: &Any,
    destinations: &[EventBook],
) -> CommandResult<Option<CommandBook>> {
    // The saga only reacts once the coordinator has actually fetched the
    // destination it asked for in `prepare`.
    assert_eq!(destinations.len(), 1);
    let event = OrderPlaced::decode(event_any.value.as_slice()).unwrap();
    Ok(Some(CommandBook {
        cover: Some(Cover {
            domain: "inventory".into(),
            ..Default::default()
        }),
        pages: vec![CommandPage {
            command: Some(Any {
                type_url: "type.googleapis.com/examples.ReserveStock".into(),
                value: ReserveStock {
                    order_id: event.order_id,
                }
                .encode_to_vec(),
            }),
            ..Default::default()
        }],
        saga_origin: None,
    }))
}

/// A saga's prepare step declares a destination, the coordinator fetches
/// it, and dispatch receives it alongside the triggering event.
#[test]
fn saga_dispatches_with_fetched_destinations() {
    let saga = EventRouter::new("saga-fulfillment", "order")
        .sends("inventory", "ReserveStock")
        .prepare("OrderPlaced", prepare_order_placed)
        .on("OrderPlaced", handle_order_placed);

    let trigger = EventBook {
        pages: vec![event_page_for(
            "type.googleapis.com/examples.OrderPlaced",
            OrderPlaced {
                order_id: "o-1".into(),
            }
            .encode_to_vec(),
            0,
        )],
        ..Default::default()
    };

    let destinations = saga.prepare_destinations(&Some(trigger.clone()));
    assert_eq!(destinations.len(), 1);
    assert_eq!(destinations[0].domain, "inventory");

    let fetched = vec![EventBook::default()];
    let commands = saga.dispatch(&trigger, &fetched).unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].cover.as_ref().unwrap().domain, "inventory");
}

fn notification_for(domain: &str, command_suffix: &str, reason: &str) -> ContextualCommand {
    let rejection = RejectionNotification {
        rejected_command: Some(CommandBook {
            cover: Some(Cover {
                domain: domain.into(),
                ..Default::default()
            }),
            pages: vec![CommandPage {
                command: Some(Any {
                    type_url: format!("type.googleapis.com/examples.{command_suffix}"),
                    value: vec![],
                }),
                ..Default::default()
            }],
            saga_origin: None,
        }),
        reason: reason.into(),
    };
    let notification = Notification {
        payload: Some(Any {
            type_url: "type.googleapis.com/meridian.RejectionNotification".into(),
            value: rejection.encode_to_vec(),
        }),
    };
    ContextualCommand {
        command: Some(CommandBook {
            cover: Some(Cover {
                domain: "account".into(),
                ..Default::default()
            }),
            pages: vec![CommandPage {
                command: Some(Any {
                    type_url: "type.googleapis.com/meridian.Notification".into(),
                    value: notification.encode_to_vec(),
                }),
                ..Default::default()
            }],
            saga_origin: None,
        }),
        events: Some(EventBook::default()),
    }
}

fn handle_deposit_rejected(
    _notification: &Notification,
    _state: &AccountState,
) -> CommandResult<EventBook> {
    Ok(EventBook {
        pages: vec![EventPage {
            sequence: Some(event_page::Sequence::Num(0)),
            event: Some(Any {
                type_url: "type.googleapis.com/examples.DepositReverted".into(),
                value: vec![],
            }),
            ..Default::default()
        }],
        ..Default::default()
    })
}

/// A rejection routed back to the originating aggregate, for a command it
/// issued, reaches the registered compensation handler.
#[test]
fn rejection_propagates_to_registered_compensation_handler() {
    let router = account_router().on_rejected("inventory", "ReserveStock", handle_deposit_rejected);

    let response = router
        .handle(&notification_for("inventory", "ReserveStock", "out of stock"))
        .unwrap();

    match response.result {
        Some(business_response::Result::Events(book)) => {
            assert_eq!(book.pages.len(), 1);
            assert!(book.pages[0]
                .event
                .as_ref()
                .unwrap()
                .type_url
                .ends_with("DepositReverted"));
        }
        other => panic!("expected compensation events, got {other:?}"),
    }
}

/// A rejection for which no handler was registered falls through to the
/// framework's default delegation rather than being silently dropped.
#[test]
fn unmatched_rejection_delegates_to_framework_default() {
    let router = account_router();

    let response = router
        .handle(&notification_for("inventory", "ReserveStock", "out of stock"))
        .unwrap();

    match response.result {
        Some(business_response::Result::Revocation(revocation)) => {
            assert!(revocation.emit_system_revocation);
            assert!(revocation.reason.contains("inventory/ReserveStock"));
        }
        other => panic!("expected default delegation, got {other:?}"),
    }
}

#[derive(Clone, PartialEq, Message)]
struct RenewalDue {
    #[prost(string, tag = "1")]
    account_id: String,
}

#[derive(Default, Clone)]
struct RenewalPmState {
    pending: u32,
}

fn rebuild_renewal(_events: &EventBook) -> RenewalPmState {
    RenewalPmState::default()
}

fn handle_renewal_due(
    _trigger: &EventBook,
    _state: &RenewalPmState,
    event_any: &Any,
    _destinations: &[EventBook],
) -> CommandResult<ProcessManagerResponse> {
    let event = RenewalDue::decode(event_any.value.as_slice()).unwrap();
    Ok(ProcessManagerResponse {
        commands: vec![CommandBook {
            cover: Some(Cover {
                domain: "billing".into(),
                ..Default::default()
            }),
            pages: vec![CommandPage {
                command: Some(Any {
                    type_url: format!("type.googleapis.com/examples.ChargeCard#{}", event.account_id),
                    value: vec![],
                }),
                ..Default::default()
            }],
            saga_origin: None,
        }],
        ..Default::default()
    })
}

/// Process managers route rejections through the same compensation
/// machinery as aggregates.
#[test]
fn process_manager_rejection_propagates_to_rejection_handler() {
    fn handle_charge_rejected(
        _notification: &Notification,
        _state: &RenewalPmState,
    ) -> CommandResult<meridian_core::PmRejectionOutcome> {
        Ok(meridian_core::PmRejectionOutcome {
            process_events: Some(EventBook {
                pages: vec![EventPage {
                    sequence: Some(event_page::Sequence::Num(0)),
                    event: Some(Any {
                        type_url: "type.googleapis.com/examples.RenewalFailed".into(),
                        value: vec![],
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            propagate: None,
        })
    }

    let pm = ProcessManagerRouter::new("pm-renewal", "renewal", rebuild_renewal)
        .subscribes("account")
        .on("RenewalDue", handle_renewal_due)
        .on_rejected("billing", "ChargeCard", handle_charge_rejected);

    let notification = Notification {
        payload: Some(Any {
            type_url: "type.googleapis.com/meridian.RejectionNotification".into(),
            value: RejectionNotification {
                rejected_command: Some(CommandBook {
                    cover: Some(Cover {
                        domain: "billing".into(),
                        ..Default::default()
                    }),
                    pages: vec![CommandPage {
                        command: Some(Any {
                            type_url: "type.googleapis.com/examples.ChargeCard".into(),
                            value: vec![],
                        }),
                        ..Default::default()
                    }],
                    saga_origin: None,
                }),
                reason: "card declined".into(),
            }
            .encode_to_vec(),
        }),
    };
    let trigger = EventBook {
        pages: vec![event_page_for(
            "type.googleapis.com/meridian.Notification",
            notification.encode_to_vec(),
            0,
        )],
        ..Default::default()
    };

    let response = pm.dispatch(&trigger, &EventBook::default(), &[]).unwrap();
    let events = response.process_events.expect("expected compensation events");
    assert_eq!(events.pages.len(), 1);
    assert!(events.pages[0]
        .event
        .as_ref()
        .unwrap()
        .type_url
        .ends_with("RenewalFailed"));
}

fn renewal_rejection_trigger(domain: &str, command_suffix: &str, reason: &str) -> EventBook {
    let notification = Notification {
        payload: Some(Any {
            type_url: "type.googleapis.com/meridian.RejectionNotification".into(),
            value: RejectionNotification {
                rejected_command: Some(CommandBook {
                    cover: Some(Cover {
                        domain: domain.into(),
                        ..Default::default()
                    }),
                    pages: vec![CommandPage {
                        command: Some(Any {
                            type_url: format!("type.googleapis.com/examples.{command_suffix}"),
                            value: vec![],
                        }),
                        ..Default::default()
                    }],
                    saga_origin: None,
                }),
                reason: reason.into(),
            }
            .encode_to_vec(),
        }),
    };
    EventBook {
        pages: vec![event_page_for(
            "type.googleapis.com/meridian.Notification",
            notification.encode_to_vec(),
            0,
        )],
        ..Default::default()
    }
}

/// A rejection handler may forward the rejection onward instead of (or
/// alongside) emitting its own process events; the outcome's `propagate`
/// notification reaches the response unchanged.
#[test]
fn process_manager_rejection_handler_can_propagate_notification() {
    fn handle_charge_rejected_and_propagate(
        notification: &Notification,
        _state: &RenewalPmState,
    ) -> CommandResult<meridian_core::PmRejectionOutcome> {
        Ok(meridian_core::PmRejectionOutcome {
            process_events: None,
            propagate: Some(notification.clone()),
        })
    }

    let pm = ProcessManagerRouter::new("pm-renewal", "renewal", rebuild_renewal)
        .subscribes("account")
        .on("RenewalDue", handle_renewal_due)
        .on_rejected("billing", "ChargeCard", handle_charge_rejected_and_propagate);

    let trigger = renewal_rejection_trigger("billing", "ChargeCard", "card declined");
    let response = pm.dispatch(&trigger, &EventBook::default(), &[]).unwrap();

    assert!(response.process_events.is_none());
    assert!(response.propagate.is_some());
}

/// A process-manager rejection for which no handler was registered falls
/// through to the framework's default delegation, exactly like the
/// symmetric aggregate case above.
#[test]
fn process_manager_unmatched_rejection_delegates_to_framework_default() {
    let pm = ProcessManagerRouter::new("pm-renewal", "renewal", rebuild_renewal)
        .subscribes("account")
        .on("RenewalDue", handle_renewal_due);

    let trigger = renewal_rejection_trigger("billing", "ChargeCard", "card declined");
    let response = pm.dispatch(&trigger, &EventBook::default(), &[]).unwrap();

    let revocation = response
        .revocation
        .expect("expected default delegation revocation");
    assert!(revocation.emit_system_revocation);
    assert!(revocation.reason.contains("billing/ChargeCard"));
}
