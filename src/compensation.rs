//! Compensation dispatch shared by the aggregate and process-manager
//! engines.
//!
//! Both engines face the same situation: a command they previously sent
//! was rejected by its target, and the rejection comes back wrapped in a
//! `Notification`. Extracting the rejected command's domain/suffix and
//! picking (or falling back from) a registered compensation handler is
//! identical in both cases, so it lives here once instead of twice.

use prost::Message;
use tonic::Status;

use crate::proto::{Notification, RejectionNotification, RevocationResponse};

/// `"<domain>/<command-suffix>"` key a rejection handler is registered
/// under.
pub fn rejection_key(rejection: &RejectionNotification) -> String {
    let (domain, suffix) = rejection_route(rejection);
    format!("{domain}/{suffix}")
}

fn rejection_route(rejection: &RejectionNotification) -> (String, String) {
    let Some(rejected) = &rejection.rejected_command else {
        return (String::new(), String::new());
    };

    let domain = rejected
        .cover
        .as_ref()
        .map(|c| c.domain.clone())
        .unwrap_or_default();

    let suffix = rejected
        .pages
        .first()
        .and_then(|p| p.command.as_ref())
        .map(|c| crate::convert::bare_type_name(&c.type_url).to_string())
        .unwrap_or_default();

    (domain, suffix)
}

/// Decode a `Notification`'s opaque payload as a `RejectionNotification`.
///
/// Any other payload shape is a caller error (`INVALID_ARGUMENT`), not a
/// business rejection — only the aggregate/PM business logic gets to
/// produce `FAILED_PRECONDITION`.
pub fn decode_rejection(notification: &Notification) -> Result<RejectionNotification, Status> {
    let payload = notification
        .payload
        .as_ref()
        .ok_or_else(|| Status::invalid_argument("notification missing payload"))?;
    RejectionNotification::decode(payload.value.as_slice())
        .map_err(|e| Status::invalid_argument(format!("invalid RejectionNotification: {e}")))
}

/// The framework-default response when no compensation handler is
/// registered for a rejected command: hand the situation back to the
/// coordinator rather than silently dropping it.
pub fn default_delegation(owner_domain: &str, key: &str) -> RevocationResponse {
    RevocationResponse {
        emit_system_revocation: true,
        send_to_dead_letter_queue: false,
        escalate: false,
        abort: false,
        reason: format!("{owner_domain} has no compensation handler for {key}"),
    }
}
