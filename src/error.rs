//! Error types for the meridian-core runtime.

use tonic::Status;

/// Raised while building a router/engine: duplicate dispatch keys, missing
/// required registrations, or other mistakes a component author made that
/// the runtime must never start with outstanding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigurationError {
    #[error("duplicate dispatch suffix {suffix:?} already registered for {component}")]
    DuplicateSuffix { component: String, suffix: String },

    #[error("duplicate rejection handler for {domain}/{command} already registered on {component}")]
    DuplicateRejectionHandler {
        component: String,
        domain: String,
        command: String,
    },

    #[error("{component} requires at least one registered handler")]
    NoHandlers { component: String },
}

/// Error raised by a command/event handler that wants the caller's request
/// rejected. Maps to `FAILED_PRECONDITION`, never to an internal failure.
#[derive(Debug, Clone)]
pub struct CommandRejectedError {
    pub reason: String,
}

impl CommandRejectedError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for CommandRejectedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "command rejected: {}", self.reason)
    }
}

impl std::error::Error for CommandRejectedError {}

impl From<CommandRejectedError> for Status {
    fn from(err: CommandRejectedError) -> Self {
        Status::failed_precondition(err.reason)
    }
}

/// Result type for handler bodies: a handler only ever fails with a
/// rejection reason, never with an arbitrary error.
pub type CommandResult<T> = std::result::Result<T, CommandRejectedError>;
