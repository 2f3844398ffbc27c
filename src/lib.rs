//! Component runtime for an event-sourced CQRS system: dispatch/lifecycle
//! engines for aggregates, sagas, process managers, projectors and
//! upcasters, plus the orchestration contract each exposes toward an
//! external coordinator.
//!
//! This crate builds no RPC service or client — it compiles only the
//! message types (`tonic_build` with both server and client codegen
//! disabled) and exposes router/engine methods that take and return those
//! messages directly. Embedding them behind a transport is the
//! coordinator's job.

pub mod aggregate;
pub mod compensation;
pub mod config;
pub mod convert;
pub mod error;
pub mod process_manager;
pub mod projector;
pub mod proto_ext;
pub mod registry;
pub mod saga;
pub mod state;
pub mod upcaster;
pub mod validation;

pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/meridian.rs"));
}

pub use aggregate::CommandRouter;
pub use config::RuntimeConfig;
pub use error::{CommandRejectedError, CommandResult, ConfigurationError};
pub use process_manager::{PmRejectionOutcome, ProcessManagerResponse, ProcessManagerRouter};
pub use projector::ProjectorRouter;
pub use registry::SuffixTable;
pub use saga::EventRouter;
pub use state::StateRouter;
pub use upcaster::UpcasterRouter;

pub use convert::{
    bare_type_name, now, parse_timestamp, proto_to_uuid, type_name_from_url, type_url,
    type_url_matches, uuid_to_proto, TYPE_URL_PREFIX,
};

pub use proto_ext::{
    CommandBookExt, CommandPageExt, CoverExt, EditionExt, EventBookExt, EventPageExt, ProtoUuidExt,
    UuidExt,
};

pub use meridian_macros::{
    aggregate, applies, handles, prepares, process_manager, projector, projects, reacts_to,
    rejected, saga, upcaster, upcasts,
};
