//! Extension traits for generated proto types.
//!
//! Keeps ergonomic accessors (domain, correlation_id, sequence numbers,
//! typed payload decoding) out of the wire types themselves.

pub mod books;
pub mod constants;
pub mod cover;
pub mod edition;
pub mod pages;
pub mod uuid;

pub use books::{calculate_next_sequence, calculate_set_next_seq, CommandBookExt, EventBookExt};
pub use constants::{DEFAULT_EDITION, PROJECTION_DOMAIN_PREFIX, UNKNOWN_DOMAIN, WILDCARD_DOMAIN};
pub use cover::CoverExt;
pub use edition::EditionExt;
pub use pages::{CommandPageExt, EventPageExt};
pub use uuid::{ProtoUuidExt, UuidExt};
