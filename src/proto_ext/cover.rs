//! Cover extension trait and implementations.
//!
//! Gives EventBook, CommandBook and Cover itself convenient accessors for
//! domain, correlation_id and root identity without verbose
//! `.cover.as_ref().map(...)` chains.

use crate::proto::{CommandBook, Cover, EventBook};

use super::constants::{DEFAULT_EDITION, UNKNOWN_DOMAIN};

pub trait CoverExt {
    fn cover(&self) -> Option<&Cover>;

    fn domain(&self) -> &str {
        self.cover()
            .map(|c| c.domain.as_str())
            .unwrap_or(UNKNOWN_DOMAIN)
    }

    fn correlation_id(&self) -> &str {
        self.cover()
            .map(|c| c.correlation_id.as_str())
            .unwrap_or("")
    }

    fn has_correlation_id(&self) -> bool {
        !self.correlation_id().is_empty()
    }

    fn root_uuid(&self) -> Option<uuid::Uuid> {
        self.cover()
            .and_then(|c| c.root.as_ref())
            .and_then(|u| uuid::Uuid::from_slice(&u.value).ok())
    }

    fn root_id_hex(&self) -> Option<String> {
        self.cover()
            .and_then(|c| c.root.as_ref())
            .map(|u| hex::encode(&u.value))
    }

    /// Edition name, defaulting to the main timeline name when unset.
    fn edition(&self) -> &str {
        self.cover()
            .and_then(|c| c.edition.as_ref())
            .map(|e| e.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_EDITION)
    }
}

impl CoverExt for EventBook {
    fn cover(&self) -> Option<&Cover> {
        self.cover.as_ref()
    }
}

impl CoverExt for CommandBook {
    fn cover(&self) -> Option<&Cover> {
        self.cover.as_ref()
    }
}

impl CoverExt for Cover {
    fn cover(&self) -> Option<&Cover> {
        Some(self)
    }
}
