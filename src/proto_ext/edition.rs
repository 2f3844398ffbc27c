//! Edition extension trait and constructors.

use crate::proto::Edition;

use super::constants::DEFAULT_EDITION;

pub trait EditionExt {
    fn edition_inner(&self) -> &Edition;

    fn is_main_timeline(&self) -> bool {
        let name = &self.edition_inner().name;
        name.is_empty() || name == DEFAULT_EDITION
    }

    fn name_or_default(&self) -> &str {
        let edition = self.edition_inner();
        if edition.name.is_empty() {
            DEFAULT_EDITION
        } else {
            &edition.name
        }
    }

    /// Explicit divergence sequence for a domain, if this edition recorded one.
    fn divergence_for(&self, domain: &str) -> Option<u32> {
        self.edition_inner()
            .divergences
            .iter()
            .find(|d| d.domain == domain)
            .map(|d| d.sequence)
    }
}

impl EditionExt for Edition {
    fn edition_inner(&self) -> &Edition {
        self
    }
}

impl Edition {
    pub fn main_timeline() -> Self {
        Self {
            name: String::new(),
            divergences: vec![],
        }
    }

    /// An edition that diverges implicitly: it has a name but no recorded
    /// per-domain divergence points, so every domain is assumed to diverge
    /// at the point the edition's events first appear.
    pub fn implicit(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            divergences: vec![],
        }
    }

    pub fn explicit(
        name: impl Into<String>,
        divergences: Vec<crate::proto::DomainDivergence>,
    ) -> Self {
        Self {
            name: name.into(),
            divergences,
        }
    }
}

impl From<&str> for Edition {
    fn from(name: &str) -> Self {
        Edition::implicit(name)
    }
}
