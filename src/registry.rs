//! Suffix-keyed dispatch table shared by every router/engine.
//!
//! Each component (aggregate, saga, process manager, projector, upcaster)
//! owns one or more of these, keyed by discriminator suffix
//! (`<host>/<package>.<TypeName>`, matched on the `.<TypeName>` tail).
//! Registration happens once at construction time and is rejected outright
//! on a duplicate suffix — the runtime must never start with an ambiguous
//! dispatch table.

use std::collections::HashMap;

use crate::error::ConfigurationError;

#[derive(Debug)]
pub struct SuffixTable<V> {
    component: String,
    entries: HashMap<String, V>,
}

impl<V> SuffixTable<V> {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            entries: HashMap::new(),
        }
    }

    /// Register `value` under `suffix`. Fails if the suffix is already
    /// taken — two handlers claiming the same discriminator is a
    /// construction-time mistake, not a runtime ambiguity to paper over.
    pub fn insert(&mut self, suffix: impl Into<String>, value: V) -> Result<(), ConfigurationError> {
        let suffix = suffix.into();
        if self.entries.contains_key(&suffix) {
            tracing::error!(component = %self.component, %suffix, "duplicate dispatch suffix registered");
            return Err(ConfigurationError::DuplicateSuffix {
                component: self.component.clone(),
                suffix,
            });
        }
        self.entries.insert(suffix, value);
        Ok(())
    }

    /// Find the entry whose suffix matches the tail of `type_url`.
    ///
    /// Suffix matching, not equality: `type_url` carries the full
    /// `<host>/<package>.<TypeName>` form while suffixes are typically bare
    /// type names.
    pub fn find(&self, type_url: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(suffix, _)| type_url.ends_with(suffix.as_str()))
            .map(|(_, v)| v)
    }

    pub fn suffixes(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
