//! Name to outbound entry index.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::routing::error::BuildError;
use crate::routing::link::OutboundMatch;

/// Case-insensitive route name lookup.
#[derive(Debug, Default)]
pub struct NamedEntries {
    entries: HashMap<String, Arc<OutboundMatch>>,
}

impl NamedEntries {
    /// Index every named entry. Reusing a name for a different template is an
    /// error; reusing it for the same template keeps the first registration.
    pub fn new(matches: &[Arc<OutboundMatch>]) -> Result<Self, BuildError> {
        let mut entries = HashMap::new();
        for candidate in matches {
            let Some(name) = candidate.entry.name() else {
                continue;
            };
            match entries.entry(name.to_ascii_lowercase()) {
                Entry::Vacant(slot) => {
                    slot.insert(Arc::clone(candidate));
                }
                Entry::Occupied(slot) => {
                    let first = slot.get().entry.template.text();
                    let second = candidate.entry.template.text();
                    if !first.eq_ignore_ascii_case(second) {
                        return Err(BuildError::AmbiguousRouteName {
                            name: name.to_string(),
                            first: first.to_string(),
                            second: second.to_string(),
                        });
                    }
                    tracing::debug!(name = %name, template = %first, "Duplicate route name with identical template ignored");
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&OutboundMatch> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|m| m.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
