//! Attribute diffing between declared and live state.

use crate::types::{AttributeDelta, Attributes, LiveState, Namespace, ResourceSpec};
use log::{debug, info};

/// Compute the deltas that turn `current` into `desired` for one namespace.
///
/// Additions and changes come first, in key order, followed by removals.
/// Values are compared as exact strings.
pub fn diff(
    namespace: Namespace,
    desired: &Attributes,
    current: &Attributes,
) -> Vec<AttributeDelta> {
    let mut deltas = Vec::new();

    for (key, value) in desired {
        match current.get(key) {
            Some(existing) if existing == value => {
                debug!("{key} {namespace} didn't change");
            }
            Some(existing) => {
                info!("{key} {namespace} changed from {existing} to {value}");
                deltas.push(AttributeDelta::Change {
                    namespace,
                    key: key.clone(),
                    from: existing.clone(),
                    to: value.clone(),
                });
            }
            None => {
                info!("{key} {namespace} added with {value}");
                deltas.push(AttributeDelta::Add {
                    namespace,
                    key: key.clone(),
                    value: value.clone(),
                });
            }
        }
    }

    for key in current.keys().filter(|key| !desired.contains_key(*key)) {
        info!("{key} {namespace} was removed");
        deltas.push(AttributeDelta::Remove {
            namespace,
            key: key.clone(),
        });
    }

    deltas
}

/// Deltas for both namespaces of a primitive, parameters first.
pub fn diff_resource(spec: &ResourceSpec, live: &LiveState) -> Vec<AttributeDelta> {
    Namespace::ALL
        .into_iter()
        .flat_map(|ns| diff(ns, spec.attributes(ns), live.attributes(ns)))
        .collect()
}

/// Apply deltas to a mapping; the inverse of [`diff`].
pub fn patch(current: &Attributes, deltas: &[AttributeDelta]) -> Attributes {
    let mut patched = current.clone();
    for delta in deltas {
        match delta {
            AttributeDelta::Add { key, value, .. } | AttributeDelta::Change { key, to: value, .. } => {
                patched.insert(key.clone(), value.clone());
            }
            AttributeDelta::Remove { key, .. } => {
                patched.remove(key);
            }
        }
    }
    patched
}

/// Delta counts for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    /// Keys to add
    pub additions: usize,
    /// Keys whose value changes
    pub changes: usize,
    /// Keys to remove
    pub removals: usize,
}

impl DiffSummary {
    /// Create a summary from a list of deltas.
    pub fn from_deltas(deltas: &[AttributeDelta]) -> Self {
        let mut summary = Self::default();
        for delta in deltas {
            match delta {
                AttributeDelta::Add { .. } => summary.additions += 1,
                AttributeDelta::Change { .. } => summary.changes += 1,
                AttributeDelta::Remove { .. } => summary.removals += 1,
            }
        }
        summary
    }

    /// Total number of deltas.
    pub fn total(&self) -> usize {
        self.additions + self.changes + self.removals
    }
}
