//! DerivedIndexRegistry: which positions template content owns
//!
//! Maps a top-level attribute key to the sorted list of indices that are
//! currently populated by template overlay content. Attributes nested inside
//! complex sub-trees are never tracked individually; whoever wrote a
//! sub-tree owns all of it.
//!
//! The registry is stored next to the resource's tree by the caller and
//! passed into every merge. Editors read it to decide which positions to
//! lock.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-attribute bookkeeping of template-owned positions
///
/// Serializes as a plain `key -> [index]` map. Deserialized lists are sorted
/// and de-duplicated the same way [`mark_derived`](Self::mark_derived) does.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Vec<usize>>",
    into = "BTreeMap<String, Vec<usize>>"
)]
pub struct DerivedIndexRegistry {
    entries: BTreeMap<String, Vec<usize>>,
}

impl From<BTreeMap<String, Vec<usize>>> for DerivedIndexRegistry {
    fn from(stored: BTreeMap<String, Vec<usize>>) -> Self {
        let mut registry = DerivedIndexRegistry::new();
        for (key, indices) in stored {
            registry.mark_derived(&key, indices);
        }
        registry
    }
}

impl From<DerivedIndexRegistry> for BTreeMap<String, Vec<usize>> {
    fn from(registry: DerivedIndexRegistry) -> Self {
        registry.entries
    }
}

impl DerivedIndexRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Derived indices for `key`, ascending (empty if none)
    pub fn indices(&self, key: &str) -> &[usize] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Record `indices` of `key` as derived
    ///
    /// Merges into any indices already recorded; the stored list stays
    /// sorted and free of duplicates. An empty input records nothing.
    pub fn mark_derived(&mut self, key: &str, indices: impl IntoIterator<Item = usize>) {
        let mut incoming = indices.into_iter().peekable();
        if incoming.peek().is_none() {
            return;
        }
        let list = self.entries.entry(key.to_string()).or_default();
        list.extend(incoming);
        list.sort_unstable();
        list.dedup();
    }

    /// Whether `key[index]` is template-derived
    pub fn is_derived(&self, key: &str, index: usize) -> bool {
        self.indices(key).binary_search(&index).is_ok()
    }

    /// Keys with at least one derived index
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Forget everything recorded for `key`
    pub fn remove(&mut self, key: &str) -> Option<Vec<usize>> {
        self.entries.remove(key)
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// True when nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of derived positions across all keys
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}
