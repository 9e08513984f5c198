//! Identity-keyed reconciliation of a repeated complex attribute

use crate::overlay::Overlay;
use metalayer_core::{
    Error, Level, MetadataTree, Result, ScalarKind, SlotShape, TreePath, Value,
};
use std::collections::HashMap;
use tracing::debug;

/// One element produced from the external source
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedRecord {
    /// Natural identifier, written to the reconciler's id field
    pub id: String,
    /// Computed attributes written over any carried values
    pub fields: Vec<(String, Value)>,
}

impl GeneratedRecord {
    /// Record with no computed attributes
    pub fn new(id: impl Into<String>) -> Self {
        GeneratedRecord {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    /// Add a computed attribute (builder pattern)
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }
}

/// Counts from one reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    /// New elements that picked up a previous element's values
    pub carried: usize,
    /// New elements with no previous match
    pub created: usize,
    /// Previous elements with no match in the new data
    pub dropped: usize,
}

/// Regenerates `key` as a list of `type_name` elements keyed by `id_field`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciler {
    key: String,
    type_name: String,
    id_field: String,
}

impl Reconciler {
    /// Create a reconciler for the repeated complex attribute `key`
    pub fn new(
        key: impl Into<String>,
        type_name: impl Into<String>,
        id_field: impl Into<String>,
    ) -> Self {
        Reconciler {
            key: key.into(),
            type_name: type_name.into(),
            id_field: id_field.into(),
        }
    }

    /// Target attribute key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Complex type of each element
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Replace the elements under the target key with `records`
    ///
    /// Elements present before are snapshotted by identifier (first
    /// occurrence wins), the key is deleted, and each record becomes a new
    /// element in order. A record whose identifier matches a snapshot first
    /// receives that snapshot's values through a single-source merge, then
    /// its computed attributes are written over them. Unmatched snapshots
    /// are dropped.
    pub fn reconcile(
        &self,
        overlay: &Overlay<'_>,
        tree: &mut MetadataTree,
        records: impl IntoIterator<Item = GeneratedRecord>,
    ) -> Result<ReconcileReport> {
        let level = overlay.schema().level(Some(self.type_name.as_str()))?;
        let id_def = level.find(&self.id_field)?;
        let id_kind = match id_def.scalar_kind() {
            Some(kind @ (ScalarKind::Text | ScalarKind::Choice)) => kind,
            Some(other) => {
                return Err(Error::mismatch(
                    self.id_field.as_str(),
                    SlotShape::Scalar(ScalarKind::Text),
                    SlotShape::Scalar(other),
                ))
            }
            None => {
                return Err(Error::mismatch(
                    self.id_field.as_str(),
                    SlotShape::Scalar(ScalarKind::Text),
                    SlotShape::SubTree,
                ))
            }
        };

        let previous = tree.trees(&self.key)?;
        let prior = previous.len();
        let mut snapshot: HashMap<String, MetadataTree> = HashMap::with_capacity(prior);
        for element in previous {
            if let Some(id) = element.value(&self.id_field, 0).and_then(Value::as_str) {
                snapshot
                    .entry(id.to_string())
                    .or_insert_with(|| element.clone());
            }
        }

        tree.delete(&self.key, None);

        let mut report = ReconcileReport::default();
        for (index, record) in records.into_iter().enumerate() {
            let element = tree.sub_tree(&self.key, Some(index))?;
            match snapshot.remove(&record.id) {
                Some(old) => {
                    overlay.merge_single(element, &old, Some(self.type_name.as_str()))?;
                    report.carried += 1;
                }
                None => report.created += 1,
            }
            let id = match id_kind {
                ScalarKind::Choice => Value::Choice(record.id),
                _ => Value::Text(record.id),
            };
            write_field(element, level, &self.id_field, id)?;
            for (name, value) in record.fields {
                write_field(element, level, &name, value)?;
            }
        }
        report.dropped = prior - report.carried;

        debug!(
            target: "metalayer::generator",
            key = %self.key,
            carried = report.carried,
            created = report.created,
            dropped = report.dropped,
            "Sub-tree reconciled"
        );
        Ok(report)
    }
}

fn write_field(element: &mut MetadataTree, level: Level<'_>, name: &str, value: Value) -> Result<()> {
    let def = level.find(name)?;
    let Some(kind) = def.scalar_kind() else {
        return Err(Error::mismatch(name, SlotShape::AnyScalar, SlotShape::SubTree));
    };
    element
        .value_at(level, kind, &TreePath::root().key(name))?
        .set(value)
}
