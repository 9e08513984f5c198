//! Field list regenerated from an external schema description

use super::{GeneratedRecord, Generator, Reconciler};
use crate::overlay::Overlay;
use metalayer_core::{MetadataTree, Result, Value};
use tracing::debug;

/// One field reported by a [`FieldSource`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name, used as the natural identifier
    pub name: String,
    /// Source-reported type label
    pub type_label: String,
    /// Optional display alias
    pub alias: Option<String>,
}

impl FieldDescriptor {
    /// Descriptor without alias
    pub fn new(name: impl Into<String>, type_label: impl Into<String>) -> Self {
        FieldDescriptor {
            name: name.into(),
            type_label: type_label.into(),
            alias: None,
        }
    }

    /// Set the alias (builder pattern)
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// External description of a data source's fields
pub trait FieldSource {
    /// Current fields, or `None` when the source cannot describe itself
    fn fields(&self) -> Option<Vec<FieldDescriptor>>;
}

impl FieldSource for Vec<FieldDescriptor> {
    fn fields(&self) -> Option<Vec<FieldDescriptor>> {
        Some(self.clone())
    }
}

/// Regenerates a repeated complex field list from a [`FieldSource`]
///
/// Elements are keyed by field name. The type label and alias are computed
/// attributes; everything else a user entered on an element is carried over.
#[derive(Debug, Clone)]
pub struct FieldListGenerator {
    reconciler: Reconciler,
    type_field: String,
    alias_field: String,
}

impl FieldListGenerator {
    /// Generator writing `name`, `type` and `alias` attributes of `type_name`
    /// elements under `key`
    pub fn new(key: impl Into<String>, type_name: impl Into<String>) -> Self {
        FieldListGenerator {
            reconciler: Reconciler::new(key, type_name, "name"),
            type_field: "type".to_string(),
            alias_field: "alias".to_string(),
        }
    }

    /// Use different attribute keys for the identifier, type and alias
    pub fn with_fields(
        mut self,
        id_field: impl Into<String>,
        type_field: impl Into<String>,
        alias_field: impl Into<String>,
    ) -> Self {
        let key = self.reconciler.key().to_string();
        let type_name = self.reconciler.type_name().to_string();
        self.reconciler = Reconciler::new(key, type_name, id_field);
        self.type_field = type_field.into();
        self.alias_field = alias_field.into();
        self
    }

    fn record(&self, field: FieldDescriptor) -> GeneratedRecord {
        let record = GeneratedRecord::new(field.name)
            .field(self.type_field.as_str(), Value::Text(field.type_label));
        match field.alias {
            Some(alias) => record.field(self.alias_field.as_str(), Value::Text(alias)),
            None => record,
        }
    }
}

impl Generator for FieldListGenerator {
    type Context = dyn FieldSource;

    fn name(&self) -> &str {
        "field-list"
    }

    fn supports(&self, tree: &MetadataTree, context: &dyn FieldSource) -> bool {
        tree.trees(self.reconciler.key()).is_ok() && context.fields().is_some()
    }

    fn generate(
        &self,
        overlay: &Overlay<'_>,
        tree: &mut MetadataTree,
        context: &dyn FieldSource,
    ) -> Result<()> {
        let Some(fields) = context.fields() else {
            debug!(target: "metalayer::generator", key = self.reconciler.key(), "Field source unavailable");
            return Ok(());
        };
        let records: Vec<_> = fields.into_iter().map(|f| self.record(f)).collect();
        self.reconciler.reconcile(overlay, tree, records)?;
        Ok(())
    }
}
