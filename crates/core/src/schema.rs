//! Attribute schema and complex type registry
//!
//! The schema is handed in already parsed by an external loader. This module
//! models it and answers lookups:
//! - [`AttributeDef`]: one permitted attribute (key, label, kind, cardinality)
//! - [`AttributeSet`]: an ordered schema level
//! - [`ComplexType`]: a named, reusable attribute set for nested sub-trees
//! - [`TypeRegistry`]: type name to complex type, first registration wins
//! - [`AttributeSchema`]: root attribute set plus the type registry
//!
//! A schema is immutable once built. Reloading replaces the whole value.

use crate::error::{Error, Result, SlotShape};
use crate::path::TreePath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Scalar value kinds permitted by the schema grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    /// Free text
    Text,
    /// Numeric value
    Number,
    /// Calendar date
    Date,
    /// One value out of an enumerated list
    Choice,
    /// Opaque structured payload (lists, compound scalars)
    FreeForm,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Text => "text",
            ScalarKind::Number => "number",
            ScalarKind::Date => "date",
            ScalarKind::Choice => "choice",
            ScalarKind::FreeForm => "free-form",
        };
        f.write_str(name)
    }
}

/// What an attribute holds: a scalar or a nested complex type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AttributeKind {
    /// Scalar leaf
    Scalar {
        /// Declared value kind
        value: ScalarKind,
    },
    /// Nested sub-tree described by a registered complex type
    Complex {
        /// Name of the complex type
        type_name: String,
    },
}

/// How many values an attribute may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Exactly one slot, stored at index 0
    #[default]
    Single,
    /// Dense, 0-based list of slots
    Repeated,
}

/// Definition of one permitted attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Key, unique within its schema level
    pub key: String,
    /// Human readable label for editors
    #[serde(default)]
    pub label: String,
    /// Scalar kind or complex type reference
    #[serde(flatten)]
    pub kind: AttributeKind,
    /// Single or repeated
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl AttributeDef {
    /// Single scalar attribute
    pub fn scalar(key: impl Into<String>, value: ScalarKind) -> Self {
        let key = key.into();
        AttributeDef {
            label: key.clone(),
            key,
            kind: AttributeKind::Scalar { value },
            cardinality: Cardinality::Single,
        }
    }

    /// Single complex attribute of type `type_name`
    pub fn complex(key: impl Into<String>, type_name: impl Into<String>) -> Self {
        let key = key.into();
        AttributeDef {
            label: key.clone(),
            key,
            kind: AttributeKind::Complex {
                type_name: type_name.into(),
            },
            cardinality: Cardinality::Single,
        }
    }

    /// Make this attribute repeated (builder pattern)
    pub fn repeated(mut self) -> Self {
        self.cardinality = Cardinality::Repeated;
        self
    }

    /// Replace the label (builder pattern)
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// True for repeated attributes
    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }

    /// Scalar kind, if this is a scalar attribute
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match &self.kind {
            AttributeKind::Scalar { value } => Some(*value),
            AttributeKind::Complex { .. } => None,
        }
    }

    /// Complex type name, if this is a complex attribute
    pub fn type_name(&self) -> Option<&str> {
        match &self.kind {
            AttributeKind::Scalar { .. } => None,
            AttributeKind::Complex { type_name } => Some(type_name),
        }
    }
}

/// Ordered list of attribute definitions forming one schema level
///
/// Serializes as a plain list. Deserialization goes through
/// [`AttributeSet::push`], so a repeated key keeps its first definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "Vec<AttributeDef>", into = "Vec<AttributeDef>")]
pub struct AttributeSet {
    attributes: Vec<AttributeDef>,
}

impl From<Vec<AttributeDef>> for AttributeSet {
    fn from(defs: Vec<AttributeDef>) -> Self {
        AttributeSet::from_defs(defs)
    }
}

impl From<AttributeSet> for Vec<AttributeDef> {
    fn from(set: AttributeSet) -> Self {
        set.attributes
    }
}

impl AttributeSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from definitions; later duplicates of a key are dropped
    pub fn from_defs(defs: impl IntoIterator<Item = AttributeDef>) -> Self {
        let mut set = Self::new();
        for def in defs {
            set.push(def);
        }
        set
    }

    /// Append a definition
    ///
    /// Returns `false` (and keeps the existing definition) when the key is
    /// already present.
    pub fn push(&mut self, def: AttributeDef) -> bool {
        if self.find(&def.key).is_some() {
            warn!(target: "metalayer::schema", key = %def.key, "Duplicate attribute dropped");
            return false;
        }
        self.attributes.push(def);
        true
    }

    /// Look up a definition by exact key
    pub fn find(&self, key: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|d| d.key == key)
    }

    /// Iterate definitions in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, AttributeDef> {
        self.attributes.iter()
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// True when no attributes are defined
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<'a> IntoIterator for &'a AttributeSet {
    type Item = &'a AttributeDef;
    type IntoIter = std::slice::Iter<'a, AttributeDef>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}

/// A named, reusable set of attribute definitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexType {
    /// Registered name
    pub name: String,
    /// Attributes of the nested sub-tree
    pub attributes: AttributeSet,
}

impl ComplexType {
    /// Create a complex type
    pub fn new(name: impl Into<String>, defs: impl IntoIterator<Item = AttributeDef>) -> Self {
        ComplexType {
            name: name.into(),
            attributes: AttributeSet::from_defs(defs),
        }
    }
}

/// Registry of complex types keyed by exact name
///
/// Serializes as a `name -> type` map. On deserialization every entry is
/// registered under its own `name`; a map key that disagrees is ignored
/// with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(
    from = "BTreeMap<String, ComplexType>",
    into = "BTreeMap<String, ComplexType>"
)]
pub struct TypeRegistry {
    types: BTreeMap<String, ComplexType>,
}

impl From<BTreeMap<String, ComplexType>> for TypeRegistry {
    fn from(stored: BTreeMap<String, ComplexType>) -> Self {
        let mut registry = TypeRegistry::new();
        for (key, ty) in stored {
            if key != ty.name {
                warn!(target: "metalayer::schema", key = %key, type_name = %ty.name, "Type registered under its own name, not its map key");
            }
            registry.register(ty);
        }
        registry
    }
}

impl From<TypeRegistry> for BTreeMap<String, ComplexType> {
    fn from(registry: TypeRegistry) -> Self {
        registry.types
    }
}

impl TypeRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type; the first registration of a name wins
    ///
    /// Returns `false` when a type with the same name already exists, in
    /// which case the new definition is dropped.
    pub fn register(&mut self, ty: ComplexType) -> bool {
        if self.types.contains_key(&ty.name) {
            warn!(target: "metalayer::schema", type_name = %ty.name, "Duplicate complex type dropped");
            return false;
        }
        self.types.insert(ty.name.clone(), ty);
        true
    }

    /// Look up a type by exact name
    pub fn get(&self, name: &str) -> Option<&ComplexType> {
        self.types.get(name)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when no types are registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate registered types by name
    pub fn iter(&self) -> impl Iterator<Item = &ComplexType> {
        self.types.values()
    }
}

/// Root attribute set plus the complex type registry
///
/// # Example
///
/// ```
/// use metalayer_core::schema::{AttributeDef, AttributeSchema, ComplexType, ScalarKind};
///
/// let schema = AttributeSchema::builder()
///     .attribute(AttributeDef::scalar("title", ScalarKind::Text))
///     .attribute(AttributeDef::complex("contact", "Contact"))
///     .complex_type(ComplexType::new(
///         "Contact",
///         [AttributeDef::scalar("email", ScalarKind::Text)],
///     ))
///     .build()
///     .unwrap();
///
/// assert!(schema.find_attribute("title").is_some());
/// assert!(schema.find_type("Contact").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeSchema {
    /// Attributes of the resource's own tree
    pub attributes: AttributeSet,
    /// Complex types referenced by attributes at any level
    #[serde(default)]
    pub types: TypeRegistry,
}

impl AttributeSchema {
    /// Start building a schema
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Look up a root-level attribute
    pub fn find_attribute(&self, key: &str) -> Option<&AttributeDef> {
        self.attributes.find(key)
    }

    /// Look up a complex type
    pub fn find_type(&self, type_name: &str) -> Option<&ComplexType> {
        self.types.get(type_name)
    }

    /// Look up a complex type, failing with `UnknownType`
    pub fn require_type(&self, type_name: &str) -> Result<&ComplexType> {
        self.find_type(type_name)
            .ok_or_else(|| Error::UnknownType(type_name.to_string()))
    }

    /// Attribute set for `type_name`, or the root set when `None`
    pub fn attributes_of(&self, type_name: Option<&str>) -> Result<&AttributeSet> {
        match type_name {
            None => Ok(&self.attributes),
            Some(name) => self.require_type(name).map(|t| &t.attributes),
        }
    }

    /// View of the root level
    pub fn root(&self) -> Level<'_> {
        Level {
            schema: self,
            attributes: &self.attributes,
        }
    }

    /// View of the level for `type_name`, or the root level when `None`
    pub fn level(&self, type_name: Option<&str>) -> Result<Level<'_>> {
        Ok(Level {
            schema: self,
            attributes: self.attributes_of(type_name)?,
        })
    }

    /// Check that every referenced type name resolves
    pub fn validate(&self) -> Result<()> {
        let levels = std::iter::once(&self.attributes)
            .chain(self.types.iter().map(|t| &t.attributes));
        for level in levels {
            for def in level {
                if let Some(name) = def.type_name() {
                    self.require_type(name)?;
                }
            }
        }
        Ok(())
    }
}

/// One schema level together with the schema it belongs to
///
/// Lets callers resolve keys and descend into complex types without
/// threading the registry through every call.
#[derive(Debug, Clone, Copy)]
pub struct Level<'s> {
    schema: &'s AttributeSchema,
    attributes: &'s AttributeSet,
}

impl<'s> Level<'s> {
    /// Attribute definitions of this level
    pub fn attributes(&self) -> &'s AttributeSet {
        self.attributes
    }

    /// The owning schema
    pub fn schema(&self) -> &'s AttributeSchema {
        self.schema
    }

    /// Look up `key`, failing with `UnknownAttribute`
    pub fn find(&self, key: &str) -> Result<&'s AttributeDef> {
        self.attributes
            .find(key)
            .ok_or_else(|| Error::UnknownAttribute(key.to_string()))
    }

    /// Level of the complex type `def` refers to
    pub fn descend(&self, def: &AttributeDef) -> Result<Level<'s>> {
        match &def.kind {
            AttributeKind::Complex { type_name } => self.schema.level(Some(type_name)),
            AttributeKind::Scalar { value } => Err(Error::mismatch(
                def.key.clone(),
                SlotShape::SubTree,
                SlotShape::Scalar(*value),
            )),
        }
    }

    /// Definition addressed by `path`, crossing complex boundaries
    ///
    /// Every segment but the last must name a complex attribute. Indices
    /// other than 0 on single attributes are rejected.
    pub fn resolve(&self, path: &TreePath) -> Result<&'s AttributeDef> {
        let (last, intermediate) = path
            .split_last()
            .ok_or_else(|| Error::UnknownAttribute(String::new()))?;
        let mut level = *self;
        for seg in intermediate {
            let def = level.find(&seg.key)?;
            check_position(def, seg.position())?;
            level = level.descend(def)?;
        }
        let def = level.find(&last.key)?;
        check_position(def, last.position())?;
        Ok(def)
    }
}

fn check_position(def: &AttributeDef, position: usize) -> Result<()> {
    if !def.is_repeated() && position > 0 {
        return Err(Error::out_of_bounds(def.key.clone(), position, 1));
    }
    Ok(())
}

/// Builder for [`AttributeSchema`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    attributes: AttributeSet,
    types: TypeRegistry,
}

impl SchemaBuilder {
    /// Add a root-level attribute
    pub fn attribute(mut self, def: AttributeDef) -> Self {
        self.attributes.push(def);
        self
    }

    /// Register a complex type
    pub fn complex_type(mut self, ty: ComplexType) -> Self {
        self.types.register(ty);
        self
    }

    /// Finish and validate type references
    pub fn build(self) -> Result<AttributeSchema> {
        let schema = AttributeSchema {
            attributes: self.attributes,
            types: self.types,
        };
        schema.validate()?;
        Ok(schema)
    }
}
