//! MetadataTree: the addressable hierarchical value store
//!
//! ## Layout
//!
//! A tree maps attribute keys to a [`Node`]. A node is either a dense list of
//! scalar values or a dense list of nested trees. Single attributes are lists
//! of length one. Sub-trees are owned by their parent, so `clone()` is a
//! full, independent deep copy and a source tree can never alias a
//! destination.
//!
//! ## Dense Indexing
//!
//! The populated indices under a key are always `0..n`:
//! - writing at `index == n` appends, writing past `n` is rejected
//! - inserting at `i` shifts elements `>= i` up
//! - deleting `i` shifts elements `> i` down
//! - a key whose list becomes empty is removed, so `size(key) == 0` and
//!   "no content" are the same thing
//!
//! ## Access Layers
//!
//! - Raw key/index methods (`values`, `set_value`, `sub_tree`, `delete`, ...)
//!   only check the scalar-vs-sub-tree shape
//! - Path methods (`get`, `set`, `remove`, `size_at`) cross sub-tree
//!   boundaries transparently
//! - [`MetadataTree::value_at`] resolves the path against a schema
//!   [`Level`] first and hands out a kind-checked [`ValueAccessor`]

use crate::error::{Error, Result, SlotShape};
use crate::path::{PathSegment, TreePath};
use crate::schema::{Level, ScalarKind};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content stored under one attribute key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Scalar values, dense from index 0
    Scalars(Vec<Value>),
    /// Nested trees, dense from index 0
    Trees(Vec<MetadataTree>),
}

impl Node {
    /// Number of populated indices
    pub fn len(&self) -> usize {
        match self {
            Node::Scalars(v) => v.len(),
            Node::Trees(t) => t.len(),
        }
    }

    /// True when no index is populated
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn shape(&self) -> SlotShape {
        match self {
            Node::Scalars(_) => SlotShape::AnyScalar,
            Node::Trees(_) => SlotShape::SubTree,
        }
    }
}

/// Hierarchical, path-addressed metadata record
///
/// # Example
///
/// ```
/// use metalayer_core::tree::MetadataTree;
/// use metalayer_core::value::Value;
///
/// let mut tree = MetadataTree::new();
/// tree.set(&"keywords[0]".parse().unwrap(), Value::from("water")).unwrap();
/// tree.set(&"keywords[1]".parse().unwrap(), Value::from("soil")).unwrap();
/// tree.set(&"contact.email".parse().unwrap(), Value::from("a@b.c")).unwrap();
///
/// assert_eq!(tree.size("keywords"), 2);
/// tree.delete("keywords", Some(0));
/// assert_eq!(tree.value("keywords", 0), Some(&Value::from("soil")));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataTree {
    nodes: BTreeMap<String, Node>,
}

impl MetadataTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no attribute holds content
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Keys that currently hold content
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Raw node stored under `key`
    pub fn node(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Number of populated indices under `key` (0 if unset)
    pub fn size(&self, key: &str) -> usize {
        self.nodes.get(key).map_or(0, Node::len)
    }

    // =========================================================================
    // Scalars
    // =========================================================================

    /// Scalar values under `key`; empty when unset
    pub fn values(&self, key: &str) -> Result<&[Value]> {
        match self.nodes.get(key) {
            None => Ok(&[]),
            Some(Node::Scalars(v)) => Ok(v),
            Some(other) => Err(Error::mismatch(key, SlotShape::AnyScalar, other.shape())),
        }
    }

    /// Scalar value at `key[index]`
    pub fn value(&self, key: &str, index: usize) -> Option<&Value> {
        match self.nodes.get(key) {
            Some(Node::Scalars(v)) => v.get(index),
            _ => None,
        }
    }

    /// Write a scalar at `key[index]`
    ///
    /// Replaces an existing element or appends when `index == size(key)`.
    pub fn set_value(&mut self, key: &str, index: usize, value: Value) -> Result<()> {
        let values = self.scalars_mut(key)?;
        let len = values.len();
        if index < len {
            values[index] = value;
        } else if index == len {
            values.push(value);
        } else {
            self.prune(key);
            return Err(Error::out_of_bounds(key, index, len));
        }
        Ok(())
    }

    /// Insert scalars at `at`, shifting elements `>= at` upward
    pub fn insert_values(&mut self, key: &str, at: usize, values: Vec<Value>) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let existing = self.scalars_mut(key)?;
        if at > existing.len() {
            let len = existing.len();
            self.prune(key);
            return Err(Error::out_of_bounds(key, at, len));
        }
        existing.splice(at..at, values);
        Ok(())
    }

    /// Replace all scalars under `key`; an empty list removes the key
    pub fn replace_values(&mut self, key: &str, values: Vec<Value>) -> Result<()> {
        if let Some(Node::Trees(_)) = self.nodes.get(key) {
            return Err(Error::mismatch(key, SlotShape::AnyScalar, SlotShape::SubTree));
        }
        if values.is_empty() {
            self.nodes.remove(key);
        } else {
            self.nodes.insert(key.to_string(), Node::Scalars(values));
        }
        Ok(())
    }

    fn scalars_mut(&mut self, key: &str) -> Result<&mut Vec<Value>> {
        let node = self
            .nodes
            .entry(key.to_string())
            .or_insert_with(|| Node::Scalars(Vec::new()));
        match node {
            Node::Scalars(v) => Ok(v),
            Node::Trees(_) => Err(Error::mismatch(key, SlotShape::AnyScalar, SlotShape::SubTree)),
        }
    }

    // =========================================================================
    // Sub-trees
    // =========================================================================

    /// Nested trees under `key`; empty when unset
    pub fn trees(&self, key: &str) -> Result<&[MetadataTree]> {
        match self.nodes.get(key) {
            None => Ok(&[]),
            Some(Node::Trees(t)) => Ok(t),
            Some(other) => Err(Error::mismatch(key, SlotShape::SubTree, other.shape())),
        }
    }

    /// Nested tree at `key[index]`
    pub fn tree(&self, key: &str, index: usize) -> Option<&MetadataTree> {
        match self.nodes.get(key) {
            Some(Node::Trees(t)) => t.get(index),
            _ => None,
        }
    }

    /// Nested tree for a complex attribute, created if absent
    ///
    /// `index` selects the element of a repeated attribute (`None` means 0).
    /// A new element can only be created at `index == size(key)`.
    pub fn sub_tree(&mut self, key: &str, index: Option<usize>) -> Result<&mut MetadataTree> {
        let index = index.unwrap_or(0);
        let trees = self.trees_mut(key)?;
        let len = trees.len();
        if index == len {
            trees.push(MetadataTree::new());
        } else if index > len {
            self.prune(key);
            return Err(Error::out_of_bounds(key, index, len));
        }
        match self.nodes.get_mut(key) {
            Some(Node::Trees(t)) => Ok(&mut t[index]),
            _ => Err(Error::UnknownAttribute(key.to_string())),
        }
    }

    /// Insert sub-trees at `at`, shifting elements `>= at` upward
    pub fn insert_trees(&mut self, key: &str, at: usize, trees: Vec<MetadataTree>) -> Result<()> {
        if trees.is_empty() {
            return Ok(());
        }
        let existing = self.trees_mut(key)?;
        if at > existing.len() {
            let len = existing.len();
            self.prune(key);
            return Err(Error::out_of_bounds(key, at, len));
        }
        existing.splice(at..at, trees);
        Ok(())
    }

    fn trees_mut(&mut self, key: &str) -> Result<&mut Vec<MetadataTree>> {
        let node = self
            .nodes
            .entry(key.to_string())
            .or_insert_with(|| Node::Trees(Vec::new()));
        match node {
            Node::Trees(t) => Ok(t),
            Node::Scalars(_) => Err(Error::mismatch(key, SlotShape::SubTree, SlotShape::AnyScalar)),
        }
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Delete content under `key`
    ///
    /// With `index == None` the whole attribute goes. With `Some(i)` exactly
    /// element `i` is removed and later elements shift down by one.
    /// Returns whether anything was removed.
    pub fn delete(&mut self, key: &str, index: Option<usize>) -> bool {
        let Some(i) = index else {
            return self.nodes.remove(key).is_some();
        };
        let removed = match self.nodes.get_mut(key) {
            Some(Node::Scalars(v)) if i < v.len() => {
                v.remove(i);
                true
            }
            Some(Node::Trees(t)) if i < t.len() => {
                t.remove(i);
                true
            }
            _ => false,
        };
        self.prune(key);
        removed
    }

    /// Drop `key` if its list is empty
    fn prune(&mut self, key: &str) {
        if self.nodes.get(key).is_some_and(Node::is_empty) {
            self.nodes.remove(key);
        }
    }

    // =========================================================================
    // Path access
    // =========================================================================

    fn walk(&self, segments: &[PathSegment]) -> Option<&MetadataTree> {
        let mut current = self;
        for seg in segments {
            current = current.tree(&seg.key, seg.position())?;
        }
        Some(current)
    }

    fn walk_mut(&mut self, segments: &[PathSegment]) -> Option<&mut MetadataTree> {
        let mut current = self;
        for seg in segments {
            current = match current.nodes.get_mut(&seg.key) {
                Some(Node::Trees(t)) => t.get_mut(seg.position())?,
                _ => return None,
            };
        }
        Some(current)
    }

    fn walk_create(&mut self, segments: &[PathSegment]) -> Result<&mut MetadataTree> {
        let mut current = self;
        for seg in segments {
            current = current.sub_tree(&seg.key, seg.index)?;
        }
        Ok(current)
    }

    /// Sub-tree addressed by `path` (the root path addresses `self`)
    pub fn get_tree(&self, path: &TreePath) -> Option<&MetadataTree> {
        self.walk(path.segments())
    }

    /// Scalar addressed by `path`
    pub fn get(&self, path: &TreePath) -> Option<&Value> {
        let (last, parents) = path.split_last()?;
        self.walk(parents)?.value(&last.key, last.position())
    }

    /// Write a scalar at `path`, creating intermediate sub-trees densely
    pub fn set(&mut self, path: &TreePath, value: Value) -> Result<()> {
        let (last, parents) = path
            .split_last()
            .ok_or_else(|| Error::UnknownAttribute(String::new()))?;
        self.walk_create(parents)?
            .set_value(&last.key, last.position(), value)
    }

    /// Delete at `path` with the semantics of [`MetadataTree::delete`]
    pub fn remove(&mut self, path: &TreePath) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };
        match self.walk_mut(parents) {
            Some(tree) => tree.delete(&last.key, last.index),
            None => false,
        }
    }

    /// Number of populated indices of the attribute `path` ends in
    pub fn size_at(&self, path: &TreePath) -> usize {
        match path.split_last() {
            Some((last, parents)) => self.walk(parents).map_or(0, |t| t.size(&last.key)),
            None => 0,
        }
    }

    // =========================================================================
    // Schema-checked access
    // =========================================================================

    /// Kind-checked accessor for the scalar at `path`
    ///
    /// The path is resolved against `level`; the addressed attribute must be
    /// a scalar declared with `kind`.
    pub fn value_at(
        &mut self,
        level: Level<'_>,
        kind: ScalarKind,
        path: &TreePath,
    ) -> Result<ValueAccessor<'_>> {
        let def = level.resolve(path)?;
        match def.scalar_kind() {
            Some(declared) if declared == kind => Ok(ValueAccessor {
                tree: self,
                path: path.clone(),
                kind,
            }),
            Some(declared) => Err(Error::mismatch(
                def.key.clone(),
                SlotShape::Scalar(declared),
                SlotShape::Scalar(kind),
            )),
            None => Err(Error::mismatch(
                def.key.clone(),
                SlotShape::SubTree,
                SlotShape::Scalar(kind),
            )),
        }
    }
}

/// Handle on one scalar slot, bound to its declared kind
#[derive(Debug)]
pub struct ValueAccessor<'a> {
    tree: &'a mut MetadataTree,
    path: TreePath,
    kind: ScalarKind,
}

impl ValueAccessor<'_> {
    /// Current value, if the slot is populated
    pub fn get(&self) -> Option<&Value> {
        self.tree.get(&self.path)
    }

    /// Write `value`, which must fit the declared kind
    pub fn set(&mut self, value: Value) -> Result<()> {
        if !value.fits(self.kind) {
            let found = value.kind().map_or(SlotShape::AnyScalar, SlotShape::Scalar);
            let key = self
                .path
                .last_segment()
                .map(|s| s.key.clone())
                .unwrap_or_default();
            return Err(Error::mismatch(key, SlotShape::Scalar(self.kind), found));
        }
        self.tree.set(&self.path, value)
    }

    /// Write the kind's default if the slot is empty
    ///
    /// Never overwrites. Returns whether a value was written.
    pub fn init_default(&mut self) -> Result<bool> {
        if self.get().is_some() {
            return Ok(false);
        }
        self.set(self.kind.default_value())?;
        Ok(true)
    }

    /// Declared kind of the slot
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }
}
