//! Core types for metalayer
//!
//! This crate defines the data model the overlay engine operates on:
//! - Value: scalar leaf payloads
//! - TreePath / PathSegment: addressing into a tree
//! - AttributeSchema / ComplexType / TypeRegistry: the external schema
//! - MetadataTree: dense, path-addressed hierarchical value store
//! - DerivedIndexRegistry: template-owned positions per top-level key
//! - Error: error taxonomy shared by every layer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod derived;
pub mod error;
pub mod path;
pub mod schema;
pub mod tree;
pub mod value;

pub use derived::DerivedIndexRegistry;
pub use error::{Error, Result, SlotShape};
pub use path::{PathParseError, PathSegment, TreePath, MAX_PATH_LENGTH};
pub use schema::{
    AttributeDef, AttributeKind, AttributeSchema, AttributeSet, Cardinality, ComplexType, Level,
    ScalarKind, SchemaBuilder, TypeRegistry,
};
pub use tree::{MetadataTree, Node, ValueAccessor};
pub use value::Value;
