//! Error types for metalayer
//!
//! This module defines the error taxonomy shared by the tree, the schema
//! registry and the overlay engine.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! None of these errors are transient. Every variant points at a caller or
//! configuration defect, so nothing here is retried internally.

use crate::path::PathParseError;
use crate::schema::ScalarKind;
use thiserror::Error;

/// Result type alias for metalayer operations
pub type Result<T> = std::result::Result<T, Error>;

/// What a tree slot holds, used in mismatch reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotShape {
    /// A scalar of the given kind
    Scalar(ScalarKind),
    /// Scalar content whose kind is not pinned (raw tree access)
    AnyScalar,
    /// A nested sub-tree
    SubTree,
}

impl std::fmt::Display for SlotShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotShape::Scalar(kind) => write!(f, "{}", kind),
            SlotShape::AnyScalar => write!(f, "scalar"),
            SlotShape::SubTree => write!(f, "sub-tree"),
        }
    }
}

/// Error types for metalayer
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Accessor kind or written value disagrees with the declared kind
    #[error("schema mismatch at '{key}': expected {expected}, found {found}")]
    SchemaMismatch {
        /// Attribute key where the mismatch was detected
        key: String,
        /// Shape declared by the schema (or requested by the caller)
        expected: SlotShape,
        /// Shape actually found
        found: SlotShape,
    },

    /// A type name has no registered complex type
    #[error("unknown complex type: {0}")]
    UnknownType(String),

    /// A key is absent from the schema level in use
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    /// Index would open a gap or addresses a missing element
    #[error("index out of bounds at '{key}': {index} > {len}")]
    IndexOutOfBounds {
        /// Attribute key
        key: String,
        /// Requested index
        index: usize,
        /// Current number of populated indices
        len: usize,
    },

    /// Recursion through complex types went past the configured depth
    #[error("nesting depth {depth} exceeds maximum of {max} levels")]
    NestingTooDeep {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// Textual path could not be parsed
    #[error("path parse error: {0}")]
    PathParse(#[from] PathParseError),

    /// Engine configuration could not be read or is invalid
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Build a `SchemaMismatch` for `key`
    pub fn mismatch(key: impl Into<String>, expected: SlotShape, found: SlotShape) -> Self {
        Error::SchemaMismatch {
            key: key.into(),
            expected,
            found,
        }
    }

    /// Build an `IndexOutOfBounds` for `key`
    pub fn out_of_bounds(key: impl Into<String>, index: usize, len: usize) -> Self {
        Error::IndexOutOfBounds {
            key: key.into(),
            index,
            len,
        }
    }

    /// True for errors caused by schema drift (unknown type or attribute)
    pub fn is_schema_drift(&self) -> bool {
        matches!(self, Error::UnknownType(_) | Error::UnknownAttribute(_))
    }
}
