//! Metalayer - schema-driven hierarchical metadata with template overlays
//!
//! A resource's metadata is a [`MetadataTree`] validated against an
//! [`AttributeSchema`]. Template trees are layered onto it by the
//! [`Overlay`] engine, which records the positions it owns in a
//! [`DerivedIndexRegistry`] so a later pass can retract exactly those and
//! nothing the user entered. [`Generator`]s regenerate list-shaped parts of a
//! tree from external sources while keeping user values by identity.
//!
//! # Quick Start
//!
//! ```ignore
//! use metalayer::{AttributeDef, AttributeSchema, DerivedIndexRegistry, EngineConfig,
//!     MetadataTree, Overlay, ScalarKind};
//!
//! let schema = AttributeSchema::builder()
//!     .attribute(AttributeDef::scalar("tags", ScalarKind::Text).repeated())
//!     .build()?;
//! let overlay = Overlay::new(&schema, EngineConfig::default());
//!
//! let mut resource = MetadataTree::new();
//! let mut registry = DerivedIndexRegistry::new();
//! overlay.merge(&mut resource, &[template], &mut registry)?;
//! ```

pub use metalayer_core::*;
pub use metalayer_engine::*;
