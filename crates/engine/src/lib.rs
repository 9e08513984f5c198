//! Overlay and generator engine for metalayer
//!
//! This crate drives the data model from `metalayer-core`:
//! - Overlay: clear, merge, init and copy of template trees onto a resource
//! - Generators: identity-keyed regeneration of lists from external sources
//! - Config: strict/lenient schema policy and recursion limit
//!
//! The engine holds no state of its own. Trees and derived-index registries
//! are owned by the caller and passed in by reference for each operation.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod generator;
pub mod overlay;

pub use config::{EngineConfig, UnknownSchemaPolicy, CONFIG_FILE_NAME, DEFAULT_MAX_DEPTH};
pub use generator::{
    FieldDescriptor, FieldListGenerator, FieldSource, GeneratedRecord, Generator, GeneratorSet,
    ReconcileReport, Reconciler,
};
pub use overlay::{MergeSummary, Overlay};
