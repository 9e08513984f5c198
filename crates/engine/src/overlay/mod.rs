//! Overlay merge engine
//!
//! Combines prioritized template trees with a resource's own tree while
//! keeping track of which top-level positions the templates own.
//!
//! ## Operations
//!
//! - [`Overlay::clear_derived`]: retract all template-owned positions
//! - [`Overlay::merge`]: recompute the overlay from N templates
//! - [`Overlay::merge_single`]: one source, no registry, any schema level
//! - [`Overlay::init`]: guarantee a placeholder at every declared path
//! - [`Overlay::copy`]: deep value copy restricted to one complex type
//!
//! ## Ownership Model
//!
//! Only direct attributes of the resource tree are tracked in the
//! [`DerivedIndexRegistry`](metalayer_core::DerivedIndexRegistry). Once a
//! merge pass writes a complex sub-tree, the whole sub-tree belongs to that
//! pass; nested positions never get their own entries.
//!
//! ## Failure
//!
//! Everything is synchronous in-memory work. A failing step leaves the
//! destination and registry in their partially updated state; callers that
//! need all-or-nothing behaviour merge into a clone and swap it in.

mod init;
mod merge;

pub use merge::MergeSummary;

use crate::config::EngineConfig;
use metalayer_core::{AttributeDef, AttributeSchema, Error, Level, Result, ScalarKind, SlotShape, Value};
use tracing::warn;

/// Reject a source value that does not fit the declared kind
fn check_fits(def: &AttributeDef, kind: ScalarKind, value: &Value) -> Result<()> {
    if value.fits(kind) {
        return Ok(());
    }
    let found = value.kind().map_or(SlotShape::AnyScalar, SlotShape::Scalar);
    Err(Error::mismatch(def.key.clone(), SlotShape::Scalar(kind), found))
}

/// Overlay engine bound to one schema snapshot
#[derive(Debug, Clone)]
pub struct Overlay<'s> {
    schema: &'s AttributeSchema,
    config: EngineConfig,
}

impl<'s> Overlay<'s> {
    /// Create an engine for `schema`
    pub fn new(schema: &'s AttributeSchema, config: EngineConfig) -> Self {
        Overlay { schema, config }
    }

    /// The schema this engine validates against
    pub fn schema(&self) -> &'s AttributeSchema {
        self.schema
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fail once recursion goes past `max_depth`
    fn enter(&self, depth: usize) -> Result<()> {
        if depth > self.config.max_depth {
            return Err(Error::NestingTooDeep {
                depth,
                max: self.config.max_depth,
            });
        }
        Ok(())
    }

    /// Level of a complex attribute, or `None` when lenient and unresolvable
    fn descend(&self, level: Level<'s>, def: &AttributeDef) -> Result<Option<Level<'s>>> {
        match level.descend(def) {
            Ok(inner) => Ok(Some(inner)),
            Err(Error::UnknownType(type_name)) if self.config.is_lenient() => {
                warn!(
                    target: "metalayer::schema",
                    key = %def.key,
                    type_name = %type_name,
                    "Skipping attribute with unknown complex type"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
