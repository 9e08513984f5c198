//! Reconciling generators
//!
//! A generator regenerates one repeated complex sub-tree from an external
//! source. Unlike the priority overlay, it matches old and new elements by a
//! natural identifier, so values a user entered next to generated ones
//! survive regeneration even when the element moves.
//!
//! - [`Generator`]: the capability pair `supports` / `generate`
//! - [`GeneratorSet`]: ordered collection run against one tree
//! - [`Reconciler`]: the snapshot / delete / rederive / carry-forward core
//! - [`FieldListGenerator`]: regenerates a field list from a [`FieldSource`]

mod field_list;
mod reconcile;

pub use field_list::{FieldDescriptor, FieldListGenerator, FieldSource};
pub use reconcile::{GeneratedRecord, ReconcileReport, Reconciler};

use crate::overlay::Overlay;
use metalayer_core::{MetadataTree, Result};
use tracing::debug;

/// Producer that regenerates part of a tree from an external context
///
/// The context is opaque to the engine and passed through unchanged.
pub trait Generator {
    /// External input this generator understands
    type Context: ?Sized;

    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether this generator can run for `tree` with `context`
    fn supports(&self, tree: &MetadataTree, context: &Self::Context) -> bool;

    /// Regenerate the target sub-tree of `tree`
    fn generate(
        &self,
        overlay: &Overlay<'_>,
        tree: &mut MetadataTree,
        context: &Self::Context,
    ) -> Result<()>;
}

/// Ordered set of generators sharing one context type
pub struct GeneratorSet<C: ?Sized> {
    generators: Vec<Box<dyn Generator<Context = C>>>,
}

impl<C: ?Sized> Default for GeneratorSet<C> {
    fn default() -> Self {
        GeneratorSet {
            generators: Vec::new(),
        }
    }
}

impl<C: ?Sized> GeneratorSet<C> {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a generator (builder pattern)
    pub fn with(mut self, generator: impl Generator<Context = C> + 'static) -> Self {
        self.generators.push(Box::new(generator));
        self
    }

    /// Number of generators
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    /// True when the set is empty
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Run every generator that supports `tree` and `context`, in order
    ///
    /// Returns how many generators ran. Stops at the first failure.
    pub fn run(
        &self,
        overlay: &Overlay<'_>,
        tree: &mut MetadataTree,
        context: &C,
    ) -> Result<usize> {
        let mut ran = 0;
        for generator in &self.generators {
            if !generator.supports(tree, context) {
                debug!(target: "metalayer::generator", generator = generator.name(), "Generator skipped");
                continue;
            }
            generator.generate(overlay, tree, context)?;
            ran += 1;
        }
        Ok(ran)
    }
}
