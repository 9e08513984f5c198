//! Priority overlay merge and derived-position retraction

use super::{check_fits, Overlay};
use metalayer_core::{AttributeKind, DerivedIndexRegistry, Level, MetadataTree, Result};
use tracing::{debug, warn};

/// Outcome of one [`Overlay::merge`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeSummary {
    /// Number of source trees merged
    pub sources: usize,
    /// Derived positions removed before merging
    pub cleared: usize,
    /// Derived positions recorded after merging
    pub derived: usize,
}

impl<'s> Overlay<'s> {
    /// Retract every template-owned position from `destination`
    ///
    /// Repeated attributes lose exactly their registered indices, deleted
    /// from the highest index down so earlier deletions never shift a later
    /// target. Single attributes are removed whole. The registry is empty
    /// afterwards. Returns the number of positions removed.
    pub fn clear_derived(
        &self,
        destination: &mut MetadataTree,
        registry: &mut DerivedIndexRegistry,
    ) -> Result<usize> {
        let root = self.schema.root();
        let mut removed = 0;

        for key in registry.keys() {
            let def = match root.find(key) {
                Ok(def) => def,
                Err(e) if self.config.is_lenient() => {
                    warn!(target: "metalayer::schema", key = %key, error = %e, "Dropping derived entry for unknown attribute");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if def.is_repeated() {
                let mut indices = registry.indices(key).to_vec();
                indices.sort_unstable_by(|a, b| b.cmp(a));
                indices.dedup();
                for index in indices {
                    if destination.delete(key, Some(index)) {
                        removed += 1;
                    }
                }
            } else if destination.delete(key, None) {
                removed += 1;
            }
            debug!(target: "metalayer::derived", key = %key, "Derived positions cleared");
        }

        registry.clear();
        Ok(removed)
    }

    /// Overlay `sources` onto `destination`
    ///
    /// `sources` is in descending priority (index 0 wins). Prior derived
    /// content is retracted first, then sources are applied lowest priority
    /// first so that later passes overwrite singles and append after earlier
    /// template blocks in repeated attributes. User content always trails
    /// the template block.
    pub fn merge(
        &self,
        destination: &mut MetadataTree,
        sources: &[MetadataTree],
        registry: &mut DerivedIndexRegistry,
    ) -> Result<MergeSummary> {
        let cleared = self.clear_derived(destination, registry)?;
        let root = self.schema.root();

        for (priority, source) in sources.iter().enumerate().rev() {
            let written = self.merge_level(destination, source, root, Some(&mut *registry), 0)?;
            debug!(target: "metalayer::merge", priority, written, "Source merged");
        }

        let summary = MergeSummary {
            sources: sources.len(),
            cleared,
            derived: registry.len(),
        };
        debug!(
            target: "metalayer::merge",
            sources = summary.sources,
            cleared = summary.cleared,
            derived = summary.derived,
            "Merge complete"
        );
        Ok(summary)
    }

    /// Merge one `source` into `destination` without derived tracking
    ///
    /// Uses the attributes of `type_name`, or the root attributes when
    /// `None`. Behaves like a single pass of [`Overlay::merge`] with an empty
    /// registry. Returns the number of positions written.
    pub fn merge_single(
        &self,
        destination: &mut MetadataTree,
        source: &MetadataTree,
        type_name: Option<&str>,
    ) -> Result<usize> {
        let level = self.schema.level(type_name)?;
        self.merge_level(destination, source, level, None, 0)
    }

    fn merge_level(
        &self,
        destination: &mut MetadataTree,
        source: &MetadataTree,
        level: Level<'s>,
        mut registry: Option<&mut DerivedIndexRegistry>,
        depth: usize,
    ) -> Result<usize> {
        self.enter(depth)?;
        let mut written = 0;

        for def in level.attributes() {
            let key = def.key.as_str();
            // Derived count so far in this merge call for the key.
            let offset = registry.as_deref().map_or(0, |r| r.indices(key).len());

            let positions = match &def.kind {
                AttributeKind::Scalar { value: kind } if def.is_repeated() => {
                    let incoming = source.values(key)?;
                    for value in incoming {
                        check_fits(def, *kind, value)?;
                    }
                    destination.insert_values(key, offset, incoming.to_vec())?;
                    offset..offset + incoming.len()
                }
                AttributeKind::Scalar { value: kind } => {
                    match source.value(key, 0).filter(|v| !v.is_null()) {
                        Some(value) => {
                            check_fits(def, *kind, value)?;
                            destination.set_value(key, 0, value.clone())?;
                            0..1
                        }
                        None => 0..0,
                    }
                }
                AttributeKind::Complex { .. } => {
                    let Some(inner) = self.descend(level, def)? else {
                        continue;
                    };
                    let incoming = source.trees(key)?;
                    if def.is_repeated() {
                        let mut fresh = Vec::with_capacity(incoming.len());
                        for element in incoming {
                            let mut tree = MetadataTree::new();
                            self.copy_level(element, &mut tree, inner, depth + 1)?;
                            fresh.push(tree);
                        }
                        destination.insert_trees(key, offset, fresh)?;
                        offset..offset + incoming.len()
                    } else {
                        match incoming.first().filter(|t| !t.is_empty()) {
                            Some(element) => {
                                destination.delete(key, None);
                                let target = destination.sub_tree(key, None)?;
                                self.copy_level(element, target, inner, depth + 1)?;
                                0..1
                            }
                            None => 0..0,
                        }
                    }
                }
            };

            written += positions.len();
            if let Some(registry) = registry.as_deref_mut() {
                registry.mark_derived(key, positions);
            }
        }

        Ok(written)
    }
}
