//! Placeholder initialisation and type-restricted deep copy

use super::{check_fits, Overlay};
use metalayer_core::{AttributeKind, Level, MetadataTree, Result, TreePath};

impl<'s> Overlay<'s> {
    /// Ensure every declared path of `tree` holds at least a placeholder
    ///
    /// Uses the attributes of `type_name`, or the root attributes when
    /// `None`. Scalars get their kind's default when absent; single complex
    /// attributes are created and filled; repeated complex attributes have
    /// each existing element filled. Existing values are never touched.
    pub fn init(&self, tree: &mut MetadataTree, type_name: Option<&str>) -> Result<()> {
        let level = self.schema.level(type_name)?;
        self.init_level(tree, level, 0)
    }

    fn init_level(&self, tree: &mut MetadataTree, level: Level<'s>, depth: usize) -> Result<()> {
        self.enter(depth)?;
        for def in level.attributes() {
            match &def.kind {
                AttributeKind::Scalar { value: kind } => {
                    let path = TreePath::root().key(def.key.as_str());
                    tree.value_at(level, *kind, &path)?.init_default()?;
                }
                AttributeKind::Complex { .. } => {
                    let Some(inner) = self.descend(level, def)? else {
                        continue;
                    };
                    if def.is_repeated() {
                        for index in 0..tree.size(&def.key) {
                            let element = tree.sub_tree(&def.key, Some(index))?;
                            self.init_level(element, inner, depth + 1)?;
                        }
                    } else {
                        let element = tree.sub_tree(&def.key, None)?;
                        self.init_level(element, inner, depth + 1)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Deep value copy of `source` into `destination` for one complex type
    ///
    /// Every attribute declared by `type_name` is replaced by the source's
    /// content for that key, so a declared key the source lacks is removed
    /// from `destination`. Complex attributes are copied element by element
    /// with their own type. Keys the type does not declare are left alone.
    /// Scalars that do not fit their declared kind are rejected.
    pub fn copy(
        &self,
        source: &MetadataTree,
        destination: &mut MetadataTree,
        type_name: &str,
    ) -> Result<()> {
        let level = self.schema.level(Some(type_name))?;
        self.copy_level(source, destination, level, 0)
    }

    pub(super) fn copy_level(
        &self,
        source: &MetadataTree,
        destination: &mut MetadataTree,
        level: Level<'s>,
        depth: usize,
    ) -> Result<()> {
        self.enter(depth)?;
        for def in level.attributes() {
            let key = def.key.as_str();
            match &def.kind {
                AttributeKind::Scalar { value: kind } => {
                    let values = source.values(key)?;
                    for value in values {
                        check_fits(def, *kind, value)?;
                    }
                    destination.replace_values(key, values.to_vec())?;
                }
                AttributeKind::Complex { .. } => {
                    let Some(inner) = self.descend(level, def)? else {
                        continue;
                    };
                    let elements = source.trees(key)?;
                    destination.delete(key, None);
                    for (index, element) in elements.iter().enumerate() {
                        let target = destination.sub_tree(key, Some(index))?;
                        self.copy_level(element, target, inner, depth + 1)?;
                    }
                }
            }
        }
        Ok(())
    }
}
