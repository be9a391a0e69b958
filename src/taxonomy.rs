//! Attribute taxonomy builder.
//!
//! While a source document is scanned, [`ClassCatalog`] collects the classes it
//! mentions and discovers their attribute groups from the raw attribute data of
//! each record. Whether a group is multiselect is decided by the shape of its
//! first value and frozen from then on.

use indexmap::IndexMap;
use serde_json::Value;

use crate::color_utils::{self, Palette};
use crate::model::{AnnotationClass, InstanceAttribute, Selection};

/// Classes of one conversion run, keyed by name in order of first appearance.
#[derive(Debug, Clone)]
pub struct ClassCatalog {
    classes: IndexMap<String, AnnotationClass>,
    palette: Palette,
}

impl ClassCatalog {
    /// Create an empty catalog drawing class colors from `palette`.
    pub fn new(palette: Palette) -> Self {
        Self {
            classes: IndexMap::new(),
            palette,
        }
    }

    /// Return the id of the named class, creating it if needed.
    ///
    /// A new class takes `color` when it is a valid color, otherwise the next
    /// palette color. An existing class keeps its color.
    pub fn ensure_class(&mut self, name: &str, color: Option<&str>) -> u32 {
        if let Some(class) = self.classes.get(name) {
            return class.id;
        }

        let id = self.classes.len() as u32 + 1;
        let class = match color.and_then(color_utils::normalize_hex) {
            Some(color) => {
                self.palette.reserve(&color);
                AnnotationClass::new(id, name, color)
            }
            None => AnnotationClass::with_palette(id, name, &mut self.palette),
        };
        log::debug!("Created class '{}' (id {}, color {})", name, id, class.color);
        self.classes.insert(name.to_string(), class);
        id
    }

    /// Record the attribute data of one record of class `class_name`.
    ///
    /// Each candidate is a `(group name, value)` pair. Unknown groups are
    /// created with the selection implied by the value; attribute names are
    /// added to their group once. Returns the references to attach to the
    /// instance being built, in candidate order.
    pub fn observe(&mut self, class_name: &str, candidates: &[(String, Value)]) -> Vec<InstanceAttribute> {
        if candidates.is_empty() {
            return Vec::new();
        }
        self.ensure_class(class_name, None);
        let Some(class) = self.classes.get_mut(class_name) else {
            return Vec::new();
        };

        let mut referenced = Vec::new();
        for (group_name, value) in candidates {
            let names = attribute_names(value);
            if group_name.is_empty() || names.is_empty() {
                continue;
            }

            let (group, created) = class.group_or_insert(group_name, Selection::of_value(value));
            if created {
                log::debug!(
                    "Created attribute group '{}' on class '{}' (multiselect: {})",
                    group_name,
                    class_name,
                    group.selection.is_multi()
                );
            }
            for name in names {
                group.add_attribute(&name);
                let reference = InstanceAttribute::new(name, group_name.as_str());
                if !referenced.contains(&reference) {
                    referenced.push(reference);
                }
            }
        }
        referenced
    }

    /// Merge the classes of another catalog into this one.
    ///
    /// Classes and groups are united by name and attribute sets by union. Where
    /// both catalogs know a group, this catalog's selection is kept, so merging
    /// in document order preserves the first observation. Classes new to this
    /// catalog get fresh ids after the existing ones.
    pub fn merge(&mut self, other: ClassCatalog) {
        for (name, other_class) in other.classes {
            self.ensure_class(&name, Some(&other_class.color));
            let Some(class) = self.classes.get_mut(&name) else {
                continue;
            };
            for other_group in &other_class.attribute_groups {
                let (group, _) = class.group_or_insert(&other_group.name, other_group.selection);
                group.union(other_group);
            }
        }
    }

    /// Look up a class by name.
    pub fn get(&self, name: &str) -> Option<&AnnotationClass> {
        self.classes.get(name)
    }

    /// Classes in order of first appearance.
    pub fn classes(&self) -> impl Iterator<Item = &AnnotationClass> {
        self.classes.values()
    }

    /// Consume the catalog, returning the classes in order of first appearance.
    pub fn into_classes(self) -> Vec<AnnotationClass> {
        self.classes.into_values().collect()
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Check if no class has been created.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Total number of attribute groups over all classes.
    pub fn group_count(&self) -> usize {
        self.classes.values().map(|c| c.attribute_groups.len()).sum()
    }
}

impl Default for ClassCatalog {
    fn default() -> Self {
        Self::new(Palette::default())
    }
}

/// Attribute names carried by one raw value.
///
/// A mapping contributes its keys, a sequence its scalar elements, and a
/// scalar itself. Strings are used verbatim, numbers and booleans as their
/// JSON text; nulls and empty strings contribute nothing.
fn attribute_names(value: &Value) -> Vec<String> {
    let mut names: Vec<String> = match value {
        Value::Object(map) => map.keys().cloned().collect(),
        Value::Array(items) => items.iter().filter_map(scalar_name).collect(),
        scalar => scalar_name(scalar).into_iter().collect(),
    };
    names.retain(|n| !n.is_empty());
    names
}

fn scalar_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
