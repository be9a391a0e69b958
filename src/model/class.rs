//! Annotation classes and their attribute taxonomy.

use serde::{Deserialize, Serialize};

use crate::color_utils::Palette;

/// One selectable attribute inside an [`AttributeGroup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name, unique within its group.
    pub name: String,
}

impl Attribute {
    /// Create a new attribute.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Whether an attribute group allows one or several attributes per instance.
///
/// Decided from the first observation of the group and never changed afterwards.
/// Serialized as the `is_multiselect` boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "bool", into = "bool")]
pub enum Selection {
    /// Exactly one attribute of the group is chosen.
    Single,
    /// Any number of attributes of the group may be chosen.
    Multi,
}

impl Selection {
    /// Selection implied by the shape of a source value: composites are multiselect.
    pub fn of_value(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Selection::Multi,
            _ => Selection::Single,
        }
    }

    /// Check if this is a multiselect group.
    pub fn is_multi(&self) -> bool {
        matches!(self, Selection::Multi)
    }
}

impl From<bool> for Selection {
    fn from(is_multiselect: bool) -> Self {
        if is_multiselect {
            Selection::Multi
        } else {
            Selection::Single
        }
    }
}

impl From<Selection> for bool {
    fn from(selection: Selection) -> Self {
        selection.is_multi()
    }
}

/// A named bucket of attributes under a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeGroup {
    /// Group name, unique within its class.
    pub name: String,

    /// Single- or multi-select.
    #[serde(rename = "is_multiselect")]
    pub selection: Selection,

    /// Attributes in order of first appearance.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl AttributeGroup {
    /// Create an empty group.
    pub fn new(name: impl Into<String>, selection: Selection) -> Self {
        Self {
            name: name.into(),
            selection,
            attributes: Vec::new(),
        }
    }

    /// Check if the group already holds an attribute with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Append an attribute unless one with the same name exists.
    ///
    /// Returns true if the attribute was added.
    pub fn add_attribute(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.attributes.push(Attribute::new(name));
        true
    }

    /// Add every attribute of `other` that this group lacks. The selection is kept.
    pub fn union(&mut self, other: &AttributeGroup) {
        for attribute in &other.attributes {
            self.add_attribute(&attribute.name);
        }
    }
}

/// An annotation class with its color and attribute taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationClass {
    /// Identifier, assigned in order of first appearance within a run.
    pub id: u32,

    /// Class name, the identity of the class within a run.
    pub name: String,

    /// Color as `#rrggbb`.
    pub color: String,

    /// Attribute groups, unique by name.
    #[serde(default)]
    pub attribute_groups: Vec<AttributeGroup>,
}

impl AnnotationClass {
    /// Create a class with no attribute groups.
    pub fn new(id: u32, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: color.into(),
            attribute_groups: Vec::new(),
        }
    }

    /// Create a class colored from the palette.
    pub fn with_palette(id: u32, name: impl Into<String>, palette: &mut Palette) -> Self {
        Self::new(id, name, palette.next_color())
    }

    /// Look up a group by name.
    pub fn group(&self, name: &str) -> Option<&AttributeGroup> {
        self.attribute_groups.iter().find(|g| g.name == name)
    }

    /// Return the named group, creating it with `selection` if it does not exist.
    ///
    /// The boolean is true when the group was created by this call.
    pub fn group_or_insert(&mut self, name: &str, selection: Selection) -> (&mut AttributeGroup, bool) {
        match self.attribute_groups.iter().position(|g| g.name == name) {
            Some(idx) => (&mut self.attribute_groups[idx], false),
            None => {
                self.attribute_groups.push(AttributeGroup::new(name, selection));
                let last = self.attribute_groups.len() - 1;
                (&mut self.attribute_groups[last], true)
            }
        }
    }
}
