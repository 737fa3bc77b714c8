//! In-memory class catalog.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{PropertyIntrospector, PropertyMetadata};

/// Properties of one class, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassDefinition {
    /// Property metadata by name.
    pub properties: IndexMap<String, PropertyMetadata>,
}

impl ClassDefinition {
    /// Creates an empty definition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with one more property.
    pub fn property(mut self, name: impl Into<String>, metadata: PropertyMetadata) -> Self {
        self.properties.insert(name.into(), metadata);
        self
    }
}

/// Class definitions keyed by class name.
///
/// Typically deserialized from the `classes` section of a catalog file:
///
/// ```
/// use meridian_metadata::introspection::{ClassCatalog, PropertyIntrospector};
///
/// let catalog: ClassCatalog = serde_json::from_value(serde_json::json!({
///     "Book": {"properties": {
///         "id": {"identifier": true, "types": [{"type": "int"}]},
///         "title": {"types": [{"type": "string"}]}
///     }}
/// })).unwrap();
///
/// assert_eq!(catalog.list_properties("Book"), vec!["id", "title"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassCatalog {
    classes: IndexMap<String, ClassDefinition>,
}

impl ClassCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with one more class.
    pub fn with_class(mut self, class: impl Into<String>, definition: ClassDefinition) -> Self {
        self.classes.insert(class.into(), definition);
        self
    }

    /// Registers a class, replacing any previous definition.
    pub fn insert(&mut self, class: impl Into<String>, definition: ClassDefinition) {
        self.classes.insert(class.into(), definition);
    }

    /// Looks up a class.
    pub fn class(&self, class: &str) -> Option<&ClassDefinition> {
        self.classes.get(class)
    }

    /// Iterates class names in registration order.
    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

impl PropertyIntrospector for ClassCatalog {
    fn list_properties(&self, class: &str) -> Vec<String> {
        self.classes
            .get(class)
            .map(|def| def.properties.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn describe_property(&self, class: &str, property: &str) -> Option<PropertyMetadata> {
        self.classes
            .get(class)
            .and_then(|def| def.properties.get(property))
            .cloned()
    }
}
