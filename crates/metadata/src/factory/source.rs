//! Declarative resource definitions.

use indexmap::IndexMap;

use crate::introspection::ResourceClassifier;
use crate::types::ResourceDescriptor;

/// Supplies the declared (unresolved) descriptors of resource classes.
///
/// Implementations own the source of truth: attributes, configuration files,
/// builder calls. The resolver chain only sees the resulting descriptors.
pub trait ResourceSource: Send + Sync {
    /// Declared descriptors of `class`, `None` when it is not a resource.
    fn declared(&self, class: &str) -> Option<Vec<ResourceDescriptor>>;

    /// Every class with at least one declared descriptor.
    fn resource_classes(&self) -> Vec<String>;
}

/// Resource definitions held in memory, in registration order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceSource {
    resources: IndexMap<String, Vec<ResourceDescriptor>>,
}

impl InMemoryResourceSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with one more descriptor for `class`.
    pub fn with_resource(mut self, class: impl Into<String>, descriptor: ResourceDescriptor) -> Self {
        self.add(class, descriptor);
        self
    }

    /// Declares one more descriptor for `class`.
    ///
    /// A class may be exposed through several descriptors, each with its own
    /// operations.
    pub fn add(&mut self, class: impl Into<String>, descriptor: ResourceDescriptor) {
        self.resources.entry(class.into()).or_default().push(descriptor);
    }

    /// Number of resource classes.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true when nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl ResourceSource for InMemoryResourceSource {
    fn declared(&self, class: &str) -> Option<Vec<ResourceDescriptor>> {
        self.resources
            .get(class)
            .filter(|descriptors| !descriptors.is_empty())
            .cloned()
    }

    fn resource_classes(&self) -> Vec<String> {
        self.resources.keys().cloned().collect()
    }
}

impl ResourceClassifier for InMemoryResourceSource {
    fn is_resource_class(&self, class: &str) -> bool {
        self.resources.contains_key(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_in_order() {
        let source = InMemoryResourceSource::new()
            .with_resource("Book", ResourceDescriptor::new("Book"))
            .with_resource("Author", ResourceDescriptor::new("Author"))
            .with_resource("Book", ResourceDescriptor::new("Book").with_short_name("Novel"));

        assert_eq!(source.len(), 2);
        assert_eq!(source.resource_classes(), vec!["Book", "Author"]);
        assert_eq!(source.declared("Book").map(|d| d.len()), Some(2));
        assert!(source.declared("Publisher").is_none());
        assert!(source.is_resource_class("Author"));
        assert!(!source.is_resource_class("Publisher"));
    }
}
