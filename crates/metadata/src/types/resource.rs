//! Resource descriptors.

use serde::{Deserialize, Serialize};

use super::link::Link;
use super::operation::{ExtraProperties, Formats, Operation, OperationKind};
use super::parameter::Parameters;

/// The resolved metadata of one resource: its operations plus the
/// resource-level defaults they fall back to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceDescriptor {
    /// Resource class.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Short name (defaults to the last segment of the class name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Prefix prepended to every operation template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_prefix: Option<String>,
    /// HTTP operations. `None` means "synthesize the defaults"; an empty list
    /// exposes no HTTP operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations: Option<Vec<Operation>>,
    /// GraphQL operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphql_operations: Option<Vec<Operation>>,
    /// Default formats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formats: Option<Formats>,
    /// Default request body formats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_formats: Option<Formats>,
    /// Default response formats.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_formats: Option<Formats>,
    /// Filters applied to every operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<String>>,
    /// Parameters applied to every operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
    /// Default access control expression.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    /// Default access denied message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_message: Option<String>,
    /// Default provider reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Default processor reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor: Option<String>,
    /// Default pagination switch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination_enabled: Option<bool>,
    /// Default page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination_items_per_page: Option<u64>,
    /// Default maximum page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination_maximum_items_per_page: Option<u64>,
    /// Vendor extensions merged into every operation.
    #[serde(skip_serializing_if = "ExtraProperties::is_empty")]
    pub extra_properties: ExtraProperties,
    /// Relation links inferred from the class properties.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

impl ResourceDescriptor {
    /// Creates a descriptor for `class` with nothing declared.
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            ..Default::default()
        }
    }

    /// Returns a copy with the given short name.
    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }

    /// Returns a copy with the given route prefix.
    pub fn with_route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = Some(prefix.into());
        self
    }

    /// Returns a copy with the given HTTP operations.
    pub fn with_operations(mut self, operations: Vec<Operation>) -> Self {
        self.operations = Some(operations);
        self
    }

    /// Returns a copy with the given GraphQL operations.
    pub fn with_graphql_operations(mut self, operations: Vec<Operation>) -> Self {
        self.graphql_operations = Some(operations);
        self
    }

    /// Returns a copy declaring the given filters.
    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = Some(filters.into_iter().map(Into::into).collect());
        self
    }

    /// Returns a copy with the given parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Returns a copy with the given formats.
    pub fn with_formats(mut self, formats: Formats) -> Self {
        self.formats = Some(formats);
        self
    }

    /// Returns a copy with the given security expression.
    pub fn with_security(mut self, security: impl Into<String>) -> Self {
        self.security = Some(security.into());
        self
    }

    /// HTTP operations, empty when none are declared yet.
    pub fn operations(&self) -> &[Operation] {
        self.operations.as_deref().unwrap_or(&[])
    }

    /// GraphQL operations, empty when none are declared yet.
    pub fn graphql_operations(&self) -> &[Operation] {
        self.graphql_operations.as_deref().unwrap_or(&[])
    }

    /// Finds an HTTP operation by name.
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations()
            .iter()
            .find(|op| op.name.as_deref() == Some(name))
    }

    /// Returns true if the resource declares an item read.
    pub fn has_item_read(&self) -> bool {
        self.operations()
            .iter()
            .any(|op| matches!(op.kind, OperationKind::Get | OperationKind::NotExposed))
    }

    /// Returns true when the only operations are not exposed.
    pub fn is_not_exposed(&self) -> bool {
        !self.operations().is_empty()
            && self
                .operations()
                .iter()
                .all(|op| op.kind == OperationKind::NotExposed)
    }
}

/// All descriptors declared for one class, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptorCollection {
    /// The class the descriptors belong to.
    pub class: String,
    /// The descriptors.
    pub resources: Vec<ResourceDescriptor>,
}

impl ResourceDescriptorCollection {
    /// Creates a collection.
    pub fn new(class: impl Into<String>, resources: Vec<ResourceDescriptor>) -> Self {
        Self {
            class: class.into(),
            resources,
        }
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true when no descriptor is declared.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterates the descriptors.
    pub fn iter(&self) -> std::slice::Iter<'_, ResourceDescriptor> {
        self.resources.iter()
    }

    /// Returns a new collection with `f` applied to every descriptor.
    pub fn try_map<E, F>(self, mut f: F) -> Result<Self, E>
    where
        F: FnMut(ResourceDescriptor) -> Result<ResourceDescriptor, E>,
    {
        let resources = self
            .resources
            .into_iter()
            .map(&mut f)
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Self {
            class: self.class,
            resources,
        })
    }

    /// Finds an HTTP operation by name across every descriptor.
    ///
    /// With `None`, returns the first item read (or the first collection read
    /// when `collection` is set).
    pub fn operation(&self, name: Option<&str>, collection: bool) -> Option<&Operation> {
        let mut operations = self.resources.iter().flat_map(|r| r.operations().iter());
        match name {
            Some(name) => operations.find(|op| op.name.as_deref() == Some(name)),
            None if collection => operations.find(|op| op.kind == OperationKind::GetCollection),
            None => operations.find(|op| op.kind == OperationKind::Get),
        }
    }

    /// Finds a GraphQL operation by name across every descriptor.
    pub fn graphql_operation(&self, name: &str) -> Option<&Operation> {
        self.resources
            .iter()
            .flat_map(|r| r.graphql_operations().iter())
            .find(|op| op.name.as_deref() == Some(name))
    }
}

impl IntoIterator for ResourceDescriptorCollection {
    type Item = ResourceDescriptor;
    type IntoIter = std::vec::IntoIter<ResourceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.into_iter()
    }
}
