//! Filterable and sortable inputs recognized on an operation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// Query string (default).
    #[default]
    Query,
    /// Request header.
    Header,
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
        }
    }
}

/// One input recognized on an operation.
///
/// The key is the wire name and may contain the `:property` placeholder,
/// expanded once per described property during resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Parameter {
    /// Wire name (`title`, `order[title]`, `order[:property]`).
    pub key: String,
    /// Query string or header.
    pub location: ParameterLocation,
    /// Target field, possibly nested (`author.name`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    /// Name of the filter strategy bound to this parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    /// JSON schema constraining the value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Whether the parameter must be supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    /// Creates a query parameter.
    pub fn query(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Creates a header parameter.
    pub fn header(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            location: ParameterLocation::Header,
            ..Default::default()
        }
    }

    /// Returns a copy targeting `property`.
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Returns a copy bound to the filter `name`.
    pub fn with_filter(mut self, name: impl Into<String>) -> Self {
        self.filter = Some(name.into());
        self
    }

    /// Returns a copy with a schema.
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Returns a copy with the required flag.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    /// Returns a copy with a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns true if the key still holds the `:property` placeholder.
    pub fn is_pattern(&self) -> bool {
        self.key.contains(":property")
    }

    /// Returns the key with the placeholder replaced by `property`.
    pub fn expand_key(&self, property: &str) -> String {
        self.key.replace(":property", property)
    }

    /// Fills every unset field from `base`, keeping the fields set here.
    pub fn merged_over(self, base: &Parameter) -> Parameter {
        Parameter {
            key: self.key,
            location: self.location,
            property: self.property.or_else(|| base.property.clone()),
            filter: self.filter.or_else(|| base.filter.clone()),
            schema: self.schema.or_else(|| base.schema.clone()),
            required: self.required.or(base.required),
            description: self.description.or_else(|| base.description.clone()),
        }
    }
}

/// Ordered set of parameters keyed by `(key, location)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(Vec<Parameter>);

impl Parameters {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Looks up a parameter by key and location.
    pub fn get(&self, key: &str, location: ParameterLocation) -> Option<&Parameter> {
        self.0
            .iter()
            .find(|p| p.key == key && p.location == location)
    }

    /// Inserts a parameter, replacing any parameter with the same identity
    /// in place so the original position is kept.
    pub fn add(&mut self, parameter: Parameter) {
        match self
            .0
            .iter_mut()
            .find(|p| p.key == parameter.key && p.location == parameter.location)
        {
            Some(existing) => *existing = parameter,
            None => self.0.push(parameter),
        }
    }

    /// Returns a copy with `parameter` added.
    pub fn with(mut self, parameter: Parameter) -> Self {
        self.add(parameter);
        self
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.0.iter()
    }
}

impl FromIterator<Parameter> for Parameters {
    fn from_iter<T: IntoIterator<Item = Parameter>>(iter: T) -> Self {
        let mut parameters = Parameters::new();
        for parameter in iter {
            parameters.add(parameter);
        }
        parameters
    }
}

impl IntoIterator for Parameters {
    type Item = Parameter;
    type IntoIter = std::vec::IntoIter<Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = &'a Parameter;
    type IntoIter = std::slice::Iter<'a, Parameter>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
