//! Filter self-description contracts.
//!
//! The resolver chain does not know how filters work. It only asks a
//! [`FilterLocator`] for the filter registered under a name and materializes
//! one [`Parameter`](crate::types::Parameter) per entry of the filter's
//! [`FilterDescriptor::description`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::introspection::PropertyIntrospector;

/// One query parameter a filter understands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterDescription {
    /// Target property (dot-path for nested properties).
    pub property: String,
    /// JSON type name of the value (`string`, `integer`, `boolean`...).
    #[serde(rename = "type")]
    pub value_type: String,
    /// Whether the parameter must be supplied.
    pub required: bool,
    /// Strategy name, when the filter supports several.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// Explicit JSON schema; derived from `value_type` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Whether the parameter accepts several values (`author[]=a&author[]=b`).
    pub is_collection: bool,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FilterDescription {
    /// Describes a parameter on `property` with values of `value_type`.
    pub fn new(property: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value_type: value_type.into(),
            ..Default::default()
        }
    }

    /// Returns a copy with the strategy name.
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// Returns a copy accepting several values.
    pub fn with_collection(mut self, is_collection: bool) -> Self {
        self.is_collection = is_collection;
        self
    }

    /// Returns a copy with an explicit schema.
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Returns a copy with a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Schema of the parameter value.
    pub fn resolved_schema(&self) -> Value {
        if let Some(schema) = &self.schema {
            return schema.clone();
        }
        if self.is_collection {
            serde_json::json!({
                "type": "array",
                "items": {"type": self.value_type},
            })
        } else {
            serde_json::json!({"type": self.value_type})
        }
    }
}

/// A filter able to describe the parameters it reads.
pub trait FilterDescriptor: Send + Sync {
    /// Parameters recognized for `resource_class`, keyed by wire name.
    fn description(
        &self,
        resource_class: &str,
        introspector: &dyn PropertyIntrospector,
    ) -> IndexMap<String, FilterDescription>;
}

/// Looks filters up by name.
pub trait FilterLocator: Send + Sync {
    /// Returns true if a filter is registered under `name`.
    fn has(&self, name: &str) -> bool;

    /// The filter registered under `name`.
    fn get(&self, name: &str) -> Option<&dyn FilterDescriptor>;
}

/// Locator with nothing registered.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilters;

impl FilterLocator for NoFilters {
    fn has(&self, _name: &str) -> bool {
        false
    }

    fn get(&self, _name: &str) -> Option<&dyn FilterDescriptor> {
        None
    }
}
