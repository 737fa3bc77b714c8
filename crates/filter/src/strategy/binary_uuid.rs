use indexmap::IndexMap;
use meridian_metadata::filter::{FilterDescription, FilterDescriptor};
use meridian_metadata::introspection::{PropertyIntrospector, PropertyType};
use serde_json::json;
use uuid::Uuid;

use crate::error::{FilterError, FilterResult};
use crate::property::describe_path;
use crate::sql::{JoinType, Predicate, SqlParam};
use crate::value::FilterValue;

use super::{
    EngineCapabilities, FilterContext, FilterStrategy, is_enabled, non_empty_values,
    selected_properties,
};

/// Equality on UUID properties stored as 16-byte binaries.
#[derive(Debug, Clone)]
pub struct UuidFilter {
    properties: Vec<String>,
}

impl UuidFilter {
    /// Filter on `properties`, or on every UUID property when empty.
    ///
    /// Fails when the storage engine cannot compare binary UUIDs.
    pub fn new<I, S>(properties: I, capabilities: &EngineCapabilities) -> FilterResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if !capabilities.binary_uuid {
            return Err(FilterError::UnsupportedStorageFeature {
                filter: "uuid".to_string(),
                feature: "binary_uuid".to_string(),
            });
        }
        Ok(Self {
            properties: properties.into_iter().map(Into::into).collect(),
        })
    }
}

impl FilterDescriptor for UuidFilter {
    fn description(
        &self,
        resource_class: &str,
        introspector: &dyn PropertyIntrospector,
    ) -> IndexMap<String, FilterDescription> {
        let mut description = IndexMap::new();
        for property in selected_properties(&self.properties, introspector, resource_class) {
            let is_uuid = describe_path(introspector, resource_class, &property)
                .and_then(|mut segments| segments.pop())
                .is_some_and(|leaf| leaf.metadata.primary_type() == Some(&PropertyType::Uuid));
            if !is_uuid {
                continue;
            }
            description.insert(
                property.clone(),
                FilterDescription::new(&property, "string")
                    .with_schema(json!({"type": "string", "format": "uuid"})),
            );
            description.insert(
                format!("{}[]", property),
                FilterDescription::new(&property, "string").with_collection(true),
            );
        }
        description
    }
}

impl FilterStrategy for UuidFilter {
    fn apply(&self, context: &mut FilterContext<'_>, property: &str, value: &FilterValue) {
        if !is_enabled(&self.properties, property) {
            return;
        }
        let is_uuid = context
            .describe(property)
            .is_some_and(|leaf| leaf.primary_type() == Some(&PropertyType::Uuid));
        if !is_uuid {
            return;
        }

        let mut ids = Vec::new();
        for value in non_empty_values(value) {
            match Uuid::parse_str(value) {
                Ok(id) => ids.push(id),
                Err(_) => context.notice(property, format!("invalid UUID '{}'", value)),
            }
        }
        if ids.is_empty() {
            return;
        }

        let Some(resolved) = context.resolve(property, JoinType::Inner) else {
            return;
        };
        let bound = ids
            .into_iter()
            .map(|id| context.surface.bind(property, SqlParam::Blob(id.as_bytes().to_vec())))
            .collect();
        context
            .surface
            .add_predicate(Predicate::eq_any(resolved.operand(), bound));
    }
}
