use indexmap::IndexMap;
use meridian_metadata::filter::{FilterDescription, FilterDescriptor};
use meridian_metadata::introspection::{PropertyIntrospector, PropertyMetadata, PropertyType};
use serde_json::json;

use crate::property::describe_path;
use crate::sql::{JoinType, Predicate, SqlParam};
use crate::value::FilterValue;

use super::{FilterContext, FilterStrategy, is_enabled, non_empty_values, selected_properties};

/// Equality on enumeration properties.
///
/// Only active on properties whose declared type is an enumeration with
/// known cases; anywhere else it does nothing.
#[derive(Debug, Clone, Default)]
pub struct BackedEnumFilter {
    properties: Vec<String>,
}

impl BackedEnumFilter {
    /// Filter on `properties`, or on every enumeration when empty.
    pub fn new<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }
}

fn enum_cases(metadata: &PropertyMetadata) -> Option<&[String]> {
    match metadata.primary_type() {
        Some(PropertyType::Enum { cases, .. }) if !cases.is_empty() => Some(cases),
        _ => None,
    }
}

impl FilterDescriptor for BackedEnumFilter {
    fn description(
        &self,
        resource_class: &str,
        introspector: &dyn PropertyIntrospector,
    ) -> IndexMap<String, FilterDescription> {
        let mut description = IndexMap::new();
        for property in selected_properties(&self.properties, introspector, resource_class) {
            let Some(leaf) = describe_path(introspector, resource_class, &property)
                .and_then(|mut segments| segments.pop())
            else {
                continue;
            };
            let Some(cases) = enum_cases(&leaf.metadata) else {
                continue;
            };
            description.insert(
                property.clone(),
                FilterDescription::new(&property, "string")
                    .with_schema(json!({"type": "string", "enum": cases})),
            );
            description.insert(
                format!("{}[]", property),
                FilterDescription::new(&property, "string")
                    .with_collection(true)
                    .with_schema(json!({
                        "type": "array",
                        "items": {"type": "string", "enum": cases},
                    })),
            );
        }
        description
    }
}

impl FilterStrategy for BackedEnumFilter {
    fn apply(&self, context: &mut FilterContext<'_>, property: &str, value: &FilterValue) {
        if !is_enabled(&self.properties, property) {
            return;
        }
        let Some(leaf) = context.describe(property) else {
            return;
        };
        let Some(cases) = enum_cases(&leaf) else {
            return;
        };

        let mut accepted = Vec::new();
        for value in non_empty_values(value) {
            if cases.iter().any(|case| case == value) {
                accepted.push(value.to_string());
            } else {
                context.notice(
                    property,
                    format!("'{}' is not one of {}", value, cases.join(", ")),
                );
            }
        }
        if accepted.is_empty() {
            return;
        }

        let Some(resolved) = context.resolve(property, JoinType::Inner) else {
            return;
        };
        let bound = accepted
            .into_iter()
            .map(|case| context.surface.bind(property, SqlParam::String(case)))
            .collect();
        context
            .surface
            .add_predicate(Predicate::eq_any(resolved.operand(), bound));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testing::{apply, catalog, list, where_clause};

    #[test]
    fn test_known_cases() {
        let (qb, notices) = apply(&BackedEnumFilter::default(), "status", &list(&["draft", "gone"]));
        assert_eq!(qb.where_clause().as_deref(), Some("o.status = :status_p1"));
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn test_inactive_on_other_types() {
        assert_eq!(where_clause(&BackedEnumFilter::default(), "title", "draft"), None);
        assert_eq!(where_clause(&BackedEnumFilter::new(["title"]), "title", "draft"), None);
    }

    #[test]
    fn test_description_lists_cases() {
        let description = BackedEnumFilter::default().description("Book", &catalog());
        assert_eq!(description.len(), 2);
        assert_eq!(
            description["status"].schema,
            Some(json!({"type": "string", "enum": ["draft", "published"]}))
        );
    }
}
