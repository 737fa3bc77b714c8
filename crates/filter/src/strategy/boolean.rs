use indexmap::IndexMap;
use meridian_metadata::filter::{FilterDescription, FilterDescriptor};
use meridian_metadata::introspection::{PropertyIntrospector, PropertyType};

use crate::property::describe_path;
use crate::sql::{JoinType, Predicate, SqlParam};
use crate::value::FilterValue;

use super::{
    FilterContext, FilterStrategy, is_enabled, non_empty_values, parse_bool, selected_properties,
};

/// Equality on boolean properties.
///
/// Accepts `true`, `false`, `1` and `0`, case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct BooleanFilter {
    properties: Vec<String>,
}

impl BooleanFilter {
    /// Filter on `properties`, or on every boolean property when empty.
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

impl FilterDescriptor for BooleanFilter {
    fn description(
        &self,
        resource_class: &str,
        introspector: &dyn PropertyIntrospector,
    ) -> IndexMap<String, FilterDescription> {
        selected_properties(&self.properties, introspector, resource_class)
            .into_iter()
            .filter(|property| {
                describe_path(introspector, resource_class, property)
                    .and_then(|mut segments| segments.pop())
                    .is_some_and(|leaf| leaf.metadata.primary_type() == Some(&PropertyType::Bool))
            })
            .map(|property| {
                let entry = FilterDescription::new(&property, "boolean");
                (property, entry)
            })
            .collect()
    }
}

impl FilterStrategy for BooleanFilter {
    fn apply(&self, context: &mut FilterContext<'_>, property: &str, value: &FilterValue) {
        if !is_enabled(&self.properties, property) {
            return;
        }
        let is_bool = context
            .describe(property)
            .is_some_and(|leaf| leaf.primary_type() == Some(&PropertyType::Bool));
        if !is_bool {
            return;
        }

        let values = non_empty_values(value);
        let Some(raw) = values.first() else {
            return;
        };
        let Some(flag) = parse_bool(raw) else {
            context.notice(
                property,
                format!("invalid boolean value '{}', expected true, false, 1 or 0", raw),
            );
            return;
        };

        let Some(resolved) = context.resolve(property, JoinType::Inner) else {
            return;
        };
        let param = context.surface.bind(property, SqlParam::Bool(flag));
        context
            .surface
            .add_predicate(Predicate::eq(resolved.operand(), param));
    }
}
