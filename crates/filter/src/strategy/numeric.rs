use indexmap::IndexMap;
use meridian_metadata::filter::{FilterDescription, FilterDescriptor};
use meridian_metadata::introspection::{PropertyIntrospector, PropertyType};

use crate::property::describe_path;
use crate::sql::{JoinType, Predicate, SqlParam};
use crate::value::FilterValue;

use super::{FilterContext, FilterStrategy, is_enabled, non_empty_values, selected_properties};

/// Equality on numeric properties.
///
/// Values are coerced to the declared type of the property: integers and
/// floats are bound as numbers, decimals are validated and bound as text.
#[derive(Debug, Clone, Default)]
pub struct NumericFilter {
    properties: Vec<String>,
}

impl NumericFilter {
    /// Filter on `properties`, or on every numeric property when empty.
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

fn is_numeric(property_type: &PropertyType) -> bool {
    matches!(
        property_type,
        PropertyType::Int | PropertyType::Float | PropertyType::Decimal
    )
}

fn coerce(property_type: &PropertyType, value: &str) -> Option<SqlParam> {
    match property_type {
        PropertyType::Int => value.parse().ok().map(SqlParam::Integer),
        PropertyType::Float => value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(SqlParam::Float),
        PropertyType::Decimal => value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|_| SqlParam::String(value.to_string())),
        _ => None,
    }
}

impl FilterDescriptor for NumericFilter {
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
            let Some(property_type) = leaf.metadata.primary_type().filter(|t| is_numeric(t))
            else {
                continue;
            };
            let value_type = property_type.schema_type();
            description.insert(
                property.clone(),
                FilterDescription::new(&property, value_type),
            );
            description.insert(
                format!("{}[]", property),
                FilterDescription::new(&property, value_type).with_collection(true),
            );
        }
        description
    }
}

impl FilterStrategy for NumericFilter {
    fn apply(&self, context: &mut FilterContext<'_>, property: &str, value: &FilterValue) {
        if !is_enabled(&self.properties, property) {
            return;
        }
        let Some(leaf) = context.describe(property) else {
            return;
        };
        let Some(property_type) = leaf.primary_type().filter(|t| is_numeric(t)) else {
            return;
        };

        let values = non_empty_values(value);
        let mut params = Vec::new();
        let mut invalid = Vec::new();
        for value in &values {
            match coerce(property_type, value) {
                Some(param) => params.push(param),
                None => invalid.push(*value),
            }
        }
        if !invalid.is_empty() {
            context.notice(
                property,
                format!("invalid numeric value for \"{}\": {}", property, invalid.join(", ")),
            );
        }
        if params.is_empty() {
            return;
        }

        let Some(resolved) = context.resolve(property, JoinType::Inner) else {
            return;
        };
        let bound = params
            .into_iter()
            .map(|param| context.surface.bind(property, param))
            .collect();
        context
            .surface
            .add_predicate(Predicate::eq_any(resolved.operand(), bound));
    }
}
