use indexmap::IndexMap;
use meridian_metadata::filter::{FilterDescription, FilterDescriptor};
use meridian_metadata::introspection::PropertyIntrospector;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::property::{describe_path, relation_target};
use crate::sql::{JoinType, Operand, OrderDirection};
use crate::value::{FilterValue, QueryParameters};

use super::{FilterContext, FilterStrategy};

/// Default query parameter holding the sort keys.
pub const ORDER_PARAMETER: &str = "order";

/// Where nulls sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullsComparison {
    /// Nulls sort as the smallest value: first ascending, last descending.
    NullsSmallest,
    /// Nulls sort as the largest value: last ascending, first descending.
    NullsLargest,
    /// Nulls come first whatever the direction.
    NullsAlwaysFirst,
    /// Nulls come last whatever the direction.
    NullsAlwaysLast,
}

impl NullsComparison {
    /// Direction of the null rank (0 for null, 1 otherwise) sorting nulls
    /// where this policy wants them when the field sorts in `direction`.
    pub fn rank_direction(&self, direction: OrderDirection) -> OrderDirection {
        use OrderDirection::{Asc, Desc};
        match (self, direction) {
            (NullsComparison::NullsSmallest, direction) => direction,
            (NullsComparison::NullsLargest, Asc) => Desc,
            (NullsComparison::NullsLargest, Desc) => Asc,
            (NullsComparison::NullsAlwaysFirst, _) => Asc,
            (NullsComparison::NullsAlwaysLast, _) => Desc,
        }
    }
}

/// Sort settings of one property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderProperty {
    /// Direction used when the parameter is given without a value.
    #[serde(default)]
    pub default_direction: Option<OrderDirection>,
    /// Null placement; the store's own placement when absent.
    #[serde(default)]
    pub nulls_comparison: Option<NullsComparison>,
}

impl OrderProperty {
    /// Settings with a default direction.
    pub fn with_default(direction: OrderDirection) -> Self {
        Self {
            default_direction: Some(direction),
            nulls_comparison: None,
        }
    }

    /// Returns a copy placing nulls with `nulls`.
    pub fn with_nulls(mut self, nulls: NullsComparison) -> Self {
        self.nulls_comparison = Some(nulls);
        self
    }
}

/// Sorting: `order[title]=asc&order[author.name]=desc`.
///
/// Sort keys are added in the order the filter is applied, which follows the
/// order of the parameters in the query string.
#[derive(Debug, Clone)]
pub struct OrderFilter {
    properties: IndexMap<String, OrderProperty>,
    parameter: String,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self::new(IndexMap::new())
    }
}

impl OrderFilter {
    /// Sorts on `properties`, or on every scalar property when empty.
    pub fn new(properties: IndexMap<String, OrderProperty>) -> Self {
        Self {
            properties,
            parameter: ORDER_PARAMETER.to_string(),
        }
    }

    /// Returns a copy sorting on `property`.
    pub fn with_property(mut self, property: impl Into<String>, settings: OrderProperty) -> Self {
        self.properties.insert(property.into(), settings);
        self
    }

    /// Returns a copy reading its sort keys from `parameter`.
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = parameter.into();
        self
    }

    fn settings(&self, property: &str) -> Option<OrderProperty> {
        if self.properties.is_empty() {
            return Some(OrderProperty::default());
        }
        self.properties.get(property).copied()
    }
}

impl FilterDescriptor for OrderFilter {
    fn description(
        &self,
        resource_class: &str,
        introspector: &dyn PropertyIntrospector,
    ) -> IndexMap<String, FilterDescription> {
        let properties: Vec<String> = if self.properties.is_empty() {
            introspector.list_properties(resource_class)
        } else {
            self.properties.keys().cloned().collect()
        };

        let mut description = IndexMap::new();
        for property in properties {
            let is_scalar = describe_path(introspector, resource_class, &property)
                .and_then(|mut segments| segments.pop())
                .is_some_and(|leaf| relation_target(&leaf.metadata).is_none());
            if !is_scalar {
                continue;
            }
            description.insert(
                format!("{}[{}]", self.parameter, property),
                FilterDescription::new(&property, "string")
                    .with_schema(json!({"type": "string", "enum": ["asc", "desc"]})),
            );
        }
        description
    }
}

impl FilterStrategy for OrderFilter {
    fn apply(&self, context: &mut FilterContext<'_>, property: &str, value: &FilterValue) {
        let Some(settings) = self.settings(property) else {
            return;
        };
        let Some(raw) = value.as_str() else {
            return;
        };
        let direction = if raw.trim().is_empty() {
            match settings.default_direction {
                Some(direction) => direction,
                None => return,
            }
        } else {
            match OrderDirection::parse(raw.trim()) {
                Some(direction) => direction,
                None => {
                    context.notice(
                        property,
                        format!("invalid direction '{}', expected asc or desc", raw),
                    );
                    return;
                }
            }
        };
        let is_scalar = context
            .describe(property)
            .is_some_and(|leaf| relation_target(&leaf).is_none());
        if !is_scalar {
            return;
        }

        let Some(resolved) = context.resolve(property, JoinType::Left) else {
            return;
        };
        let field = resolved.operand();
        if let Some(nulls) = settings.nulls_comparison {
            let rank = format!("_{}_{}_null_rank", resolved.alias, resolved.field);
            context.surface.add_select(field.clone().null_rank(), &rank);
            context
                .surface
                .add_order_by(Operand::Alias(rank), nulls.rank_direction(direction));
        }
        context.surface.add_order_by(field, direction);
    }

    fn extract_value<'q>(
        &self,
        parameters: &'q QueryParameters,
        property: &str,
    ) -> Option<&'q FilterValue> {
        parameters.get(&self.parameter)?.get(property)
    }
}
