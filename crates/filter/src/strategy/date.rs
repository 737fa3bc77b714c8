use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use meridian_metadata::filter::{FilterDescription, FilterDescriptor};
use meridian_metadata::introspection::{PropertyIntrospector, PropertyType};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::property::describe_path;
use crate::sql::{CompareOp, JoinType, Predicate, SqlParam};
use crate::value::FilterValue;

use super::{FilterContext, FilterStrategy};

const NORMALIZED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What happens to rows whose date is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullManagement {
    /// Null rows never match, whatever the bounds.
    ExcludeNull,
    /// Null rows match `before` and `strictly_before`.
    IncludeNullBefore,
    /// Null rows match `after` and `strictly_after`.
    IncludeNullAfter,
    /// Null rows match every bound.
    IncludeNullBeforeAndAfter,
}

impl NullManagement {
    fn includes(&self, bound: DateBound) -> bool {
        match self {
            NullManagement::ExcludeNull => false,
            NullManagement::IncludeNullBefore => bound.is_before(),
            NullManagement::IncludeNullAfter => !bound.is_before(),
            NullManagement::IncludeNullBeforeAndAfter => true,
        }
    }
}

/// One bound of a date filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateBound {
    /// `<=`
    Before,
    /// `<`
    StrictlyBefore,
    /// `>=`
    After,
    /// `>`
    StrictlyAfter,
}

impl DateBound {
    /// Every bound, in application order.
    pub const ALL: [DateBound; 4] = [
        DateBound::Before,
        DateBound::StrictlyBefore,
        DateBound::After,
        DateBound::StrictlyAfter,
    ];

    /// Query key of the bound.
    pub fn key(&self) -> &'static str {
        match self {
            DateBound::Before => "before",
            DateBound::StrictlyBefore => "strictly_before",
            DateBound::After => "after",
            DateBound::StrictlyAfter => "strictly_after",
        }
    }

    fn operator(&self) -> CompareOp {
        match self {
            DateBound::Before => CompareOp::Lte,
            DateBound::StrictlyBefore => CompareOp::Lt,
            DateBound::After => CompareOp::Gte,
            DateBound::StrictlyAfter => CompareOp::Gt,
        }
    }

    fn is_before(&self) -> bool {
        matches!(self, DateBound::Before | DateBound::StrictlyBefore)
    }
}

/// Parses RFC 3339 timestamps, naive timestamps and plain dates into the
/// `YYYY-MM-DD HH:MM:SS` form SQLite's `datetime()` produces.
fn normalize_date(value: &str) -> Option<String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc).format(NORMALIZED_FORMAT).to_string());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.format(NORMALIZED_FORMAT).to_string());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|parsed| parsed.format(NORMALIZED_FORMAT).to_string())
}

fn is_date(property_type: Option<&PropertyType>) -> bool {
    matches!(property_type, Some(PropertyType::DateTime | PropertyType::Date))
}

/// Date bounds with configurable null handling.
///
/// Each bound present in `prop[after]`, `prop[before]`,
/// `prop[strictly_after]` and `prop[strictly_before]` adds its own
/// comparison. `exclude_null` adds a single `IS NOT NULL` and disables every
/// null inclusion; the `include_null_*` policies OR `IS NULL` into the
/// matching bounds and AND `IS NOT NULL` into the others.
#[derive(Debug, Clone, Default)]
pub struct DateFilter {
    properties: IndexMap<String, Option<NullManagement>>,
}

impl DateFilter {
    /// Filter on `properties` with their null policy, or on every date
    /// property when empty.
    pub fn new(properties: IndexMap<String, Option<NullManagement>>) -> Self {
        Self { properties }
    }

    /// Returns a copy filtering `property` with `nulls`.
    pub fn with_property(mut self, property: impl Into<String>, nulls: Option<NullManagement>) -> Self {
        self.properties.insert(property.into(), nulls);
        self
    }

    fn null_management(&self, property: &str) -> Option<Option<NullManagement>> {
        if self.properties.is_empty() {
            return Some(None);
        }
        self.properties.get(property).copied()
    }
}

impl FilterDescriptor for DateFilter {
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
            let is_date_property = describe_path(introspector, resource_class, &property)
                .and_then(|mut segments| segments.pop())
                .is_some_and(|leaf| is_date(leaf.metadata.primary_type()));
            if !is_date_property {
                continue;
            }
            for bound in DateBound::ALL {
                description.insert(
                    format!("{}[{}]", property, bound.key()),
                    FilterDescription::new(&property, "string")
                        .with_schema(json!({"type": "string", "format": "date-time"})),
                );
            }
        }
        description
    }
}

impl FilterStrategy for DateFilter {
    fn apply(&self, context: &mut FilterContext<'_>, property: &str, value: &FilterValue) {
        let Some(nulls) = self.null_management(property) else {
            return;
        };
        let Some(bounds) = value.as_map() else {
            return;
        };
        let nullable = match context.describe(property) {
            Some(leaf) if is_date(leaf.primary_type()) => leaf.nullable,
            _ => return,
        };

        let mut comparisons = Vec::new();
        for bound in DateBound::ALL {
            let Some(raw) = bounds.get(bound.key()).and_then(FilterValue::as_str) else {
                continue;
            };
            match normalize_date(raw) {
                Some(normalized) => comparisons.push((bound, normalized)),
                None => context.notice(
                    property,
                    format!("invalid date '{}' for [{}]", raw, bound.key()),
                ),
            }
        }
        if comparisons.is_empty() {
            return;
        }

        let join_type = match nulls {
            Some(policy) if policy != NullManagement::ExcludeNull => JoinType::Left,
            _ => JoinType::Inner,
        };
        let Some(resolved) = context.resolve(property, join_type) else {
            return;
        };
        let field = resolved.operand();

        if nulls == Some(NullManagement::ExcludeNull) {
            context.surface.add_predicate(Predicate::is_not_null(field.clone()));
        }

        for (bound, normalized) in comparisons {
            let param = context.surface.bind(property, SqlParam::String(normalized));
            let base = Predicate::compare(field.clone().datetime(), bound.operator(), param.datetime());

            let predicate = match nulls {
                Some(policy) if nullable && policy != NullManagement::ExcludeNull => {
                    if policy.includes(bound) {
                        Predicate::or(vec![base, Predicate::is_null(field.clone())])
                    } else {
                        Predicate::and(vec![base, Predicate::is_not_null(field.clone())])
                    }
                }
                _ => base,
            };
            context.surface.add_predicate(predicate);
        }
    }
}
