use indexmap::IndexMap;
use meridian_metadata::filter::{FilterDescription, FilterDescriptor};
use meridian_metadata::introspection::PropertyIntrospector;

use crate::property::{describe_path, is_mapped, relation_target};
use crate::sql::{CompareOp, JoinType, Predicate, SqlParam};
use crate::value::FilterValue;

use super::{FilterContext, FilterStrategy, is_enabled, selected_properties};

const OPERATORS: [&str; 5] = ["between", "gt", "gte", "lt", "lte"];

/// Numeric range bounds: `prop[between]=a..b`, `prop[gt]`, `prop[gte]`,
/// `prop[lt]` and `prop[lte]`.
#[derive(Debug, Clone, Default)]
pub struct RangeFilter {
    properties: Vec<String>,
}

impl RangeFilter {
    /// Filter on `properties`, or on every scalar property when empty.
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

fn number(value: &str) -> Option<SqlParam> {
    let value = value.trim();
    if let Ok(integer) = value.parse::<i64>() {
        return Some(SqlParam::Integer(integer));
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(SqlParam::Float)
}

enum RangeBound {
    Between(SqlParam, SqlParam),
    Compare(CompareOp, SqlParam),
}

fn parse_bound(operator: &str, value: &str) -> Result<RangeBound, String> {
    let compare = |op| {
        number(value)
            .map(|n| RangeBound::Compare(op, n))
            .ok_or_else(|| format!("invalid value '{}' for [{}], expected a number", value, operator))
    };
    match operator {
        "between" => {
            let (low, high) = value
                .split_once("..")
                .and_then(|(low, high)| Some((number(low)?, number(high)?)))
                .ok_or_else(|| {
                    format!("invalid value '{}' for [between], expected <min>..<max>", value)
                })?;
            Ok(RangeBound::Between(low, high))
        }
        "gt" => compare(CompareOp::Gt),
        "gte" => compare(CompareOp::Gte),
        "lt" => compare(CompareOp::Lt),
        _ => compare(CompareOp::Lte),
    }
}

impl FilterDescriptor for RangeFilter {
    fn description(
        &self,
        resource_class: &str,
        introspector: &dyn PropertyIntrospector,
    ) -> IndexMap<String, FilterDescription> {
        let mut description = IndexMap::new();
        for property in selected_properties(&self.properties, introspector, resource_class) {
            let is_scalar = describe_path(introspector, resource_class, &property)
                .and_then(|mut segments| segments.pop())
                .is_some_and(|leaf| relation_target(&leaf.metadata).is_none());
            if !is_scalar {
                continue;
            }
            for operator in OPERATORS {
                description.insert(
                    format!("{}[{}]", property, operator),
                    FilterDescription::new(&property, "string"),
                );
            }
        }
        description
    }
}

impl FilterStrategy for RangeFilter {
    fn apply(&self, context: &mut FilterContext<'_>, property: &str, value: &FilterValue) {
        if !is_enabled(&self.properties, property) {
            return;
        }
        let Some(operators) = value.as_map() else {
            return;
        };
        if !is_mapped(context.introspector, context.resource_class, property) {
            return;
        }

        let mut bounds = Vec::new();
        for operator in OPERATORS {
            let Some(raw) = operators.get(operator).and_then(FilterValue::as_str) else {
                continue;
            };
            match parse_bound(operator, raw) {
                Ok(bound) => bounds.push(bound),
                Err(reason) => context.notice(property, reason),
            }
        }
        if bounds.is_empty() {
            return;
        }

        let Some(resolved) = context.resolve(property, JoinType::Inner) else {
            return;
        };
        let field = resolved.operand();
        for bound in bounds {
            let predicate = match bound {
                RangeBound::Between(low, high) if low == high => {
                    let value = context.surface.bind(property, low);
                    Predicate::eq(field.clone(), value)
                }
                RangeBound::Between(low, high) => {
                    let low = context.surface.bind(property, low);
                    let high = context.surface.bind(property, high);
                    Predicate::Between {
                        operand: field.clone(),
                        low,
                        high,
                    }
                }
                RangeBound::Compare(op, value) => {
                    let value = context.surface.bind(property, value);
                    Predicate::compare(field.clone(), op, value)
                }
            };
            context.surface.add_predicate(predicate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testing::{apply, map};

    #[test]
    fn test_between() {
        let (qb, _) = apply(&RangeFilter::default(), "pages", &map(&[("between", "100..300")]));
        assert_eq!(
            qb.where_clause().as_deref(),
            Some("o.pages BETWEEN :pages_p1 AND :pages_p2")
        );
        assert_eq!(qb.parameters().get("pages_p2"), Some(&SqlParam::Integer(300)));

        let (qb, _) = apply(&RangeFilter::default(), "pages", &map(&[("between", "5..5")]));
        assert_eq!(qb.where_clause().as_deref(), Some("o.pages = :pages_p1"));
    }

    #[test]
    fn test_comparisons_combined() {
        let (qb, notices) = apply(
            &RangeFilter::new(["rating"]),
            "rating",
            &map(&[("gt", "2.5"), ("lte", "4"), ("lt", "x")]),
        );
        assert_eq!(
            qb.where_clause().as_deref(),
            Some("o.rating > :rating_p1 AND o.rating <= :rating_p2")
        );
        assert_eq!(qb.parameters().get("rating_p1"), Some(&SqlParam::Float(2.5)));
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn test_invalid_between() {
        let (qb, notices) = apply(&RangeFilter::default(), "pages", &map(&[("between", "1-3")]));
        assert!(qb.where_clause().is_none());
        assert_eq!(notices.len(), 1);
    }
}
