use indexmap::IndexMap;
use meridian_metadata::filter::{FilterDescription, FilterDescriptor};
use meridian_metadata::introspection::{PropertyIntrospector, PropertyMetadata};

use crate::property::{association_of, describe_path};
use crate::sql::{JoinKind, JoinType, Operand, Predicate};
use crate::value::{FilterValue, QueryParameters};

use super::{FilterContext, FilterStrategy, is_enabled, parse_bool, selected_properties};

/// Default query parameter holding the properties to test.
pub const EXISTS_PARAMETER: &str = "exists";

/// Presence test: `exists[prop]=true` keeps rows where `prop` is set or,
/// for a collection, not empty.
///
/// Only nullable properties and relations that can be empty are filterable.
#[derive(Debug, Clone)]
pub struct ExistsFilter {
    properties: Vec<String>,
    parameter: String,
}

impl Default for ExistsFilter {
    fn default() -> Self {
        Self {
            properties: Vec::new(),
            parameter: EXISTS_PARAMETER.to_string(),
        }
    }
}

impl ExistsFilter {
    /// Filter on `properties`, or on every nullable property when empty.
    pub fn new<I, S>(properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            properties: properties.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Returns a copy reading its properties from `parameter`.
    pub fn with_parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = parameter.into();
        self
    }
}

fn is_nullable(metadata: &PropertyMetadata) -> bool {
    match association_of(metadata) {
        Some(association) => association.is_nullable(),
        None => metadata.nullable,
    }
}

impl FilterDescriptor for ExistsFilter {
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
                    .is_some_and(|leaf| is_nullable(&leaf.metadata))
            })
            .map(|property| {
                let entry = FilterDescription::new(&property, "boolean");
                (format!("{}[{}]", self.parameter, property), entry)
            })
            .collect()
    }
}

impl FilterStrategy for ExistsFilter {
    fn apply(&self, context: &mut FilterContext<'_>, property: &str, value: &FilterValue) {
        if !is_enabled(&self.properties, property) {
            return;
        }
        let Some(raw) = value.as_str() else {
            return;
        };
        let exists = if raw.is_empty() {
            true
        } else {
            match parse_bool(raw) {
                Some(flag) => flag,
                None => {
                    context.notice(
                        property,
                        format!(
                            "invalid value '{}' for {}[{}], expected true or false",
                            raw, self.parameter, property
                        ),
                    );
                    return;
                }
            }
        };
        if !context.describe(property).is_some_and(|leaf| is_nullable(&leaf)) {
            return;
        }

        let Some(resolved) = context.resolve(property, JoinType::Left) else {
            return;
        };
        let Some(join) = resolved.relation_join(context.introspector, JoinType::Left) else {
            let field = resolved.operand();
            let predicate = if exists {
                Predicate::is_not_null(field)
            } else {
                Predicate::is_null(field)
            };
            context.surface.add_predicate(predicate);
            return;
        };

        let predicate = match &join.kind {
            JoinKind::Inverse { .. } if !join.collection => {
                let target_key = join.target_key.clone();
                let alias = context.surface.ensure_join(join);
                let key = Operand::column(alias, target_key);
                if exists {
                    Predicate::is_not_null(key)
                } else {
                    Predicate::is_null(key)
                }
            }
            _ => join.emptiness(!exists),
        };
        context.surface.add_predicate(predicate);
    }

    fn extract_value<'q>(
        &self,
        parameters: &'q QueryParameters,
        property: &str,
    ) -> Option<&'q FilterValue> {
        parameters.get(&self.parameter)?.get(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeLog;
    use crate::sql::SqlQueryBuilder;
    use crate::strategy::testing::{apply, catalog, where_clause};
    use meridian_metadata::introspection::{
        Association, ClassCatalog, ClassDefinition, PropertyType,
    };

    /// `User` with an inverse one-to-one `profile` and a mandatory `team`.
    fn accounts() -> ClassCatalog {
        ClassCatalog::new()
            .with_class(
                "User",
                ClassDefinition::new()
                    .property("id", PropertyMetadata::identifier(PropertyType::Int))
                    .property(
                        "profile",
                        PropertyMetadata::of(PropertyType::object("Profile")).with_association(
                            Association {
                                target_class: "Profile".to_string(),
                                inverse_side: true,
                                mapped_by: Some("user".to_string()),
                                ..Default::default()
                            },
                        ),
                    )
                    .property(
                        "team",
                        PropertyMetadata::of(PropertyType::object("Team")).with_association(
                            Association::to_one("Team").with_join_column_nullable(false),
                        ),
                    ),
            )
            .with_class(
                "Profile",
                ClassDefinition::new()
                    .property("id", PropertyMetadata::identifier(PropertyType::Int))
                    .property(
                        "user",
                        PropertyMetadata::of(PropertyType::object("User"))
                            .with_association(Association::to_one("User")),
                    ),
            )
            .with_class(
                "Team",
                ClassDefinition::new()
                    .property("id", PropertyMetadata::identifier(PropertyType::Int)),
            )
    }

    fn user_sql(property: &str, value: &str) -> String {
        let catalog = accounts();
        let mut qb = SqlQueryBuilder::new("user");
        let mut notices = NoticeLog::new();
        let mut context = FilterContext::new(&mut qb, &catalog, "User", "test", &mut notices);
        ExistsFilter::default().apply(&mut context, property, &FilterValue::from(value));
        qb.build().sql
    }

    #[test]
    fn test_scalar() {
        assert_eq!(
            where_clause(&ExistsFilter::default(), "author", "true").as_deref(),
            Some("o.author IS NOT NULL")
        );
        assert_eq!(
            where_clause(&ExistsFilter::default(), "author", "0").as_deref(),
            Some("o.author IS NULL")
        );
        assert_eq!(
            where_clause(&ExistsFilter::default(), "author", "").as_deref(),
            Some("o.author IS NOT NULL")
        );
    }

    #[test]
    fn test_non_nullable_property_ignored() {
        assert_eq!(where_clause(&ExistsFilter::default(), "title", "true"), None);
    }

    #[test]
    fn test_collection_emptiness() {
        let (qb, _) = apply(&ExistsFilter::default(), "reviews", &"false".into());
        assert_eq!(
            qb.where_clause().as_deref(),
            Some("NOT EXISTS (SELECT 1 FROM review WHERE review.book_id = o.id)")
        );
        assert_eq!(qb.joins().count(), 0);
    }

    #[test]
    fn test_to_one_relation() {
        assert_eq!(
            where_clause(&ExistsFilter::default(), "publisher", "false").as_deref(),
            Some("o.publisher_id IS NULL")
        );
    }

    #[test]
    fn test_inverse_to_one_relation() {
        assert_eq!(
            user_sql("profile", "false"),
            "SELECT o.* FROM user o LEFT JOIN profile profile_a1 ON profile_a1.user_id = o.id \
             WHERE profile_a1.id IS NULL ORDER BY o.rowid ASC"
        );
        assert!(user_sql("profile", "true").contains("WHERE profile_a1.id IS NOT NULL"));
    }

    #[test]
    fn test_mandatory_join_column_ignored() {
        assert_eq!(user_sql("team", "false"), "SELECT o.* FROM user o ORDER BY o.rowid ASC");
    }

    #[test]
    fn test_invalid_value() {
        let (qb, notices) = apply(&ExistsFilter::default(), "author", &"maybe".into());
        assert!(qb.where_clause().is_none());
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn test_extract_value() {
        let params = QueryParameters::parse("exists[author]=true&author=x");
        let filter = ExistsFilter::default();
        assert_eq!(
            filter.extract_value(&params, "author"),
            Some(&FilterValue::from("true"))
        );
        assert_eq!(filter.extract_value(&params, "title"), None);
    }

    #[test]
    fn test_description() {
        let description = ExistsFilter::default().description("Book", &catalog());
        let keys: Vec<&str> = description.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "exists[author]",
                "exists[price]",
                "exists[publishedAt]",
                "exists[isbn]",
                "exists[publisher]",
                "exists[reviews]"
            ]
        );
    }
}
