use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use meridian_metadata::filter::{FilterDescription, FilterDescriptor};
use meridian_metadata::introspection::PropertyIntrospector;

use crate::sql::{Predicate, PredicateRecorder};
use crate::value::{FilterValue, QueryParameters};

use super::{FilterContext, FilterStrategy};

/// One parameter searched across several properties.
///
/// `q=dune` runs the wrapped filter once per property and keeps rows
/// matching any of them. Predicates of one property stay AND-combined,
/// properties are OR-combined, and joins are shared between properties.
/// Relations are left-joined, so a row without a publisher still matches
/// `q` on its title.
#[derive(Clone)]
pub struct FreeTextFilter {
    parameter: String,
    properties: Vec<String>,
    inner: Arc<dyn FilterStrategy>,
}

impl FreeTextFilter {
    /// Searches `properties` for the value of `parameter` with `inner`.
    pub fn new<I, S>(parameter: impl Into<String>, properties: I, inner: Arc<dyn FilterStrategy>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parameter: parameter.into(),
            properties: properties.into_iter().map(Into::into).collect(),
            inner,
        }
    }

    /// Query parameter read by the filter.
    pub fn parameter(&self) -> &str {
        &self.parameter
    }
}

impl FilterDescriptor for FreeTextFilter {
    fn description(
        &self,
        _resource_class: &str,
        _introspector: &dyn PropertyIntrospector,
    ) -> IndexMap<String, FilterDescription> {
        IndexMap::from([(
            self.parameter.clone(),
            FilterDescription::new(&self.parameter, "string"),
        )])
    }
}

impl FilterStrategy for FreeTextFilter {
    fn apply(&self, context: &mut FilterContext<'_>, _property: &str, value: &FilterValue) {
        let mut recorder = PredicateRecorder::new(&mut *context.surface);
        let mut alternatives = Vec::new();

        for property in &self.properties {
            let before = recorder.recorded().len();
            let mut inner = FilterContext::new(
                &mut recorder,
                context.introspector,
                context.resource_class,
                context.filter_name,
                &mut *context.notices,
            );
            self.inner.apply(&mut inner, property, value);

            let added = &recorder.recorded()[before..];
            if !added.is_empty() {
                alternatives.push(Predicate::and(added.to_vec()));
            }
        }

        if !alternatives.is_empty() {
            context.surface.add_predicate(Predicate::or(alternatives));
        }
    }

    fn extract_value<'q>(
        &self,
        parameters: &'q QueryParameters,
        _property: &str,
    ) -> Option<&'q FilterValue> {
        parameters.get(&self.parameter)
    }
}

impl fmt::Debug for FreeTextFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreeTextFilter")
            .field("parameter", &self.parameter)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::testing::{apply, catalog};
    use crate::strategy::{MatchKind, MatchStrategy, NumericFilter, SearchFilter};

    fn partial() -> Arc<dyn FilterStrategy> {
        Arc::new(
            SearchFilter::default()
                .with_property("title", MatchStrategy::new(MatchKind::Partial))
                .with_property("author", MatchStrategy::new(MatchKind::Partial))
                .with_property("publisher.name", MatchStrategy::insensitive(MatchKind::Partial)),
        )
    }

    #[test]
    fn test_properties_are_or_combined() {
        let filter = FreeTextFilter::new("q", ["title", "author"], partial());
        let (qb, _) = apply(&filter, "q", &"x".into());
        assert_eq!(qb.predicates().len(), 1);
        assert_eq!(
            qb.where_clause().as_deref(),
            Some("(o.title LIKE '%' || :title_p1 || '%' OR o.author LIKE '%' || :author_p2 || '%')")
        );
    }

    #[test]
    fn test_nested_property_joined_once() {
        let filter = FreeTextFilter::new("q", ["title", "publisher.name"], partial());
        let (qb, _) = apply(&filter, "q", &"x".into());
        assert_eq!(qb.joins().count(), 1);
        assert_eq!(qb.parameters().len(), 2);
        assert!(qb.where_clause().unwrap().contains("LOWER(publisher_a2.name)"));
    }

    #[test]
    fn test_relations_are_left_joined() {
        let filter = FreeTextFilter::new("q", ["title", "publisher.name"], partial());
        let (qb, _) = apply(&filter, "q", &"x".into());
        let sql = qb.build().sql;
        assert!(
            sql.contains("LEFT JOIN publisher publisher_a2 ON publisher_a2.id = o.publisher_id"),
            "{}",
            sql
        );
    }

    #[test]
    fn test_nothing_matched_adds_nothing() {
        let filter = FreeTextFilter::new("q", ["pages"], Arc::new(NumericFilter::default()));
        let (qb, notices) = apply(&filter, "q", &"abc".into());
        assert!(qb.predicates().is_empty());
        assert_eq!(notices.len(), 1);
    }

    #[test]
    fn test_description_and_extraction() {
        let filter = FreeTextFilter::new("q", ["title"], partial());
        let description = filter.description("Book", &catalog());
        assert_eq!(description.len(), 1);
        assert_eq!(description["q"].value_type, "string");

        let params = QueryParameters::parse("q=dune&title=x");
        assert_eq!(filter.extract_value(&params, "title"), Some(&FilterValue::from("dune")));
    }
}
