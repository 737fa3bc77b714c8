//! Filter engine.
//!
//! The engine drives one request: it reads the filter-bound parameters of a
//! resolved operation, looks their strategies up in the registry and applies
//! them to a query surface, then adds URI variable constraints and
//! pagination.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use meridian_metadata::introspection::PropertyIntrospector;
use meridian_metadata::types::{Operation, ParameterLocation};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{FilterError, FilterResult};
use crate::links::LinksHandler;
use crate::notice::{FilterNotice, NoticeLog, NoticeSink};
use crate::registry::FilterRegistry;
use crate::sql::{QuerySurface, SqlQuery, SqlQueryBuilder};
use crate::strategy::{FilterContext, FilterStrategy};
use crate::value::{FilterValue, QueryParameters};

/// Query parameter selecting the page.
pub const PAGE_PARAMETER: &str = "page";

/// Query parameter selecting the page size.
pub const ITEMS_PER_PAGE_PARAMETER: &str = "itemsPerPage";

const DEFAULT_ITEMS_PER_PAGE: u64 = 30;

/// Largest `LIMIT`/`OFFSET` SQLite accepts.
const MAX_SQL_INTEGER: u64 = i64::MAX as u64;

/// Page requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// 1-based page number.
    pub page: u64,
    /// Rows per page.
    pub items_per_page: u64,
}

impl Pagination {
    /// Rows skipped before the page.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.items_per_page)
    }

    /// Reads the page of a collection operation from the query.
    ///
    /// Returns `None` when the operation is not paginated. Invalid values
    /// fall back to the defaults with a notice; the page size is clamped to
    /// the operation's maximum. A page whose offset leaves the SQLite
    /// integer range falls back to the first page with a notice.
    pub fn from_query(
        operation: &Operation,
        params: &QueryParameters,
        notices: &mut dyn NoticeSink,
    ) -> Option<Self> {
        if !operation.kind.is_collection() || operation.pagination_enabled != Some(true) {
            return None;
        }

        let mut page = read_positive(params, PAGE_PARAMETER, notices).unwrap_or(1);
        let mut items_per_page = read_positive(params, ITEMS_PER_PAGE_PARAMETER, notices)
            .or(operation.pagination_items_per_page)
            .unwrap_or(DEFAULT_ITEMS_PER_PAGE);
        if let Some(maximum) = operation.pagination_maximum_items_per_page {
            items_per_page = items_per_page.min(maximum);
        }
        items_per_page = items_per_page.min(MAX_SQL_INTEGER);

        let offset = (page - 1).checked_mul(items_per_page);
        if !offset.is_some_and(|offset| offset <= MAX_SQL_INTEGER) {
            notices.notice(FilterNotice {
                filter: "pagination".to_string(),
                property: PAGE_PARAMETER.to_string(),
                reason: format!(
                    "page {} of {} items is out of range",
                    page, items_per_page
                ),
            });
            page = 1;
        }

        Some(Self {
            page,
            items_per_page,
        })
    }
}

fn read_positive(
    params: &QueryParameters,
    key: &str,
    notices: &mut dyn NoticeSink,
) -> Option<u64> {
    let raw = params.get(key)?.as_str()?;
    match raw.parse::<u64>() {
        Ok(value) if value > 0 && value <= MAX_SQL_INTEGER => Some(value),
        _ => {
            notices.notice(FilterNotice {
                filter: "pagination".to_string(),
                property: key.to_string(),
                reason: format!(
                    "'{}' is not a positive integer up to {}",
                    raw, MAX_SQL_INTEGER
                ),
            });
            None
        }
    }
}

/// A planned collection query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    /// Rendered SQL and its parameters.
    pub query: SqlQuery,
    /// Ignored filter input.
    pub notices: Vec<FilterNotice>,
    /// Applied page, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

struct Application<'a> {
    filter: &'a str,
    property: &'a str,
    strategy: &'a Arc<dyn FilterStrategy>,
    value: &'a FilterValue,
    position: (usize, usize),
}

/// Applies the filters of resolved operations.
#[derive(Clone)]
pub struct FilterEngine {
    registry: Arc<FilterRegistry>,
    introspector: Arc<dyn PropertyIntrospector>,
    links: LinksHandler,
}

impl FilterEngine {
    /// Creates an engine over `registry`.
    pub fn new(registry: Arc<FilterRegistry>, introspector: Arc<dyn PropertyIntrospector>) -> Self {
        let links = LinksHandler::new(Arc::clone(&introspector));
        Self {
            registry,
            introspector,
            links,
        }
    }

    /// Registered filters.
    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Applies every filter of `operation` with a value in `params`.
    ///
    /// A filter runs at most once per property, in the order its parameter
    /// first appears in the query. Parameters whose filter is not registered
    /// are skipped.
    pub fn apply(
        &self,
        surface: &mut dyn QuerySurface,
        operation: &Operation,
        params: &QueryParameters,
        notices: &mut dyn NoticeSink,
    ) -> FilterResult<()> {
        let class = resource_class(operation)?;

        let mut applications: Vec<Application<'_>> = Vec::new();
        for parameter in operation.parameters.iter().flat_map(|p| p.iter()) {
            if parameter.location != ParameterLocation::Query {
                continue;
            }
            let Some(filter) = parameter.filter.as_deref() else {
                continue;
            };
            let Some(strategy) = self.registry.get_strategy(filter) else {
                debug!(filter = %filter, key = %parameter.key, "Filter not registered, skipping");
                continue;
            };
            let property = parameter.property.as_deref().unwrap_or(&parameter.key);
            let Some(value) = strategy
                .extract_value(params, property)
                .or_else(|| params.lookup(&parameter.key))
            else {
                continue;
            };
            let position = params.position(&parameter.key).unwrap_or((usize::MAX, 0));

            match applications
                .iter_mut()
                .find(|a| a.filter == filter && a.property == property)
            {
                Some(existing) => existing.position = existing.position.min(position),
                None => applications.push(Application {
                    filter,
                    property,
                    strategy,
                    value,
                    position,
                }),
            }
        }
        applications.sort_by_key(|application| application.position);

        for application in applications {
            debug!(
                class = %class,
                filter = %application.filter,
                property = %application.property,
                "Applying filter"
            );
            let mut context = FilterContext::new(
                &mut *surface,
                self.introspector.as_ref(),
                class,
                application.filter,
                &mut *notices,
            );
            application
                .strategy
                .apply(&mut context, application.property, application.value);
        }
        Ok(())
    }

    /// Plans the SQLite query of `operation` for one request.
    ///
    /// `uri_values` holds the values of the operation's URI variables, as
    /// matched from the request path.
    #[instrument(skip(self, operation, uri_values), fields(operation = %operation.name_or_default()))]
    pub fn build_query(
        &self,
        operation: &Operation,
        query: &str,
        uri_values: &IndexMap<String, String>,
    ) -> FilterResult<QueryPlan> {
        let class = resource_class(operation)?;
        let params = QueryParameters::parse(query);
        let mut builder = SqlQueryBuilder::for_class(class);
        let mut notices = NoticeLog::new();

        if let Some(uri_variables) = &operation.uri_variables {
            self.links
                .apply(&mut builder, class, uri_variables, uri_values)?;
        }
        self.apply(&mut builder, operation, &params, &mut notices)?;

        let pagination = Pagination::from_query(operation, &params, &mut notices);
        if let Some(page) = &pagination {
            builder.paginate(page.items_per_page, page.offset());
        }

        let query = builder.build();
        debug!(sql = %query.sql, params = query.params.len(), "Query planned");
        Ok(QueryPlan {
            query,
            notices: notices.into_notices(),
            pagination,
        })
    }
}

impl fmt::Debug for FilterEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterEngine")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn resource_class(operation: &Operation) -> FilterResult<&str> {
    operation
        .class
        .as_deref()
        .ok_or_else(|| FilterError::UnboundOperation {
            operation: operation.name_or_default().to_string(),
        })
}
