//! Filter strategies.
//!
//! Every strategy follows the same rules:
//!
//! - an unmapped property, a missing value or an unresolvable relation
//!   leaves the surface untouched;
//! - values failing coercion are dropped with a [`FilterNotice`];
//! - relations on a nested path are joined once per path prefix before the
//!   predicate is added;
//! - case-insensitive matching lower-cases both sides.
//!
//! | Strategy | Parameters |
//! |----------|------------|
//! | [`SearchFilter`] | `prop`, `prop[]` |
//! | [`NumericFilter`] | `prop`, `prop[]` |
//! | [`BooleanFilter`] | `prop` |
//! | [`DateFilter`] | `prop[after]`, `prop[before]`, `prop[strictly_after]`, `prop[strictly_before]` |
//! | [`RangeFilter`] | `prop[between]`, `prop[gt]`, `prop[gte]`, `prop[lt]`, `prop[lte]` |
//! | [`ExistsFilter`] | `exists[prop]` |
//! | [`OrderFilter`] | `order[prop]` |
//! | [`BackedEnumFilter`] | `prop`, `prop[]` |
//! | [`FreeTextFilter`] | one parameter across several properties |
//! | [`UuidFilter`] | `prop`, `prop[]` |

mod backed_enum;
mod binary_uuid;
mod boolean;
mod date;
mod exists;
mod free_text;
mod numeric;
mod order;
mod range;
mod search;

pub use backed_enum::BackedEnumFilter;
pub use binary_uuid::UuidFilter;
pub use boolean::BooleanFilter;
pub use date::{DateBound, DateFilter, NullManagement};
pub use exists::ExistsFilter;
pub use free_text::FreeTextFilter;
pub use numeric::NumericFilter;
pub use order::{NullsComparison, OrderFilter, OrderProperty};
pub use range::RangeFilter;
pub use search::{MatchKind, MatchStrategy, SearchFilter};

use meridian_metadata::filter::FilterDescriptor;
use meridian_metadata::introspection::{PropertyIntrospector, PropertyMetadata};

use crate::notice::{FilterNotice, NoticeSink};
use crate::property::{self, ResolvedProperty};
use crate::sql::{JoinType, QuerySurface};
use crate::value::{FilterValue, QueryParameters};

/// Storage features available to filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineCapabilities {
    /// UUIDs can be stored and compared as 16-byte binaries.
    pub binary_uuid: bool,
}

impl EngineCapabilities {
    /// Capabilities of the SQLite store.
    pub fn sqlite() -> Self {
        Self { binary_uuid: true }
    }
}

/// Everything a strategy needs while it is applied.
pub struct FilterContext<'a> {
    /// Query under construction.
    pub surface: &'a mut dyn QuerySurface,
    /// Property metadata.
    pub introspector: &'a dyn PropertyIntrospector,
    /// Queried class.
    pub resource_class: &'a str,
    /// Name the filter is registered under.
    pub filter_name: &'a str,
    /// Receives input notices.
    pub notices: &'a mut dyn NoticeSink,
}

impl<'a> FilterContext<'a> {
    /// Creates a context.
    pub fn new(
        surface: &'a mut dyn QuerySurface,
        introspector: &'a dyn PropertyIntrospector,
        resource_class: &'a str,
        filter_name: &'a str,
        notices: &'a mut dyn NoticeSink,
    ) -> Self {
        Self {
            surface,
            introspector,
            resource_class,
            filter_name,
            notices,
        }
    }

    /// Reports ignored input on `property`.
    pub fn notice(&mut self, property: &str, reason: impl Into<String>) {
        self.notices.notice(FilterNotice {
            filter: self.filter_name.to_string(),
            property: property.to_string(),
            reason: reason.into(),
        });
    }

    /// Leaf metadata of `property` without joining anything.
    pub fn describe(&self, property: &str) -> Option<PropertyMetadata> {
        property::describe_path(self.introspector, self.resource_class, property)
            .and_then(|mut segments| segments.pop())
            .map(|segment| segment.metadata)
    }

    /// Joins the relations on `property` and describes its leaf.
    pub fn resolve(&mut self, property: &str, join_type: JoinType) -> Option<ResolvedProperty> {
        property::join_path(
            self.surface,
            self.introspector,
            self.resource_class,
            property,
            join_type,
        )
    }
}

/// A filter translating request values into predicates.
pub trait FilterStrategy: FilterDescriptor {
    /// Adds the predicates for `value` on `property`.
    fn apply(&self, context: &mut FilterContext<'_>, property: &str, value: &FilterValue);

    /// The value this filter reads for `property`.
    fn extract_value<'q>(
        &self,
        parameters: &'q QueryParameters,
        property: &str,
    ) -> Option<&'q FilterValue> {
        parameters.get(property)
    }
}

/// Properties a filter applies to: the configured ones, or every property of
/// the class when none are configured.
fn selected_properties(
    configured: &[String],
    introspector: &dyn PropertyIntrospector,
    class: &str,
) -> Vec<String> {
    if configured.is_empty() {
        introspector.list_properties(class)
    } else {
        configured.to_vec()
    }
}

fn is_enabled(configured: &[String], property: &str) -> bool {
    configured.is_empty() || configured.iter().any(|p| p == property)
}

/// Non-empty scalar values of `value`.
fn non_empty_values(value: &FilterValue) -> Vec<&str> {
    value.values().into_iter().filter(|v| !v.is_empty()).collect()
}

/// Parses the literal forms of a boolean.
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") || value == "1" {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") || value == "0" {
        Some(false)
    } else {
        None
    }
}
