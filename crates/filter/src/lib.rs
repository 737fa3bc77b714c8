//! Meridian filter engine
//!
//! This crate turns the filter parameters of a resolved operation into one
//! parameterized SQL query. Filters are configured declaratively, describe
//! the parameters they accept, and report ignored input as notices instead
//! of failing the request.
//!
//! # Architecture
//!
//! - [`strategy`] - The filter strategies and their shared context
//! - [`registry`] - Declarative filter configuration and the registry operations refer to
//! - [`engine`] - Per-request planning: URI variables, filters, pagination
//! - [`links`] - Constraints derived from the links of URI variables
//! - [`sql`] - Predicates, the query surface and the SQLite builder
//! - [`value`] - Query string parsing into nested filter values
//! - [`property`] - Property path resolution and relation joins
//! - [`iri`] - IRI to identifier resolution for relation filters
//! - [`notice`] - Non-fatal notices about ignored input
//! - [`store`] - SQLite storage executing planned queries (`sqlite` feature)
//! - [`error`] - Construction and planning errors
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use indexmap::IndexMap;
//! use meridian_filter::{EngineCapabilities, FilterConfig, FilterEngine, FilterRegistry};
//! use meridian_metadata::introspection::{ClassCatalog, ClassDefinition, PropertyMetadata, PropertyType};
//! use meridian_metadata::{Operation, Parameter, Parameters};
//!
//! let catalog = ClassCatalog::new().with_class(
//!     "Book",
//!     ClassDefinition::new()
//!         .property("id", PropertyMetadata::identifier(PropertyType::Int))
//!         .property("title", PropertyMetadata::of(PropertyType::String)),
//! );
//!
//! let mut configs = IndexMap::new();
//! configs.insert(
//!     "book.search".to_string(),
//!     serde_json::from_str::<FilterConfig>(r#"{"type": "search", "properties": {"title": "partial"}}"#).unwrap(),
//! );
//! let registry = FilterRegistry::from_configs(&configs, None, EngineCapabilities::sqlite()).unwrap();
//! let engine = FilterEngine::new(Arc::new(registry), Arc::new(catalog));
//!
//! let operation = Operation::get_collection()
//!     .with_class("Book")
//!     .with_parameters(Parameters::new().with(Parameter::query("title").with_filter("book.search")));
//!
//! let plan = engine.build_query(&operation, "title=dune", &IndexMap::new()).unwrap();
//! assert_eq!(
//!     plan.query.sql,
//!     "SELECT o.* FROM book o WHERE o.title LIKE '%' || :title_p1 || '%' ORDER BY o.rowid ASC"
//! );
//! assert!(plan.notices.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod engine;
pub mod error;
pub mod iri;
pub mod links;
pub mod notice;
pub mod property;
pub mod registry;
pub mod sql;
#[cfg(feature = "sqlite")]
pub mod store;
pub mod strategy;
pub mod value;

pub use engine::{FilterEngine, Pagination, QueryPlan};
pub use error::{FilterError, FilterResult};
#[cfg(feature = "sqlite")]
pub use error::{StoreError, StoreResult};
pub use iri::{IriResolver, IriTarget, UriTemplateIriResolver};
pub use links::LinksHandler;
pub use notice::{FilterNotice, NoticeLog, NoticeSink};
pub use registry::{FilterConfig, FilterRegistry};
pub use sql::{SqlQuery, SqlQueryBuilder};
#[cfg(feature = "sqlite")]
pub use store::{SqliteStore, StoreConfig};
pub use strategy::{
    BackedEnumFilter, BooleanFilter, DateFilter, EngineCapabilities, ExistsFilter, FilterContext,
    FilterStrategy, FreeTextFilter, NumericFilter, OrderFilter, RangeFilter, SearchFilter,
    UuidFilter,
};
pub use value::{FilterValue, QueryParameters};
