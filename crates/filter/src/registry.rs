//! Filter registry.
//!
//! Filters are registered under the names operations refer to them by. The
//! registry doubles as the [`FilterLocator`] the metadata resolver asks for
//! filter descriptions, so both sides always see the same filters.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use meridian_metadata::filter::{FilterDescriptor, FilterLocator};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FilterError, FilterResult};
use crate::iri::IriResolver;
use crate::strategy::{
    BackedEnumFilter, BooleanFilter, DateFilter, EngineCapabilities, ExistsFilter, FilterStrategy,
    FreeTextFilter, NullManagement, NumericFilter, OrderFilter, OrderProperty, RangeFilter,
    SearchFilter, UuidFilter,
};

/// Declarative configuration of one filter.
///
/// ```
/// use meridian_filter::FilterConfig;
///
/// let config: FilterConfig = serde_json::from_str(
///     r#"{"type": "search", "properties": {"title": "ipartial", "isbn": null}}"#,
/// ).unwrap();
/// assert!(matches!(config, FilterConfig::Search { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterConfig {
    /// [`SearchFilter`], `exact` for properties without a strategy.
    Search {
        /// Property to strategy name.
        #[serde(default)]
        properties: IndexMap<String, Option<String>>,
    },
    /// [`NumericFilter`].
    Numeric {
        /// Filtered properties, every eligible one when empty.
        #[serde(default)]
        properties: Vec<String>,
    },
    /// [`BooleanFilter`].
    Boolean {
        /// Filtered properties, every eligible one when empty.
        #[serde(default)]
        properties: Vec<String>,
    },
    /// [`DateFilter`].
    Date {
        /// Property to null policy.
        #[serde(default)]
        properties: IndexMap<String, Option<NullManagement>>,
    },
    /// [`RangeFilter`].
    Range {
        /// Filtered properties, every eligible one when empty.
        #[serde(default)]
        properties: Vec<String>,
    },
    /// [`ExistsFilter`].
    Exists {
        /// Filtered properties, every eligible one when empty.
        #[serde(default)]
        properties: Vec<String>,
        /// Query parameter, the filter's own default when absent.
        #[serde(default)]
        parameter: Option<String>,
    },
    /// [`OrderFilter`].
    Order {
        /// Property to sort settings.
        #[serde(default)]
        properties: IndexMap<String, Option<OrderProperty>>,
        /// Query parameter, the filter's own default when absent.
        #[serde(default)]
        parameter: Option<String>,
    },
    /// [`BackedEnumFilter`].
    BackedEnum {
        /// Filtered properties, every eligible one when empty.
        #[serde(default)]
        properties: Vec<String>,
    },
    /// [`FreeTextFilter`] wrapping the filter registered as `filter`.
    FreeText {
        /// Query parameter holding the searched text.
        parameter: String,
        /// Searched properties.
        properties: Vec<String>,
        /// Name of the wrapped filter.
        filter: String,
    },
    /// [`UuidFilter`].
    Uuid {
        /// Filtered properties, every eligible one when empty.
        #[serde(default)]
        properties: Vec<String>,
    },
}

impl FilterConfig {
    fn build(
        &self,
        name: &str,
        registry: &FilterRegistry,
        iri_resolver: Option<&Arc<dyn IriResolver>>,
        capabilities: &EngineCapabilities,
    ) -> FilterResult<Arc<dyn FilterStrategy>> {
        let filter: Arc<dyn FilterStrategy> = match self {
            FilterConfig::Search { properties } => {
                let mut search = SearchFilter::new(properties.clone())?;
                if let Some(resolver) = iri_resolver {
                    search = search.with_iri_resolver(Arc::clone(resolver));
                }
                Arc::new(search)
            }
            FilterConfig::Numeric { properties } => Arc::new(NumericFilter::new(properties.clone())),
            FilterConfig::Boolean { properties } => Arc::new(BooleanFilter::new(properties.clone())),
            FilterConfig::Date { properties } => Arc::new(DateFilter::new(properties.clone())),
            FilterConfig::Range { properties } => Arc::new(RangeFilter::new(properties.clone())),
            FilterConfig::Exists {
                properties,
                parameter,
            } => {
                let mut exists = ExistsFilter::new(properties.clone());
                if let Some(parameter) = parameter {
                    exists = exists.with_parameter(parameter.clone());
                }
                Arc::new(exists)
            }
            FilterConfig::Order {
                properties,
                parameter,
            } => {
                let properties = properties
                    .iter()
                    .map(|(property, settings)| (property.clone(), settings.unwrap_or_default()))
                    .collect();
                let mut order = OrderFilter::new(properties);
                if let Some(parameter) = parameter {
                    order = order.with_parameter(parameter.clone());
                }
                Arc::new(order)
            }
            FilterConfig::BackedEnum { properties } => {
                Arc::new(BackedEnumFilter::new(properties.clone()))
            }
            FilterConfig::FreeText {
                parameter,
                properties,
                filter,
            } => {
                let inner = registry.get_strategy(filter).ok_or_else(|| {
                    FilterError::InvalidConfiguration {
                        filter: name.to_string(),
                        message: format!("wrapped filter '{}' is not registered", filter),
                    }
                })?;
                if properties.is_empty() {
                    return Err(FilterError::InvalidConfiguration {
                        filter: name.to_string(),
                        message: "free text filters need at least one property".to_string(),
                    });
                }
                Arc::new(FreeTextFilter::new(
                    parameter.clone(),
                    properties.clone(),
                    Arc::clone(inner),
                ))
            }
            FilterConfig::Uuid { properties } => {
                Arc::new(UuidFilter::new(properties.clone(), capabilities)?)
            }
        };
        Ok(filter)
    }
}

/// Filters by name.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: IndexMap<String, Arc<dyn FilterStrategy>>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds every configured filter.
    ///
    /// Free text filters are built last so they can wrap any other filter
    /// regardless of declaration order.
    pub fn from_configs(
        configs: &IndexMap<String, FilterConfig>,
        iri_resolver: Option<Arc<dyn IriResolver>>,
        capabilities: EngineCapabilities,
    ) -> FilterResult<Self> {
        let mut registry = Self::new();
        let (composite, simple): (Vec<_>, Vec<_>) = configs
            .iter()
            .partition(|(_, config)| matches!(config, FilterConfig::FreeText { .. }));

        for (name, config) in simple.into_iter().chain(composite) {
            let filter = config.build(name, &registry, iri_resolver.as_ref(), &capabilities)?;
            registry.register(name.clone(), filter)?;
        }
        Ok(registry)
    }

    /// Registers `filter` under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        filter: Arc<dyn FilterStrategy>,
    ) -> FilterResult<()> {
        let name = name.into();
        if self.filters.contains_key(&name) {
            return Err(FilterError::DuplicateFilter { name });
        }
        debug!(filter = %name, "Filter registered");
        self.filters.insert(name, filter);
        Ok(())
    }

    /// Returns a copy with `filter` registered under `name`.
    pub fn with_filter(
        mut self,
        name: impl Into<String>,
        filter: Arc<dyn FilterStrategy>,
    ) -> FilterResult<Self> {
        self.register(name, filter)?;
        Ok(self)
    }

    /// The strategy registered under `name`.
    pub fn get_strategy(&self, name: &str) -> Option<&Arc<dyn FilterStrategy>> {
        self.filters.get(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl FilterLocator for FilterRegistry {
    fn has(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<&dyn FilterDescriptor> {
        self.filters
            .get(name)
            .map(|filter| filter.as_ref() as &dyn FilterDescriptor)
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.filters.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn configs(value: serde_json::Value) -> IndexMap<String, FilterConfig> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_from_configs() {
        // Parsed from text (not `json!`) so declaration order reaches the IndexMap.
        let configs: IndexMap<String, FilterConfig> = serde_json::from_str(r#"{
            "book.text": {"type": "free_text", "parameter": "q", "properties": ["title"], "filter": "book.search"},
            "book.search": {"type": "search", "properties": {"title": "ipartial"}},
            "book.order": {"type": "order", "properties": {"title": null, "author": {"nulls_comparison": "nulls_always_last"}}},
            "book.date": {"type": "date", "properties": {"publishedAt": "include_null_after"}}
        }"#)
        .unwrap();
        let registry =
            FilterRegistry::from_configs(&configs, None, EngineCapabilities::default()).unwrap();

        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["book.search", "book.order", "book.date", "book.text"]
        );
        assert!(registry.has("book.text"));
        assert!(registry.get("book.order").is_some());
        assert!(registry.get("book.missing").is_none());
    }

    #[test]
    fn test_configuration_errors() {
        let missing = configs(json!({
            "text": {"type": "free_text", "parameter": "q", "properties": ["title"], "filter": "nope"},
        }));
        assert!(matches!(
            FilterRegistry::from_configs(&missing, None, EngineCapabilities::default()),
            Err(FilterError::InvalidConfiguration { .. })
        ));

        let unknown = configs(json!({"s": {"type": "search", "properties": {"title": "fuzzy"}}}));
        assert!(matches!(
            FilterRegistry::from_configs(&unknown, None, EngineCapabilities::default()),
            Err(FilterError::UnknownStrategy { .. })
        ));

        let uuid = configs(json!({"u": {"type": "uuid", "properties": ["isbn"]}}));
        assert!(matches!(
            FilterRegistry::from_configs(&uuid, None, EngineCapabilities::default()),
            Err(FilterError::UnsupportedStorageFeature { .. })
        ));
        assert!(FilterRegistry::from_configs(&uuid, None, EngineCapabilities::sqlite()).is_ok());
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = FilterRegistry::new();
        registry
            .register("bool", Arc::new(BooleanFilter::default()))
            .unwrap();
        assert_eq!(
            registry.register("bool", Arc::new(BooleanFilter::default())),
            Err(FilterError::DuplicateFilter {
                name: "bool".to_string()
            })
        );
    }
}
