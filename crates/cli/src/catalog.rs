//! Catalog files and the application assembled from them.
//!
//! A catalog file is one JSON document:
//!
//! ```json
//! {
//!   "classes": {"Book": {"properties": {"id": {"identifier": true, "types": [{"type": "int"}]}}}},
//!   "resources": {"Book": [{"filters": ["book.search"]}]},
//!   "filters": {"book.search": {"type": "search", "properties": {"title": "ipartial"}}},
//!   "resolver": {"routePrefix": "/api"},
//!   "data": {"Book": [{"id": 1}]}
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use indexmap::IndexMap;
use meridian_filter::{
    EngineCapabilities, FilterConfig, FilterEngine, FilterRegistry, UriTemplateIriResolver,
};
use meridian_metadata::factory::{InMemoryResourceSource, ResolverChain};
use meridian_metadata::introspection::ClassCatalog;
use meridian_metadata::{ResolverConfig, ResourceDescriptor, ResourceDescriptorCollection};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Contents of a catalog file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFile {
    /// Property schemas by class.
    pub classes: ClassCatalog,
    /// Resource descriptors by class.
    pub resources: IndexMap<String, Vec<ResourceDescriptor>>,
    /// Filter configurations by name.
    pub filters: IndexMap<String, FilterConfig>,
    /// Resolver defaults.
    pub resolver: Option<ResolverConfig>,
    /// Documents by class, loaded into databases.
    pub data: IndexMap<String, Vec<Value>>,
}

impl CatalogFile {
    /// Reads a catalog file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read catalog {}", path.display()))?;
        let catalog: Self = serde_json::from_str(&raw)
            .with_context(|| format!("invalid catalog {}", path.display()))?;
        debug!(
            path = %path.display(),
            classes = catalog.classes.class_names().count(),
            filters = catalog.filters.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    fn source(&self) -> InMemoryResourceSource {
        let mut source = InMemoryResourceSource::new();
        for (class, descriptors) in &self.resources {
            for descriptor in descriptors {
                source.add(class.clone(), descriptor.clone());
            }
        }
        source
    }
}

/// Resolved metadata and the filter engine of one catalog.
#[derive(Debug)]
pub struct Application {
    classes: Arc<ClassCatalog>,
    collections: IndexMap<String, ResourceDescriptorCollection>,
    engine: FilterEngine,
    data: IndexMap<String, Vec<Value>>,
}

impl Application {
    /// Resolves every resource of `catalog` and builds its filters.
    ///
    /// Relation filters dereference IRIs through the item routes of the
    /// resolved resources.
    pub fn new(catalog: CatalogFile) -> anyhow::Result<Self> {
        let classes = Arc::new(catalog.classes.clone());
        let capabilities = EngineCapabilities::sqlite();

        let descriptions = FilterRegistry::from_configs(&catalog.filters, None, capabilities)
            .context("invalid filter configuration")?;
        let chain = ResolverChain::standard(
            Arc::new(catalog.source()),
            classes.clone(),
            Arc::new(descriptions),
            catalog.resolver.clone().unwrap_or_default(),
        );
        let collections: IndexMap<String, ResourceDescriptorCollection> = chain
            .resolve_all()
            .context("invalid resource metadata")?
            .into_iter()
            .map(|collection| (collection.class.clone(), collection))
            .collect();

        let iri_resolver = UriTemplateIriResolver::from_collections(collections.values());
        let registry = FilterRegistry::from_configs(
            &catalog.filters,
            Some(Arc::new(iri_resolver)),
            capabilities,
        )
        .context("invalid filter configuration")?;

        info!(
            resources = collections.len(),
            filters = registry.len(),
            "Catalog resolved"
        );
        Ok(Self {
            engine: FilterEngine::new(Arc::new(registry), classes.clone()),
            classes,
            collections,
            data: catalog.data,
        })
    }

    /// Class catalog.
    pub fn classes(&self) -> &Arc<ClassCatalog> {
        &self.classes
    }

    /// Resolved metadata of `class`.
    pub fn collection(&self, class: &str) -> anyhow::Result<&ResourceDescriptorCollection> {
        self.collections
            .get(class)
            .with_context(|| format!("'{}' is not a resource class", class))
    }

    /// Resolved metadata of every class.
    pub fn collections(&self) -> impl Iterator<Item = &ResourceDescriptorCollection> {
        self.collections.values()
    }

    /// Filter engine.
    pub fn engine(&self) -> &FilterEngine {
        &self.engine
    }

    /// Documents of the catalog's `data` section.
    pub fn data(&self) -> &IndexMap<String, Vec<Value>> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> CatalogFile {
        serde_json::from_value(json!({
            "classes": {
                "Book": {"properties": {
                    "id": {"identifier": true, "types": [{"type": "int"}]},
                    "title": {"types": [{"type": "string"}]}
                }}
            },
            "resources": {"Book": [{"filters": ["book.search"]}]},
            "filters": {"book.search": {"type": "search", "properties": {"title": "ipartial"}}},
            "data": {"Book": [{"id": 1, "title": "Dune"}, {"id": 2, "title": "Emma"}]}
        }))
        .unwrap()
    }

    #[test]
    fn test_application_resolves_catalog() {
        let app = Application::new(catalog()).unwrap();
        let book = app.collection("Book").unwrap();
        assert!(book.operation(Some("_api_Book_get_collection"), false).is_some());
        assert_eq!(app.engine().registry().len(), 1);
        assert_eq!(app.data()["Book"].len(), 2);
        assert!(app.collection("Author").is_err());
    }

    #[test]
    fn test_invalid_filter_configuration() {
        let mut catalog = catalog();
        catalog.filters = serde_json::from_value(json!({
            "book.search": {"type": "search", "properties": {"title": "fuzzy"}}
        }))
        .unwrap();
        let error = Application::new(catalog).unwrap_err();
        assert!(error.to_string().contains("invalid filter configuration"));
    }

    #[test]
    fn test_load_reports_path() {
        let error = CatalogFile::load(Path::new("/nonexistent/meridian.json")).unwrap_err();
        assert!(error.to_string().contains("/nonexistent/meridian.json"));
    }
}
