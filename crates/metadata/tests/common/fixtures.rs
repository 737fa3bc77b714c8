//! Class catalogs, resource sources and filters shared by the integration
//! tests.

use std::sync::Arc;

use indexmap::IndexMap;

use meridian_metadata::factory::{InMemoryResourceSource, ResolverChain};
use meridian_metadata::filter::{FilterDescription, FilterDescriptor, FilterLocator};
use meridian_metadata::introspection::{
    Association, ClassCatalog, ClassDefinition, PropertyIntrospector, PropertyMetadata,
    PropertyType,
};
use meridian_metadata::{ResolverConfig, ResourceDescriptor};

/// `Book`, `Author`, `Company`, `Employee` and `Edition` (composite
/// identifier).
pub fn library_catalog() -> ClassCatalog {
    ClassCatalog::new()
        .with_class(
            "Book",
            ClassDefinition::new()
                .property("id", PropertyMetadata::identifier(PropertyType::Int))
                .property("title", PropertyMetadata::of(PropertyType::String))
                .property("author", PropertyMetadata::of(PropertyType::String).nullable()),
        )
        .with_class(
            "Author",
            ClassDefinition::new()
                .property("id", PropertyMetadata::identifier(PropertyType::Int))
                .property("name", PropertyMetadata::of(PropertyType::String)),
        )
        .with_class(
            "Company",
            ClassDefinition::new()
                .property("id", PropertyMetadata::identifier(PropertyType::Int))
                .property("name", PropertyMetadata::of(PropertyType::String))
                .property(
                    "employees",
                    PropertyMetadata::of(PropertyType::collection_of("Employee"))
                        .with_association(Association::to_many("Employee", "company")),
                ),
        )
        .with_class(
            "Employee",
            ClassDefinition::new()
                .property("id", PropertyMetadata::identifier(PropertyType::Int))
                .property("name", PropertyMetadata::of(PropertyType::String))
                .property(
                    "company",
                    PropertyMetadata::of(PropertyType::object("Company"))
                        .with_association(Association::to_one("Company")),
                ),
        )
        .with_class(
            "Edition",
            ClassDefinition::new()
                .property("isbn", PropertyMetadata::identifier(PropertyType::String))
                .property("year", PropertyMetadata::identifier(PropertyType::Int))
                .property("publisher", PropertyMetadata::of(PropertyType::String)),
        )
}

/// Filter describing a partial search on each listed property.
pub struct SearchFilterStub {
    pub properties: Vec<&'static str>,
}

impl FilterDescriptor for SearchFilterStub {
    fn description(
        &self,
        resource_class: &str,
        introspector: &dyn PropertyIntrospector,
    ) -> IndexMap<String, FilterDescription> {
        let known = introspector.list_properties(resource_class);
        self.properties
            .iter()
            .filter(|p| known.iter().any(|k| k == *p))
            .flat_map(|p| {
                [
                    (
                        p.to_string(),
                        FilterDescription::new(*p, "string").with_strategy("partial"),
                    ),
                    (
                        format!("{}[]", p),
                        FilterDescription::new(*p, "string")
                            .with_strategy("partial")
                            .with_collection(true),
                    ),
                ]
            })
            .collect()
    }
}

/// Locator holding named filter stubs.
#[derive(Default)]
pub struct StubLocator {
    filters: IndexMap<String, Box<dyn FilterDescriptor>>,
}

impl StubLocator {
    pub fn with(mut self, name: &str, filter: impl FilterDescriptor + 'static) -> Self {
        self.filters.insert(name.to_string(), Box::new(filter));
        self
    }
}

impl FilterLocator for StubLocator {
    fn has(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<&dyn FilterDescriptor> {
        self.filters.get(name).map(|f| f.as_ref())
    }
}

/// Standard chain over the library catalog.
pub fn chain_for(source: InMemoryResourceSource, config: ResolverConfig) -> ResolverChain {
    let filters = StubLocator::default().with(
        "book.search",
        SearchFilterStub {
            properties: vec!["title", "author"],
        },
    );
    ResolverChain::standard(
        Arc::new(source),
        Arc::new(library_catalog()),
        Arc::new(filters),
        config,
    )
}

/// Source declaring every library class with no operations.
pub fn library_source() -> InMemoryResourceSource {
    ["Book", "Author", "Company", "Employee", "Edition"]
        .into_iter()
        .fold(InMemoryResourceSource::new(), |source, class| {
            source.with_resource(class, ResourceDescriptor::new(class))
        })
}
