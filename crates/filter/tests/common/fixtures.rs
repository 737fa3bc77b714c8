//! Bookshop catalog, filter configuration and documents shared by the
//! integration tests.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Value, json};

use meridian_filter::{
    EngineCapabilities, FilterConfig, FilterEngine, FilterRegistry, QueryPlan, SqliteStore,
};
use meridian_metadata::factory::{InMemoryResourceSource, ResolverChain, ResourceMetadataFactory};
use meridian_metadata::introspection::{
    Association, ClassCatalog, ClassDefinition, PropertyMetadata, PropertyType,
};
use meridian_metadata::{Operation, ResolverConfig, ResourceDescriptor};

/// Filters declared on `Book`.
pub const BOOK_FILTERS: [&str; 8] = [
    "book.search",
    "book.numeric",
    "book.range",
    "book.date",
    "book.boolean",
    "book.exists",
    "book.order",
    "book.text",
];

/// `Book`, `Publisher`, `Review` and `Tag`.
pub fn bookshop_catalog() -> ClassCatalog {
    ClassCatalog::new()
        .with_class(
            "Book",
            ClassDefinition::new()
                .property("id", PropertyMetadata::identifier(PropertyType::Int))
                .property("title", PropertyMetadata::of(PropertyType::String))
                .property("author", PropertyMetadata::of(PropertyType::String).nullable())
                .property("pages", PropertyMetadata::of(PropertyType::Int))
                .property("price", PropertyMetadata::of(PropertyType::Float).nullable())
                .property("available", PropertyMetadata::of(PropertyType::Bool))
                .property(
                    "publishedAt",
                    PropertyMetadata::of(PropertyType::DateTime).nullable(),
                )
                .property(
                    "publisher",
                    PropertyMetadata::of(PropertyType::object("Publisher"))
                        .with_association(Association::to_one("Publisher")),
                )
                .property(
                    "reviews",
                    PropertyMetadata::of(PropertyType::collection_of("Review"))
                        .with_association(Association::to_many("Review", "book")),
                )
                .property(
                    "tags",
                    PropertyMetadata::of(PropertyType::collection_of("Tag")).with_association(
                        Association {
                            target_class: "Tag".to_string(),
                            collection: true,
                            ..Default::default()
                        },
                    ),
                ),
        )
        .with_class(
            "Publisher",
            ClassDefinition::new()
                .property("id", PropertyMetadata::identifier(PropertyType::Int))
                .property("name", PropertyMetadata::of(PropertyType::String)),
        )
        .with_class(
            "Review",
            ClassDefinition::new()
                .property("id", PropertyMetadata::identifier(PropertyType::Int))
                .property("rating", PropertyMetadata::of(PropertyType::Int))
                .property(
                    "book",
                    PropertyMetadata::of(PropertyType::object("Book"))
                        .with_association(Association::to_one("Book")),
                ),
        )
        .with_class(
            "Tag",
            ClassDefinition::new()
                .property("id", PropertyMetadata::identifier(PropertyType::Int))
                .property("label", PropertyMetadata::of(PropertyType::String)),
        )
}

/// Filter configuration of the bookshop, as a catalog file declares it.
pub fn bookshop_filters() -> IndexMap<String, FilterConfig> {
    serde_json::from_value(json!({
        "book.text": {
            "type": "free_text",
            "parameter": "q",
            "properties": ["title", "author", "publisher.name"],
            "filter": "book.search"
        },
        "book.search": {
            "type": "search",
            "properties": {"title": "ipartial", "author": "ipartial", "publisher.name": "exact", "tags.label": null}
        },
        "book.numeric": {"type": "numeric", "properties": ["pages"]},
        "book.range": {"type": "range", "properties": ["price"]},
        "book.date": {"type": "date", "properties": {"publishedAt": null}},
        "book.boolean": {"type": "boolean", "properties": ["available"]},
        "book.exists": {"type": "exists", "properties": ["author", "reviews", "publisher"]},
        "book.order": {
            "type": "order",
            "properties": {
                "title": null,
                "price": {"nulls_comparison": "nulls_always_last"},
                "pages": {"default_direction": "desc"}
            }
        }
    }))
    .expect("valid filter configuration")
}

/// Registry built from [`bookshop_filters`].
pub fn bookshop_registry() -> Arc<FilterRegistry> {
    Arc::new(
        FilterRegistry::from_configs(&bookshop_filters(), None, EngineCapabilities::sqlite())
            .expect("filters build"),
    )
}

/// `Book` with every bookshop filter, `/publishers/{publisherId}/books`
/// and `Publisher`.
pub fn bookshop_source() -> InMemoryResourceSource {
    InMemoryResourceSource::new()
        .with_resource("Book", ResourceDescriptor::new("Book").with_filters(BOOK_FILTERS))
        .with_resource(
            "Book",
            ResourceDescriptor::new("Book")
                .with_operations(vec![
                    Operation::get_collection()
                        .with_name("publisher_books")
                        .with_uri_template("/publishers/{publisherId}/books"),
                ])
                .with_filters(["book.search"]),
        )
        .with_resource("Publisher", ResourceDescriptor::new("Publisher"))
}

/// Standard chain whose filters come from `registry`.
pub fn bookshop_chain(registry: Arc<FilterRegistry>) -> ResolverChain {
    ResolverChain::standard(
        Arc::new(bookshop_source()),
        Arc::new(bookshop_catalog()),
        registry,
        ResolverConfig::default(),
    )
}

/// Ten books, five of them by an author whose name contains an `a` in
/// either case.
pub fn books() -> Vec<Value> {
    vec![
        json!({"id": 1, "title": "Dune", "author": "Frank Herbert", "pages": 412, "price": 9.5,
               "available": true, "publishedAt": "1965-08-01 00:00:00", "publisher": 1, "tags": [1, 2]}),
        json!({"id": 2, "title": "Emma", "author": "Jane Austen", "pages": 474, "price": 12.0,
               "available": false, "publishedAt": "1815-12-23 00:00:00", "publisher": 1}),
        json!({"id": 3, "title": "Ubik", "author": "Philip K. Dick", "pages": 202, "price": null,
               "available": true, "publishedAt": "1969-05-01 00:00:00", "tags": [2]}),
        json!({"id": 4, "title": "Solaris", "author": "Stanislaw Lem", "pages": 204, "price": 15.0,
               "available": false, "publishedAt": "1961-06-01 00:00:00", "publisher": 1}),
        json!({"id": 5, "title": "Neuromancer", "author": "William Gibson", "pages": 271, "price": 7.25,
               "available": true, "publishedAt": "1984-07-01 00:00:00", "publisher": 2}),
        json!({"id": 6, "title": "Brave New World", "author": "ALDOUS HUXLEY", "pages": 311, "price": 11.0,
               "available": false, "publishedAt": "1932-01-01 00:00:00", "publisher": 2}),
        json!({"id": 7, "title": "Kindred", "author": null, "pages": 264, "price": null,
               "available": true, "publishedAt": null}),
        json!({"id": 8, "title": "The Shadow of the Torturer", "author": "Gene Wolfe", "pages": 256,
               "price": 20.0, "available": false, "publishedAt": "1980-05-01 00:00:00"}),
        json!({"id": 9, "title": "Beloved", "author": "Toni Morrison", "pages": 324, "price": 8.0,
               "available": true, "publishedAt": "1987-09-01 00:00:00"}),
        json!({"id": 10, "title": "Ulysses", "author": "Joyce", "pages": 730, "price": 30.0,
               "available": false, "publishedAt": "1922-02-02 00:00:00"}),
    ]
}

/// In-memory store holding the bookshop documents.
pub fn bookshop_store() -> SqliteStore {
    let store = SqliteStore::in_memory(Arc::new(bookshop_catalog())).expect("store opens");
    store
        .insert_all(
            "Publisher",
            &[json!({"id": 1, "name": "Ace"}), json!({"id": 2, "name": "Penguin"})],
        )
        .expect("publishers load");
    store
        .insert_all(
            "Tag",
            &[json!({"id": 1, "label": "classic"}), json!({"id": 2, "label": "weird"})],
        )
        .expect("tags load");
    store.insert_all("Book", &books()).expect("books load");
    store
        .insert_all(
            "Review",
            &[
                json!({"id": 1, "rating": 5, "book": 1}),
                json!({"id": 2, "rating": 3, "book": 1}),
                json!({"id": 3, "rating": 4, "book": {"id": 2}}),
            ],
        )
        .expect("reviews load");
    store
}

/// Resolved metadata, registry, engine and store of the bookshop.
pub struct Bookshop {
    pub chain: ResolverChain,
    pub engine: FilterEngine,
    pub store: SqliteStore,
}

impl Bookshop {
    pub fn new() -> Self {
        let registry = bookshop_registry();
        Self {
            chain: bookshop_chain(Arc::clone(&registry)),
            engine: FilterEngine::new(registry, Arc::new(bookshop_catalog())),
            store: bookshop_store(),
        }
    }

    /// Resolved operation `name` of `Book`.
    pub fn operation(&self, name: &str) -> Operation {
        let book = self.chain.resolve("Book").expect("Book resolves");
        book.operation(Some(name), false)
            .cloned()
            .expect("operation exists")
    }

    /// Plans `query` on the `Book` collection.
    pub fn plan(&self, query: &str) -> QueryPlan {
        self.plan_on("_api_Book_get_collection", query, &IndexMap::new())
    }

    pub fn plan_on(
        &self,
        operation: &str,
        query: &str,
        uri_values: &IndexMap<String, String>,
    ) -> QueryPlan {
        self.engine
            .build_query(&self.operation(operation), query, uri_values)
            .expect("query plans")
    }

    /// Ids of the books `query` selects.
    pub fn ids(&self, query: &str) -> Vec<i64> {
        ids(&self.store.query("Book", &self.plan(query).query).expect("query runs"))
    }
}

/// The `id` of every row.
pub fn ids(rows: &[Value]) -> Vec<i64> {
    rows.iter().filter_map(|row| row["id"].as_i64()).collect()
}
