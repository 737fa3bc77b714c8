//! IRI dereferencing.

use indexmap::IndexMap;
use meridian_metadata::ResourceDescriptorCollection;
use meridian_metadata::types::HttpMethod;
use meridian_metadata::uri_template;
use tracing::debug;

/// What an IRI designates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IriTarget {
    /// Resource class.
    pub class: String,
    /// URI variable values, in template order.
    pub identifiers: IndexMap<String, String>,
}

/// Turns resource IRIs back into identifiers.
pub trait IriResolver: Send + Sync {
    /// The resource designated by `iri`, if any.
    fn dereference(&self, iri: &str) -> Option<IriTarget>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IriRoute {
    class: String,
    template: String,
}

/// Resolves IRIs by matching their path against item URI templates.
///
/// Absolute IRIs are reduced to their path; query strings and fragments are
/// ignored.
///
/// ```
/// use meridian_filter::iri::{IriResolver, UriTemplateIriResolver};
///
/// let resolver = UriTemplateIriResolver::new().with_route("Book", "/books/{id}{._format}");
/// let target = resolver.dereference("https://example.com/books/12").unwrap();
/// assert_eq!(target.class, "Book");
/// assert_eq!(target.identifiers["id"], "12");
/// ```
#[derive(Debug, Clone, Default)]
pub struct UriTemplateIriResolver {
    routes: Vec<IriRoute>,
}

impl UriTemplateIriResolver {
    /// Creates a resolver without routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy resolving `template` (route prefix included) to `class`.
    pub fn with_route(mut self, class: impl Into<String>, template: impl Into<String>) -> Self {
        self.routes.push(IriRoute {
            class: class.into(),
            template: template.into(),
        });
        self
    }

    /// Routes every item read of resolved resources, not-exposed ones included.
    pub fn from_collections<'c, I>(collections: I) -> Self
    where
        I: IntoIterator<Item = &'c ResourceDescriptorCollection>,
    {
        let mut resolver = Self::new();
        for collection in collections {
            for operation in collection.iter().flat_map(|r| r.operations().iter()) {
                if operation.kind.is_collection() || operation.kind.method() != Some(HttpMethod::Get)
                {
                    continue;
                }
                if let Some(path) = operation.path() {
                    resolver = resolver.with_route(collection.class.clone(), path);
                }
            }
        }
        resolver
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true without routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn path_of(iri: &str) -> Option<String> {
    if iri.contains("://") {
        return url::Url::parse(iri).ok().map(|url| url.path().to_string());
    }
    let end = iri.find(['?', '#']).unwrap_or(iri.len());
    Some(iri[..end].to_string())
}

impl IriResolver for UriTemplateIriResolver {
    fn dereference(&self, iri: &str) -> Option<IriTarget> {
        let path = path_of(iri)?;
        let target = self.routes.iter().find_map(|route| {
            uri_template::match_path(&route.template, &path).map(|values| IriTarget {
                class: route.class.clone(),
                identifiers: values.into_iter().collect(),
            })
        });
        if target.is_none() {
            debug!(iri = %iri, "No route matches IRI");
        }
        target
    }
}
