//! Operation model.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::link::Link;
use super::parameter::Parameters;

/// Content types by format name (`jsonld => [application/ld+json]`).
pub type Formats = IndexMap<String, Vec<String>>;

/// URI variables by name.
pub type UriVariables = IndexMap<String, Link>;

/// Open bag of vendor extensions.
///
/// Consumers must pass unknown keys through untouched; the bag is not a
/// closed schema.
pub type ExtraProperties = BTreeMap<String, Value>;

/// HTTP verbs used by operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
            HttpMethod::Patch => write!(f, "PATCH"),
            HttpMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// What an operation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Read one item.
    Get,
    /// Read a collection.
    GetCollection,
    /// Create an item.
    Post,
    /// Replace an item.
    Put,
    /// Partially update an item.
    Patch,
    /// Delete an item.
    Delete,
    /// Internal, non-routed item operation used for IRI generation only.
    NotExposed,
    /// GraphQL item query.
    #[serde(rename = "graphql_query")]
    GraphQlQuery,
    /// GraphQL collection query.
    #[serde(rename = "graphql_query_collection")]
    GraphQlQueryCollection,
    /// GraphQL create mutation.
    #[serde(rename = "graphql_create")]
    GraphQlCreate,
    /// GraphQL update mutation.
    #[serde(rename = "graphql_update")]
    GraphQlUpdate,
    /// GraphQL delete mutation.
    #[serde(rename = "graphql_delete")]
    GraphQlDelete,
}

impl OperationKind {
    /// The standard HTTP CRUD set, in synthesis order.
    pub const HTTP_DEFAULTS: [OperationKind; 6] = [
        OperationKind::Get,
        OperationKind::GetCollection,
        OperationKind::Post,
        OperationKind::Put,
        OperationKind::Patch,
        OperationKind::Delete,
    ];

    /// The standard GraphQL set, in synthesis order.
    pub const GRAPHQL_DEFAULTS: [OperationKind; 5] = [
        OperationKind::GraphQlQuery,
        OperationKind::GraphQlQueryCollection,
        OperationKind::GraphQlCreate,
        OperationKind::GraphQlUpdate,
        OperationKind::GraphQlDelete,
    ];

    /// HTTP verb, `None` for GraphQL operations.
    pub fn method(&self) -> Option<HttpMethod> {
        match self {
            OperationKind::Get | OperationKind::GetCollection | OperationKind::NotExposed => {
                Some(HttpMethod::Get)
            }
            OperationKind::Post => Some(HttpMethod::Post),
            OperationKind::Put => Some(HttpMethod::Put),
            OperationKind::Patch => Some(HttpMethod::Patch),
            OperationKind::Delete => Some(HttpMethod::Delete),
            _ => None,
        }
    }

    /// Returns true for operations returning a collection.
    ///
    /// `Post` counts as a collection operation: it is routed on the
    /// collection path and carries no identifier.
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            OperationKind::GetCollection
                | OperationKind::Post
                | OperationKind::GraphQlQueryCollection
                | OperationKind::GraphQlCreate
        )
    }

    /// Returns true for GraphQL operations.
    pub fn is_graphql(&self) -> bool {
        matches!(
            self,
            OperationKind::GraphQlQuery
                | OperationKind::GraphQlQueryCollection
                | OperationKind::GraphQlCreate
                | OperationKind::GraphQlUpdate
                | OperationKind::GraphQlDelete
        )
    }

    /// Returns true for operations that receive a request body.
    pub fn accepts_input(&self) -> bool {
        matches!(
            self,
            OperationKind::Post | OperationKind::Put | OperationKind::Patch
        )
    }

    /// Suffix distinguishing collection operation names.
    fn name_suffix(&self) -> &'static str {
        if matches!(self, OperationKind::GetCollection) {
            "_collection"
        } else {
            ""
        }
    }
}

/// Builds the default name of an HTTP operation.
///
/// `_api_{routePrefix}{uriTemplate}_{method}` with `_collection` appended for
/// collection reads. The short name stands in for an unset template. GraphQL
/// operations are named after their kind.
pub fn default_operation_name(operation: &Operation, short_name: &str) -> String {
    match operation.kind {
        OperationKind::GraphQlQuery => return "item_query".to_string(),
        OperationKind::GraphQlQueryCollection => return "collection_query".to_string(),
        OperationKind::GraphQlCreate => return "create".to_string(),
        OperationKind::GraphQlUpdate => return "update".to_string(),
        OperationKind::GraphQlDelete => return "delete".to_string(),
        _ => {}
    }

    let path = format!(
        "{}{}",
        operation.route_prefix.as_deref().unwrap_or(""),
        operation
            .uri_template
            .as_deref()
            .or(operation.short_name.as_deref())
            .unwrap_or(short_name)
    );
    let method = operation
        .kind
        .method()
        .map(|m| m.to_string().to_lowercase())
        .unwrap_or_default();

    format!("_api_{}_{}{}", path, method, operation.kind.name_suffix())
}

/// One exposed action on a resource.
///
/// Unset (`None`) fields fall back to the owning resource's defaults during
/// resolution. Operations are values: stages replace them wholesale instead of
/// mutating them once they sit in a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// What the operation does.
    pub kind: OperationKind,
    /// Unique key within the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// RFC 6570 path template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri_template: Option<String>,
    /// Prefix prepended to the template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_prefix: Option<String>,
    /// Path variables bound to links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri_variables: Option<UriVariables>,
    /// Owning resource class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Short name of the owning resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Formats accepted and produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<Formats>,
    /// Formats accepted as request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_formats: Option<Formats>,
    /// Formats produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_formats: Option<Formats>,
    /// Filters declared by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<String>>,
    /// Recognized parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Parameters>,
    /// Access control expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    /// Message returned when `security` denies access.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_message: Option<String>,
    /// Opaque reference to the state provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Opaque reference to the state processor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor: Option<String>,
    /// Whether the provider is called.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    /// Whether a response body is produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<bool>,
    /// Whether collection results are paginated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination_enabled: Option<bool>,
    /// Default page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination_items_per_page: Option<u64>,
    /// Upper bound for client-requested page sizes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination_maximum_items_per_page: Option<u64>,
    /// Vendor extensions.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_properties: ExtraProperties,
}

impl Operation {
    /// Creates an operation of the given kind with every field unset.
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            name: None,
            uri_template: None,
            route_prefix: None,
            uri_variables: None,
            class: None,
            short_name: None,
            description: None,
            formats: None,
            input_formats: None,
            output_formats: None,
            filters: None,
            parameters: None,
            security: None,
            security_message: None,
            provider: None,
            processor: None,
            read: None,
            output: None,
            pagination_enabled: None,
            pagination_items_per_page: None,
            pagination_maximum_items_per_page: None,
            extra_properties: ExtraProperties::new(),
        }
    }

    /// Shorthand for a single-item read.
    pub fn get() -> Self {
        Self::new(OperationKind::Get)
    }

    /// Shorthand for a collection read.
    pub fn get_collection() -> Self {
        Self::new(OperationKind::GetCollection)
    }

    /// Returns a copy with the given name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns a copy with the given URI template.
    pub fn with_uri_template(mut self, template: impl Into<String>) -> Self {
        self.uri_template = Some(template.into());
        self
    }

    /// Returns a copy with the given route prefix.
    pub fn with_route_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.route_prefix = Some(prefix.into());
        self
    }

    /// Returns a copy with the given URI variables.
    pub fn with_uri_variables(mut self, variables: UriVariables) -> Self {
        self.uri_variables = Some(variables);
        self
    }

    /// Returns a copy owned by `class`.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Returns a copy with the given short name.
    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }

    /// Returns a copy with the given formats.
    pub fn with_formats(mut self, formats: Formats) -> Self {
        self.formats = Some(formats);
        self
    }

    /// Returns a copy declaring the given filters.
    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = Some(filters.into_iter().map(Into::into).collect());
        self
    }

    /// Returns a copy with the given parameters.
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Returns a copy with the given security expression.
    pub fn with_security(mut self, security: impl Into<String>) -> Self {
        self.security = Some(security.into());
        self
    }

    /// Returns a copy with the given provider reference.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Returns a copy with the given processor reference.
    pub fn with_processor(mut self, processor: impl Into<String>) -> Self {
        self.processor = Some(processor.into());
        self
    }

    /// Returns a copy with one extra property set.
    pub fn with_extra_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_properties.insert(key.into(), value);
        self
    }

    /// Resolved name, empty until the naming stage ran.
    pub fn name_or_default(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    /// Full path template including the route prefix.
    pub fn path(&self) -> Option<String> {
        self.uri_template.as_ref().map(|template| {
            format!("{}{}", self.route_prefix.as_deref().unwrap_or(""), template)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name_from_short_name() {
        let op = Operation::get();
        assert_eq!(default_operation_name(&op, "Foo"), "_api_Foo_get");

        let op = Operation::get_collection();
        assert_eq!(default_operation_name(&op, "Foo"), "_api_Foo_get_collection");
    }

    #[test]
    fn test_default_name_from_uri_template() {
        let op = Operation::get().with_uri_template("/foo");
        assert_eq!(default_operation_name(&op, "Foo"), "_api_/foo_get");

        let op = Operation::new(OperationKind::Post)
            .with_route_prefix("/admin")
            .with_uri_template("/foo");
        assert_eq!(default_operation_name(&op, "Foo"), "_api_/admin/foo_post");
    }

    #[test]
    fn test_graphql_names() {
        let op = Operation::new(OperationKind::GraphQlQueryCollection);
        assert_eq!(default_operation_name(&op, "Foo"), "collection_query");
        assert!(op.kind.is_graphql());
        assert_eq!(op.kind.method(), None);
    }

    #[test]
    fn test_kind_serde() {
        let kind: OperationKind = serde_json::from_str("\"get_collection\"").unwrap();
        assert_eq!(kind, OperationKind::GetCollection);

        let kind: OperationKind = serde_json::from_str("\"graphql_query\"").unwrap();
        assert_eq!(kind, OperationKind::GraphQlQuery);
    }

    #[test]
    fn test_deserialize_operation() {
        let op: Operation = serde_json::from_value(serde_json::json!({
            "kind": "get",
            "uriTemplate": "/books/{id}",
            "extraProperties": {"vendor": 1},
        }))
        .unwrap();

        assert_eq!(op.kind, OperationKind::Get);
        assert_eq!(op.uri_template.as_deref(), Some("/books/{id}"));
        assert_eq!(op.extra_properties.get("vendor"), Some(&serde_json::json!(1)));
    }
}
