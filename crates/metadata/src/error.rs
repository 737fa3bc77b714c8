//! Error types for metadata resolution.
//!
//! Every variant is a configuration error: resource definitions are authored
//! by developers, so a definition that cannot be resolved is reported when the
//! resource is resolved, never later while serving a request.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// Configuration error raised while resolving the metadata of a resource class.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// The class has no declared resource definition.
    #[error("class '{class}' is not a resource")]
    NotAResource { class: String },

    /// No identifier property could be discovered on a class that needs one.
    #[error("no identifier found on class '{class}'")]
    NoIdentifiers { class: String },

    /// A link points at a class that cannot provide identifiers.
    #[error("cannot resolve link '{parameter}' of '{class}': {message}")]
    UnresolvableLink {
        class: String,
        parameter: String,
        message: String,
    },

    /// Two operations of the same resource share a name.
    #[error("duplicate operation name '{name}' on resource '{class}'")]
    DuplicateOperationName { class: String, name: String },

    /// The URI template cannot be parsed.
    #[error("malformed URI template '{template}': {message}")]
    MalformedUriTemplate { template: String, message: String },

    /// A URI template variable has no matching link.
    #[error("URI template '{template}' uses variable '{variable}' which has no link")]
    UnknownUriVariable { template: String, variable: String },

    /// A filter referenced by name is not registered.
    #[error("filter '{filter}' referenced by '{class}' is not registered")]
    UnknownFilter { class: String, filter: String },
}

/// Result type alias for metadata resolution.
pub type MetadataResult<T> = Result<T, MetadataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_identifiers_display() {
        let err = MetadataError::NoIdentifiers {
            class: "App\\Entity\\Dummy".to_string(),
        };
        assert_eq!(err.to_string(), "no identifier found on class 'App\\Entity\\Dummy'");
    }

    #[test]
    fn test_unknown_uri_variable_display() {
        let err = MetadataError::UnknownUriVariable {
            template: "/books/{slug}".to_string(),
            variable: "slug".to_string(),
        };
        assert!(err.to_string().contains("'slug'"));
    }
}
