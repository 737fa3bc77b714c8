//! Resolver configuration.
//!
//! Global defaults the resolver chain falls back to when neither the operation
//! nor its resource declares a value.
//!
//! # Example
//!
//! ```rust
//! use meridian_metadata::{PathSegmentStyle, ResolverConfig};
//!
//! let config = ResolverConfig {
//!     route_prefix: Some("/api".to_string()),
//!     path_segment_style: PathSegmentStyle::Dash,
//!     ..Default::default()
//! };
//! assert_eq!(config.formats["jsonld"], vec!["application/ld+json"]);
//! ```

use serde::{Deserialize, Serialize};

use crate::naming::PathSegmentStyle;
use crate::types::Formats;

/// Defaults applied by the resolver chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolverConfig {
    /// Prefix for every generated template, unless the resource sets one.
    pub route_prefix: Option<String>,
    /// Convention for path segments of generated templates.
    pub path_segment_style: PathSegmentStyle,
    /// Default formats.
    pub formats: Formats,
    /// Request body formats for `patch` operations.
    pub patch_formats: Formats,
    /// Synthesize GraphQL operations for resources that declare none.
    pub graphql_enabled: bool,
    /// Default pagination switch for collection operations.
    pub pagination_enabled: bool,
    /// Default page size.
    pub pagination_items_per_page: u64,
    /// Default maximum page size, `None` for unbounded.
    pub pagination_maximum_items_per_page: Option<u64>,
    /// Synthesize a not-exposed item operation for resources without one.
    pub not_exposed_enabled: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            route_prefix: None,
            path_segment_style: PathSegmentStyle::default(),
            formats: single_format("jsonld", "application/ld+json"),
            patch_formats: single_format("json", "application/merge-patch+json"),
            graphql_enabled: false,
            pagination_enabled: true,
            pagination_items_per_page: 30,
            pagination_maximum_items_per_page: None,
            not_exposed_enabled: true,
        }
    }
}

fn single_format(name: &str, mime_type: &str) -> Formats {
    let mut formats = Formats::new();
    formats.insert(name.to_string(), vec![mime_type.to_string()]);
    formats
}
