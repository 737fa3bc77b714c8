//! Meridian resource metadata
//!
//! This crate turns declarative resource definitions into fully specified,
//! immutable operation metadata: names, URI templates, links between
//! resources, content formats and filter parameters.
//!
//! # Architecture
//!
//! - [`types`] - Links, operations, parameters and resource descriptors
//! - [`introspection`] - Property introspection contracts and an in-memory class catalog
//! - [`factory`] - The resolver chain, its stages and a memoizing resolver
//! - [`filter`] - Self-description contracts implemented by filters
//! - [`naming`] - Path segment conventions
//! - [`uri_template`] - RFC 6570 helpers
//! - [`error`] - Configuration errors
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use meridian_metadata::factory::{InMemoryResourceSource, ResolverChain, ResourceMetadataFactory};
//! use meridian_metadata::filter::NoFilters;
//! use meridian_metadata::introspection::{ClassCatalog, ClassDefinition, PropertyMetadata, PropertyType};
//! use meridian_metadata::{ResolverConfig, ResourceDescriptor};
//!
//! let catalog = ClassCatalog::new().with_class(
//!     "Book",
//!     ClassDefinition::new()
//!         .property("id", PropertyMetadata::identifier(PropertyType::Int))
//!         .property("title", PropertyMetadata::of(PropertyType::String)),
//! );
//! let source = InMemoryResourceSource::new().with_resource("Book", ResourceDescriptor::new("Book"));
//!
//! let chain = ResolverChain::standard(
//!     Arc::new(source),
//!     Arc::new(catalog),
//!     Arc::new(NoFilters),
//!     ResolverConfig::default(),
//! );
//!
//! let book = chain.resolve("Book").unwrap();
//! let get = book.operation(Some("_api_Book_get"), false).unwrap();
//! assert_eq!(get.uri_template.as_deref(), Some("/books/{id}{._format}"));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod factory;
pub mod filter;
pub mod introspection;
pub mod naming;
pub mod types;
pub mod uri_template;

pub use config::ResolverConfig;
pub use error::{MetadataError, MetadataResult};
pub use factory::{CachedResolver, ResolverChain, ResourceMetadataFactory};
pub use naming::PathSegmentStyle;
pub use types::{
    Link, Operation, OperationKind, Parameter, ParameterLocation, Parameters, ResourceDescriptor,
    ResourceDescriptorCollection,
};
