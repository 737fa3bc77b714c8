//! Core types for resource metadata.
//!
//! This module provides the immutable value types the resolver chain produces:
//!
//! - [`Link`] - Relationship between two resource classes via identifiers
//! - [`Operation`] - One exposed action with its template, formats and parameters
//! - [`Parameter`] / [`Parameters`] - Inputs recognized on an operation
//! - [`ResourceDescriptor`] - Operations plus resource-level defaults
//! - [`ResourceDescriptorCollection`] - Every descriptor declared for one class

mod link;
mod operation;
mod parameter;
mod resource;

pub use link::Link;
pub use operation::{
    ExtraProperties, Formats, HttpMethod, Operation, OperationKind, UriVariables,
    default_operation_name,
};
pub use parameter::{Parameter, ParameterLocation, Parameters};
pub use resource::{ResourceDescriptor, ResourceDescriptorCollection};
