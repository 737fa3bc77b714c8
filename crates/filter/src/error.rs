//! Error types for the filter engine.
//!
//! Only construction and configuration problems are errors. Bad filter
//! input from a request is reported as a [`FilterNotice`](crate::FilterNotice)
//! and the affected filter is skipped.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

/// Fatal error raised while building filters or planning a query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A configured match strategy is not known.
    #[error("unknown strategy '{strategy}' for property '{property}'")]
    UnknownStrategy { property: String, strategy: String },

    /// The filter needs a storage capability the engine lacks.
    #[error("filter '{filter}' requires the '{feature}' storage feature")]
    UnsupportedStorageFeature { filter: String, feature: String },

    /// A filter configuration is inconsistent.
    #[error("invalid filter configuration for '{filter}': {message}")]
    InvalidConfiguration { filter: String, message: String },

    /// Two filters were registered under one name.
    #[error("filter '{name}' is already registered")]
    DuplicateFilter { name: String },

    /// The operation carries no resource class to query.
    #[error("operation '{operation}' has no resource class")]
    UnboundOperation { operation: String },

    /// A URI variable of the operation received no value.
    #[error("no value for URI variable '{name}'")]
    MissingUriVariable { name: String },

    /// A URI variable cannot constrain the queried class.
    #[error("invalid URI variable '{name}': {message}")]
    InvalidUriVariable { name: String, message: String },
}

/// Result type alias for filter construction and query planning.
pub type FilterResult<T> = Result<T, FilterError>;

/// Error raised by the SQLite store.
#[cfg(feature = "sqlite")]
#[derive(Error, Debug)]
pub enum StoreError {
    /// The driver failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// No pooled connection could be obtained.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// The class has no table definition.
    #[error("class '{class}' is not known to the store")]
    UnknownClass { class: String },

    /// A row could not be converted.
    #[error("invalid row for '{class}': {message}")]
    InvalidRow { class: String, message: String },
}

/// Result type alias for store operations.
#[cfg(feature = "sqlite")]
pub type StoreResult<T> = Result<T, StoreError>;
