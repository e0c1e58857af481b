//! Error types for `openapi-mcp-tools`.

use thiserror::Error;

/// Fatal document-level errors, raised while constructing the catalog or executor.
#[derive(Error, Debug)]
pub enum SpecError {
    /// Neither a configured base URL nor `servers[0].url` is available.
    #[error("No base URL found in OpenAPI spec")]
    MissingBaseUrl,

    #[error("Invalid base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("failed to fetch spec from '{url}': {message}")]
    Fetch { url: String, message: String },

    #[error("failed to read spec file '{path}': {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse OpenAPI spec from '{location}': {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Errors detected while building the tool catalog.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    /// Two operations share an `operationId`; they would collide on the qualified tool name.
    #[error("Duplicate operationId '{operation_id}': {first} conflicts with {second}")]
    DuplicateOperationId {
        operation_id: String,
        first: String,
        second: String,
    },
}

/// Per-call errors raised by the HTTP executor.
#[derive(Error, Debug)]
pub enum ExecuteError {
    #[error("Operation ID is required")]
    OperationIdRequired,

    #[error("Operation {0} not found")]
    OperationNotFound(String),

    /// The upstream answered with a non-2xx status.
    #[error("API request failed: {status} {status_text}")]
    Http { status: u16, status_text: String },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    /// Network-level failure (DNS, connect, timeout, body read), propagated as-is.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Result type alias for document-level operations.
pub type Result<T> = std::result::Result<T, SpecError>;
